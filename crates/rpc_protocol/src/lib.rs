//! Wire types for the incident tracker HTTP API.
//!
//! Every endpoint takes a JSON request body and returns either a JSON
//! response body or an [`ErrorBody`]. Ids travel as strings and are parsed by
//! the server so malformed ids surface as validation errors.

mod error;
pub mod requests;
pub mod responses;

pub use error::*;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page size a client may request.
pub const MAX_PAGE_SIZE: u32 = 500;

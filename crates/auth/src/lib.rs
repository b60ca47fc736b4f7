//! Bearer token authentication for the incident tracker.
//!
//! Tokens are HS256 JWTs whose `sub` claim is the user id. The role claim is
//! informational only: the server always reloads the user record and trusts
//! the stored role.

mod error;
mod jwt;

pub use error::*;
pub use jwt::*;

/// Default JWT expiration time in hours.
pub const DEFAULT_JWT_EXPIRATION_HOURS: u64 = 24;

/// Default JWT issuer.
pub const DEFAULT_JWT_ISSUER: &str = "incidents";

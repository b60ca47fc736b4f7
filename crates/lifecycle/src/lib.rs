//! Incident lifecycle rules.
//!
//! [`IncidentController`] is the only component that mutates incidents. It
//! enforces role capabilities, validates input, applies the status machine
//! and hands notifications to the dispatcher after each successful save.

mod controller;
mod error;


pub use controller::*;
pub use error::*;

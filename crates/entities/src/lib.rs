//! Core entity definitions for the incident tracker.
//!
//! This crate defines the data types shared by the store, the lifecycle
//! controller, and the server: users and their roles, incidents and their
//! status, and the actor identity passed into every operation.

mod incident;
mod user;

pub use incident::*;
pub use user::*;

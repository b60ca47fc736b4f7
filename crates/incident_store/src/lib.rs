//! Incident and user storage for the incident tracker.
//!
//! This crate defines the persistence contract the lifecycle controller works
//! against, plus an in-memory implementation and a SQLite implementation. All
//! incident writes are guarded by an optimistic version check.

mod error;
mod memory;
mod sqlite;
mod traits;

pub use error::*;
pub use memory::*;
pub use sqlite::*;
pub use traits::*;

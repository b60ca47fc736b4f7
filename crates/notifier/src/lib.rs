//! Lifecycle notifications for the incident tracker.
//!
//! This crate provides:
//! - The `Notifier` contract and message rendering
//! - Log, webhook, and in-memory notifiers
//! - A background dispatcher that keeps delivery off the request path

mod dispatcher;
mod error;
mod log;
mod message;
mod recording;
mod traits;
mod webhook;

pub use dispatcher::*;
pub use error::*;
pub use log::*;
pub use message::*;
pub use recording::*;
pub use traits::*;
pub use webhook::*;

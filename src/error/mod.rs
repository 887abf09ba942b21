//! Error handling
//!
//! Defines error types and status mapping for the server.

pub mod handlers;
pub mod types;

pub use types::*;

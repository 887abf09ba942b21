//! Server core functionality
//!
//! The accept loop and the shared application context.

pub mod core;

pub use core::{AppContext, Server};

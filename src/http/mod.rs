//! HTTP protocol implementation
//!
//! Hand-written HTTP/1.1 handling: request parsing, multipart bodies,
//! response serialization, and routing to the API handlers.

pub mod handlers;
pub mod multipart;
pub mod request;
pub mod response;

pub use handlers::handle_request;
pub use request::{Request, read_request};
pub use response::Response;

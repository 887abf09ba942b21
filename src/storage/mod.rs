//! File system storage management
//!
//! Handles file operations and path containment validation.

pub mod operations;
pub mod validation;

pub use operations::{FileEntry, StoredFile};
pub use validation::{resolve, sanitize_filename};

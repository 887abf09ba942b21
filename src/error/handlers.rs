//! Error handlers
//!
//! Maps domain errors to HTTP status codes and client-safe messages.

use crate::error::types::{HttpError, StorageError};

/// Default HTTP status for a storage error.
///
/// Individual endpoints may override this where their contract differs
/// (the upload endpoint treats a missing target directory as a bad request,
/// not as not-found).
pub fn storage_status(err: &StorageError) -> u16 {
    match err {
        StorageError::PathEscape(_) => 400,
        StorageError::FileNotFound(_) => 404,
        StorageError::DirectoryNotFound(_) => 404,
        StorageError::NotADirectory(_) => 400,
        StorageError::FileAlreadyExists(_) => 400,
        StorageError::InvalidName(_) => 400,
        StorageError::IoError(_) => 500,
    }
}

/// Client-facing message for a storage error.
///
/// A path escape reports only "Invalid path"; the resolved path stays in the
/// server log.
pub fn storage_message(err: &StorageError) -> &'static str {
    match err {
        StorageError::PathEscape(_) => "Invalid path",
        StorageError::FileNotFound(_) => "File not found",
        StorageError::DirectoryNotFound(_) => "Directory not found",
        StorageError::NotADirectory(_) => "Path is not a directory",
        StorageError::FileAlreadyExists(_) => "File with that name already exists",
        StorageError::InvalidName(_) => "Invalid filename",
        StorageError::IoError(_) => "Internal server error",
    }
}

/// HTTP status for a request-parsing error.
pub fn http_status(err: &HttpError) -> u16 {
    match err {
        HttpError::MalformedRequest(_) => 400,
        HttpError::BodyTooLarge(_) => 413,
        HttpError::BadMultipart(_) => 400,
        HttpError::IoError(_) => 500,
    }
}

//! Error types
//!
//! Defines domain-specific error types for each module of the server.

use std::fmt;
use std::io;

/// Storage module errors
#[derive(Debug)]
pub enum StorageError {
    /// The requested path resolved outside the mount root. Carries the raw
    /// requested path for logging; the resolved path is never exposed.
    PathEscape(String),
    FileNotFound(String),
    DirectoryNotFound(String),
    NotADirectory(String),
    FileAlreadyExists(String),
    InvalidName(String),
    IoError(io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::PathEscape(p) => write!(f, "Path escape attempt: {}", p),
            StorageError::FileNotFound(p) => write!(f, "File not found: {}", p),
            StorageError::DirectoryNotFound(p) => write!(f, "Directory not found: {}", p),
            StorageError::NotADirectory(p) => write!(f, "Not a directory: {}", p),
            StorageError::FileAlreadyExists(p) => write!(f, "File already exists: {}", p),
            StorageError::InvalidName(n) => write!(f, "Invalid name: {}", n),
            StorageError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(error: io::Error) -> Self {
        StorageError::IoError(error)
    }
}

/// Mount module errors
#[derive(Debug)]
pub enum MountError {
    /// The external command ran and exited non-zero.
    CommandFailed {
        operation: &'static str,
        detail: String,
    },
    /// The external command could not be started.
    Spawn {
        operation: &'static str,
        source: io::Error,
    },
    /// The external command did not finish within the configured timeout.
    /// The command itself keeps running; we only stop waiting for it.
    Timeout(&'static str),
    /// The blocking task running the command was aborted or panicked.
    TaskFailed(String),
}

impl fmt::Display for MountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountError::CommandFailed { operation, detail } => {
                if detail.is_empty() {
                    write!(f, "{} command failed", operation)
                } else {
                    write!(f, "{} command failed: {}", operation, detail)
                }
            }
            MountError::Spawn { operation, source } => {
                write!(f, "Failed to start {} command: {}", operation, source)
            }
            MountError::Timeout(operation) => {
                write!(f, "{} command timed out", operation)
            }
            MountError::TaskFailed(detail) => write!(f, "Mount task failed: {}", detail),
        }
    }
}

impl std::error::Error for MountError {}

/// HTTP layer errors
#[derive(Debug)]
pub enum HttpError {
    MalformedRequest(String),
    BodyTooLarge(usize),
    BadMultipart(String),
    IoError(io::Error),
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpError::MalformedRequest(detail) => write!(f, "Malformed request: {}", detail),
            HttpError::BodyTooLarge(size) => write!(f, "Request body too large: {} bytes", size),
            HttpError::BadMultipart(detail) => write!(f, "Bad multipart body: {}", detail),
            HttpError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for HttpError {}

impl From<io::Error> for HttpError {
    fn from(error: io::Error) -> Self {
        HttpError::IoError(error)
    }
}

//! Storage operations
//!
//! Filesystem operations behind the path guard: list, store, download,
//! delete, and rename. Every entry point resolves its request-supplied path
//! through [`validation::resolve`] before touching the disk.

use log::{error, info};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::StorageError;
use crate::storage::validation::resolve;

/// One directory entry as reported to clients.
#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    /// Seconds since the Unix epoch; 0 when the filesystem reports no
    /// usable timestamp (exFAT can do this for freshly created entries).
    pub modified: u64,
    #[serde(rename = "isDirectory")]
    pub is_directory: bool,
}

/// Name and size of a stored upload.
#[derive(Debug, Serialize)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
}

/// Join a directory request with a filename into one guarded path.
///
/// Running the combined path through the guard means a filename containing
/// separators is still contained or rejected as a whole.
fn resolve_in_dir(
    mount_root: &Path,
    requested_dir: &str,
    filename: &str,
) -> Result<PathBuf, StorageError> {
    if filename.is_empty() {
        return Err(StorageError::InvalidName("empty filename".into()));
    }
    let relative = if requested_dir.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", requested_dir, filename)
    };
    resolve(mount_root, &relative)
}

/// List the contents of a directory inside the mount root.
pub fn list_directory(
    mount_root: &Path,
    requested_dir: &str,
) -> Result<Vec<FileEntry>, StorageError> {
    let dir = resolve(mount_root, requested_dir)?;

    if !dir.exists() {
        return Err(StorageError::DirectoryNotFound(requested_dir.to_string()));
    }
    if !dir.is_dir() {
        return Err(StorageError::NotADirectory(requested_dir.to_string()));
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;

        let modified = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|dur| dur.as_secs())
            .unwrap_or(0);

        entries.push(FileEntry {
            name: entry.file_name().to_string_lossy().to_string(),
            size: metadata.len(),
            modified,
            is_directory: metadata.is_dir(),
        });
    }

    info!(
        "Listed directory '{}' (real: {}) - {} entries",
        requested_dir,
        dir.display(),
        entries.len()
    );

    Ok(entries)
}

/// Store one uploaded file into a directory inside the mount root.
///
/// The target directory must already exist. Data lands in a temporary file
/// first and is renamed into place, so a partially written upload never
/// appears under its final name. An existing file with the same name is
/// replaced.
pub fn store_file(
    mount_root: &Path,
    requested_dir: &str,
    filename: &str,
    data: &[u8],
) -> Result<StoredFile, StorageError> {
    let target_dir = resolve(mount_root, requested_dir)?;
    if !target_dir.exists() {
        return Err(StorageError::DirectoryNotFound(requested_dir.to_string()));
    }
    if !target_dir.is_dir() {
        return Err(StorageError::NotADirectory(requested_dir.to_string()));
    }

    let file_path = resolve_in_dir(mount_root, requested_dir, filename)?;

    let temp_path = file_path.with_extension(format!(
        "{}.part",
        file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
    ));

    fs::write(&temp_path, data)?;
    if let Err(e) = fs::rename(&temp_path, &file_path) {
        // Leave nothing half-finished behind.
        let _ = fs::remove_file(&temp_path);
        error!(
            "Failed to move upload into place at {}: {}",
            file_path.display(),
            e
        );
        return Err(StorageError::from(e));
    }

    info!(
        "Stored {} bytes as {} (real: {})",
        data.len(),
        filename,
        file_path.display()
    );

    Ok(StoredFile {
        name: filename.to_string(),
        size: data.len() as u64,
    })
}

/// Resolve a root-level filename for download.
///
/// Downloads deliberately resolve against the mount root only; the guard
/// still applies, so a name that walks elsewhere is rejected.
pub fn download_path(mount_root: &Path, filename: &str) -> Result<PathBuf, StorageError> {
    let file_path = resolve_in_dir(mount_root, "", filename)?;

    if !file_path.exists() || !file_path.is_file() {
        return Err(StorageError::FileNotFound(filename.to_string()));
    }

    Ok(file_path)
}

/// Delete a file or directory inside the mount root.
///
/// Directories are removed recursively with their contents; files singly.
pub fn delete_entry(
    mount_root: &Path,
    requested_dir: &str,
    filename: &str,
) -> Result<(), StorageError> {
    let target = resolve_in_dir(mount_root, requested_dir, filename)?;

    let metadata = match fs::metadata(&target) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StorageError::FileNotFound(filename.to_string()));
        }
        Err(e) => return Err(StorageError::from(e)),
    };

    if metadata.is_dir() {
        fs::remove_dir_all(&target)?;
    } else {
        fs::remove_file(&target)?;
    }

    info!("Deleted {} (real: {})", filename, target.display());
    Ok(())
}

/// Rename a file or directory within its directory.
///
/// Fails if anything already exists under the new name, leaving both
/// entries untouched.
pub fn rename_entry(
    mount_root: &Path,
    requested_dir: &str,
    old_name: &str,
    new_name: &str,
) -> Result<String, StorageError> {
    let old_path = resolve_in_dir(mount_root, requested_dir, old_name)?;
    let new_path = resolve_in_dir(mount_root, requested_dir, new_name)?;

    if !old_path.exists() {
        return Err(StorageError::FileNotFound(old_name.to_string()));
    }
    if new_path.exists() {
        return Err(StorageError::FileAlreadyExists(new_name.to_string()));
    }

    fs::rename(&old_path, &new_path)?;

    info!(
        "Renamed {} -> {} (real: {})",
        old_name,
        new_name,
        new_path.display()
    );

    Ok(new_name.to_string())
}

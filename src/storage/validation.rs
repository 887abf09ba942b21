//! Path validation
//!
//! Containment checks for request-supplied paths. Every path derived from
//! client input must pass through [`resolve`] before touching the filesystem.

use std::path::{Component, Path, PathBuf};

use crate::error::StorageError;

/// Resolve a client-supplied relative path against the mount root.
///
/// The requested path is joined to the root and lexically normalized
/// (`.` dropped, `..` popped), then accepted only if the result stays at or
/// below the root. An absolute requested path replaces the root during the
/// join and is therefore rejected by the same check rather than silently
/// stripped. When the resolved path already exists it is canonicalized and
/// re-checked, so a symlink inside the root cannot redirect operations
/// outside it.
///
/// An empty requested path resolves to the mount root itself.
pub fn resolve(mount_root: &Path, requested: &str) -> Result<PathBuf, StorageError> {
    let normalized = normalize(&mount_root.join(requested));

    if !normalized.starts_with(mount_root) {
        return Err(StorageError::PathEscape(requested.to_string()));
    }

    if normalized.exists() {
        let canonical = normalized.canonicalize()?;
        let canonical_root = mount_root.canonicalize()?;
        if !canonical.starts_with(&canonical_root) {
            return Err(StorageError::PathEscape(requested.to_string()));
        }
        return Ok(canonical);
    }

    Ok(normalized)
}

/// Collapse `.` and `..` components without touching the filesystem.
///
/// Popping `..` at the root is a no-op, matching how the kernel treats
/// `/..`.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::RootDir | Component::Prefix(_) => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Reduce an upload filename to its final path component.
///
/// Browsers may send full client-side paths in multipart filenames; only the
/// basename is meaningful to us. Returns `None` for names that carry no
/// usable component.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let name = Path::new(raw).file_name()?.to_str()?;
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

//! Change notification
//!
//! After a mutating file operation, an out-of-process watcher re-exports the
//! volume over another protocol. We hint at it by requesting a filesystem
//! sync and then touching a marker file. Both steps are best-effort: a
//! failure here never fails the operation that triggered it.

use log::warn;
use std::path::Path;
use tokio::process::Command;

/// Request a filesystem sync, then write the change marker.
///
/// Ordering guarantee is limited to "sync requested before marker write".
pub async fn signal_change(marker_path: &Path) {
    match Command::new("sync").status().await {
        Ok(status) if !status.success() => {
            warn!("sync exited with {}", status);
        }
        Err(e) => {
            warn!("Failed to run sync: {}", e);
        }
        Ok(_) => {}
    }

    if let Err(e) = tokio::fs::write(marker_path, b"").await {
        warn!(
            "Failed to write change marker {}: {}",
            marker_path.display(),
            e
        );
    }
}

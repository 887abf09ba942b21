//! Mount lifecycle management
//!
//! Owns the process-wide mount state and drives every transition through the
//! injected [`Mounter`]. The state lock is held across whole unmount/mount
//! sequences so concurrent refreshes cannot interleave.

use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::MountError;
use crate::mount::Mounter;

/// Attachment state of the backing volume. Transient, re-derived by mount
/// attempts; never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MountState {
    Unmounted,
    Mounted,
    MountFailed,
}

#[derive(Clone, Copy)]
enum MountOp {
    Attach,
    Detach,
}

impl MountOp {
    fn name(self) -> &'static str {
        match self {
            MountOp::Attach => "mount",
            MountOp::Detach => "umount",
        }
    }
}

pub struct MountManager {
    mounter: Arc<dyn Mounter>,
    state: Mutex<MountState>,
    timeout: Duration,
}

impl MountManager {
    pub fn new(mounter: Arc<dyn Mounter>, timeout: Duration) -> Self {
        Self {
            mounter,
            state: Mutex::new(MountState::Unmounted),
            timeout,
        }
    }

    pub async fn state(&self) -> MountState {
        *self.state.lock().await
    }

    /// Attach the backing volume at startup.
    ///
    /// On a failed first attempt, runs one retry sequence: best-effort
    /// unmount (the target may not be mounted at all) followed by a second
    /// mount. Only logs the outcome; a failed mount leaves the server up and
    /// file operations failing naturally at the filesystem layer.
    pub async fn ensure_mounted(&self) {
        let mut state = self.state.lock().await;

        match self.run_command(MountOp::Attach).await {
            Ok(()) => {
                *state = MountState::Mounted;
                info!("Shared drive mounted successfully");
            }
            Err(first_error) => {
                warn!(
                    "Mount attempt failed ({}), retrying after unmount",
                    first_error
                );

                if let Err(e) = self.run_command(MountOp::Detach).await {
                    warn!("Unmount before retry failed (ignored): {}", e);
                }

                match self.run_command(MountOp::Attach).await {
                    Ok(()) => {
                        *state = MountState::Mounted;
                        info!("Shared drive remounted successfully");
                    }
                    Err(e) => {
                        *state = MountState::MountFailed;
                        error!("Failed to mount shared drive: {}", e);
                    }
                }
            }
        }
    }

    /// Unconditionally detach and re-attach the volume.
    ///
    /// Used to pick up changes made to the backing image by other writers.
    /// The unmount is best-effort; the result of the mount is reported to
    /// the caller.
    pub async fn refresh(&self) -> Result<(), MountError> {
        let mut state = self.state.lock().await;
        *state = MountState::Unmounted;

        if let Err(e) = self.run_command(MountOp::Detach).await {
            warn!("Unmount during refresh failed (ignored): {}", e);
        }

        match self.run_command(MountOp::Attach).await {
            Ok(()) => {
                *state = MountState::Mounted;
                info!("Shared drive refreshed");
                Ok(())
            }
            Err(e) => {
                *state = MountState::MountFailed;
                error!("Failed to refresh mount: {}", e);
                Err(e)
            }
        }
    }

    /// Run one mounter command on the blocking pool, bounded by the
    /// configured timeout. The command runs to completion either way; on
    /// timeout we only stop waiting for it.
    async fn run_command(&self, op: MountOp) -> Result<(), MountError> {
        let mounter = Arc::clone(&self.mounter);
        let task = tokio::task::spawn_blocking(move || match op {
            MountOp::Attach => mounter.mount(),
            MountOp::Detach => mounter.unmount(),
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(MountError::TaskFailed(join_error.to_string())),
            Err(_) => Err(MountError::Timeout(op.name())),
        }
    }
}

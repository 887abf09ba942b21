//! Mount command execution
//!
//! The [`Mounter`] trait abstracts the external mount/umount commands so the
//! lifecycle logic in [`super::manager`] stays testable without touching real
//! OS mounts.

use log::info;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

use crate::config::ServerConfig;
use crate::error::MountError;

/// Capability to attach and detach the backing volume.
pub trait Mounter: Send + Sync {
    fn mount(&self) -> Result<(), MountError>;
    fn unmount(&self) -> Result<(), MountError>;
}

/// Shells out to the system mount commands.
///
/// All parameters are fixed deployment configuration; nothing here is
/// computed at runtime.
pub struct SystemMounter {
    mount_root: PathBuf,
    image_path: PathBuf,
    fs_type: String,
    image_offset: u64,
    uid: u32,
    gid: u32,
}

impl SystemMounter {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            mount_root: config.mount_root_path(),
            image_path: PathBuf::from(&config.image_path),
            fs_type: config.fs_type.clone(),
            image_offset: config.image_offset,
            uid: config.mount_uid,
            gid: config.mount_gid,
        }
    }

    /// Loop-mount options for the image: offset into the partition plus
    /// ownership that makes the tree writable by the service user.
    fn mount_options(&self) -> String {
        format!(
            "loop,offset={},uid={},gid={}",
            self.image_offset, self.uid, self.gid
        )
    }

    fn run(&self, operation: &'static str, command: &mut Command) -> Result<(), MountError> {
        let output = command
            .output()
            .map_err(|source| MountError::Spawn { operation, source })?;

        if output.status.success() {
            info!("{} of {} succeeded", operation, self.mount_root.display());
            Ok(())
        } else {
            Err(MountError::CommandFailed {
                operation,
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl Mounter for SystemMounter {
    fn mount(&self) -> Result<(), MountError> {
        fs::create_dir_all(&self.mount_root).map_err(|source| MountError::Spawn {
            operation: "mkdir",
            source,
        })?;

        let options = self.mount_options();
        self.run(
            "mount",
            Command::new("sudo")
                .args(["mount", "-t", &self.fs_type, "-o", &options])
                .arg(&self.image_path)
                .arg(&self.mount_root),
        )
    }

    fn unmount(&self) -> Result<(), MountError> {
        self.run(
            "umount",
            Command::new("sudo").arg("umount").arg(&self.mount_root),
        )
    }
}

//! Configuration management
//!
//! All mount parameters (image path, filesystem type, byte offset, ownership)
//! are deployment configuration, never computed. Values load from config.toml
//! with environment overrides.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration, fixed for the process lifetime.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// IP address to bind the HTTP listener
    pub bind_address: String,

    /// Port for the HTTP listener
    pub port: u16,

    /// Mount root: the sandbox boundary for every file operation
    pub mount_root: String,

    /// Backing volume image file
    pub image_path: String,

    /// Filesystem type passed to the mount command
    pub fs_type: String,

    /// Byte offset of the filesystem inside the image
    pub image_offset: u64,

    /// Ownership applied to the mounted tree
    pub mount_uid: u32,
    pub mount_gid: u32,

    /// Marker file consumed by the out-of-process change watcher
    pub marker_path: String,

    /// Upper bound on how long to wait for external mount commands
    pub mount_timeout_secs: u64,

    /// Maximum accepted request body size in MB
    pub max_upload_mb: u64,
}

impl ServerConfig {
    /// Load configuration from config.toml with environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config"))
            .add_source(Environment::with_prefix("DRIVE"))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Message("port cannot be 0".into()));
        }

        if !self.mount_root.starts_with('/') {
            return Err(ConfigError::Message(
                "mount_root must be an absolute path".into(),
            ));
        }

        if self.image_path.is_empty() {
            return Err(ConfigError::Message("image_path cannot be empty".into()));
        }

        if self.marker_path.is_empty() {
            return Err(ConfigError::Message("marker_path cannot be empty".into()));
        }

        if self.mount_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "mount_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.max_upload_mb == 0 {
            return Err(ConfigError::Message(
                "max_upload_mb must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Get bind address and port as a socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Get the mount root as a PathBuf
    pub fn mount_root_path(&self) -> PathBuf {
        PathBuf::from(&self.mount_root)
    }

    /// Get the change-marker location as a PathBuf
    pub fn marker_file(&self) -> PathBuf {
        PathBuf::from(&self.marker_path)
    }

    /// Get the mount command timeout as a Duration
    pub fn mount_timeout(&self) -> Duration {
        Duration::from_secs(self.mount_timeout_secs)
    }

    /// Maximum request body size in bytes
    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb as usize) * 1024 * 1024
    }
}

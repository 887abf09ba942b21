//! driveshare
//!
//! HTTP file browser and mount supervisor for a single shared storage
//! volume: list, upload, download, delete and rename files under a fixed
//! mount root, with a manual remount trigger for picking up external
//! changes to the backing image.

pub mod config;
pub mod error;
pub mod http;
pub mod mount;
pub mod notify;
pub mod server;
pub mod storage;

pub use server::Server;

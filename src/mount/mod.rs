//! Mount management
//!
//! Guarantees the backing volume is attached at the mount root and provides
//! the on-demand remount used to pick up external changes.

pub mod manager;
pub mod mounter;

pub use manager::{MountManager, MountState};
pub use mounter::{Mounter, SystemMounter};

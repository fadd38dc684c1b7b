//! Tierfs Core - storage tier management for a supervising process
//!
//! A tier is a pool of drives operated as one unit:
//! - a master index recording which drive holds every tier path
//! - file operations routed through a drive abstraction
//! - a lifecycle state machine gating every command
//! - a framed JSON command protocol over a single duplex channel

pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod operations;
pub mod placement;
pub mod protocol;
pub mod registry;
pub mod storage;
pub mod tier;

pub use channel::{DuplexChannel, serve};
pub use config::{DEFAULT_MAX_FRAME_BYTES, DriveClass, DriveConfig, FillMethod, TierConfig};
pub use dispatcher::Dispatcher;
pub use error::{ErrorKind, Result, TierError};
pub use operations::FileHandle;
pub use placement::Placement;
pub use protocol::{Command, CommandKind, Payload, Response};
pub use registry::DriveRegistry;
pub use storage::{
    Drive, DriveSet, DynDrive, FileStat, IndexEntry, IndexSnapshot, MasterIndex, MergeReport,
    MountedDrive,
};
pub use tier::{Tier, TierBuilder, TierState};

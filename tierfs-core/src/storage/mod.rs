//! Storage modules for Tierfs
//!
//! Provides the drive abstraction, directory-backed drives and the master index.

pub mod drive;
pub mod index;
pub mod mounted;

pub use drive::{Drive, DriveSet, DynDrive, FileStat, normalize_tier_path};
pub use index::{IndexEntry, IndexSnapshot, MasterIndex, MergeReport};
pub use mounted::MountedDrive;

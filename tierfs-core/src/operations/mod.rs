pub mod delete_file;
pub mod file_info;
pub mod open_file;
pub mod transfer_file;

pub use delete_file::DeleteFileOperation;
pub use file_info::FileInfoOperation;
pub use open_file::{FileHandle, OpenFileOperation};
pub use transfer_file::{TransferFileOperation, TransferFileOperationRequest};

use crate::placement::Placement;
use crate::storage::{DriveSet, DynDrive, IndexEntry, MasterIndex};
use crate::{DriveRegistry, Result, TierError};

/// Everything a file operation may touch. The physical action always runs
/// before the index is mutated.
pub struct OperationContext<'a> {
    pub registry: &'a DriveRegistry,
    pub drives: &'a DriveSet,
    pub placement: &'a Placement,
    pub index: &'a mut MasterIndex,
}

impl OperationContext<'_> {
    /// Resolve an indexed path to its entry and backing drive.
    fn locate(&self, path: &str) -> Result<(IndexEntry, DynDrive)> {
        let entry = self.index.lookup(path)?.clone();
        let drive = self.drive_of(&entry)?;
        Ok((entry, drive))
    }

    fn drive_of(&self, entry: &IndexEntry) -> Result<DynDrive> {
        self.drives.get(&entry.drive).cloned().map_err(|_| {
            TierError::IndexCorruption(format!(
                "entry {} references unknown drive {}",
                entry.path, entry.drive
            ))
        })
    }
}

use super::OperationContext;
use crate::storage::{IndexEntry, normalize_tier_path};
use crate::{Result, TierError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use ulid::Ulid;

/// Location of an opened or created file, handed to the requester. The tier
/// keeps no record of handles it gives out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    pub handle_id: String,
    pub path: String,
    pub drive: String,
    pub physical_path: PathBuf,
    pub created: bool,
}

impl FileHandle {
    fn new(path: &str, drive: &str, physical_path: PathBuf, created: bool) -> Self {
        Self {
            handle_id: Ulid::new().to_string(),
            path: path.to_string(),
            drive: drive.to_string(),
            physical_path,
            created,
        }
    }
}

pub struct OpenFileOperation<'a> {
    ctx: OperationContext<'a>,
}

impl<'a> OpenFileOperation<'a> {
    pub fn new(ctx: OperationContext<'a>) -> Self {
        Self { ctx }
    }

    pub async fn run_open(&self, path: &str) -> Result<FileHandle> {
        let path = normalize_tier_path(path)?;
        let (entry, drive) = self.ctx.locate(&path)?;

        let physical = drive.open(&path).await?;

        tracing::debug!("Opened path={} drive={}", path, entry.drive);
        Ok(FileHandle::new(&path, &entry.drive, physical, false))
    }

    pub async fn run_create(self, path: &str) -> Result<FileHandle> {
        let path = normalize_tier_path(path)?;
        if self.ctx.index.contains(&path) {
            return Err(TierError::AlreadyExists(path));
        }

        let target = self.ctx.placement.select(
            self.ctx.registry,
            self.ctx.index,
            &path,
            0,
            None,
        )?;
        let drive = self.ctx.drives.get(&target)?.clone();

        let physical = drive.create(&path).await?;
        let stat = drive.stat(&path).await?;

        self.ctx
            .index
            .insert(&path, IndexEntry::from_stat(&path, &target, stat))?;

        tracing::debug!("Created path={} drive={}", path, target);
        Ok(FileHandle::new(&path, &target, physical, true))
    }
}

use super::OperationContext;
use crate::Result;
use crate::storage::{IndexEntry, normalize_tier_path};

pub struct DeleteFileOperation<'a> {
    ctx: OperationContext<'a>,
}

impl<'a> DeleteFileOperation<'a> {
    pub fn new(ctx: OperationContext<'a>) -> Self {
        Self { ctx }
    }

    /// Remove a file from its drive, then from the index. Returns the removed
    /// entry.
    pub async fn run(self, path: &str) -> Result<IndexEntry> {
        let path = normalize_tier_path(path)?;
        let (entry, drive) = self.ctx.locate(&path)?;

        drive.remove(&path).await?;
        let removed = self.ctx.index.remove(&path)?;

        tracing::debug!("Deleted path={} drive={}", path, entry.drive);
        Ok(removed)
    }
}

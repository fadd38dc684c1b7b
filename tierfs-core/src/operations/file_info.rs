use super::OperationContext;
use crate::storage::{IndexEntry, normalize_tier_path};
use crate::{Result, TierError};

pub struct FileInfoOperation<'a> {
    ctx: OperationContext<'a>,
}

impl<'a> FileInfoOperation<'a> {
    pub fn new(ctx: OperationContext<'a>) -> Self {
        Self { ctx }
    }

    /// Stat a file on its drive and return its current metadata. The index
    /// entry is brought up to date so placement sees real sizes.
    pub async fn run_get(self, path: &str) -> Result<IndexEntry> {
        let path = normalize_tier_path(path)?;
        let (entry, drive) = self.ctx.locate(&path)?;

        let stat = drive.stat(&path).await?;
        let current = self.ctx.index.refresh(&path, stat)?;

        tracing::debug!(
            "File info path={} drive={} size={}",
            path,
            entry.drive,
            current.size
        );
        Ok(current)
    }

    pub async fn run_exists(&self, path: &str) -> Result<bool> {
        let path = normalize_tier_path(path)?;
        let (_, drive) = match self.ctx.locate(&path) {
            Ok(located) => located,
            Err(TierError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };

        drive.exists(&path).await
    }
}

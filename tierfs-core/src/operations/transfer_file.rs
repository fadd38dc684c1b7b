use super::OperationContext;
use crate::storage::{DynDrive, FileStat, IndexEntry, normalize_tier_path};
use crate::{Result, TierError};

#[derive(Debug, Clone)]
pub struct TransferFileOperationRequest {
    pub src: String,
    pub dest: String,
}

/// COPY_FILE and MOVE_FILE.
pub struct TransferFileOperation<'a> {
    ctx: OperationContext<'a>,
}

struct Prepared {
    src: String,
    dest: String,
    src_drive: DynDrive,
    src_stat: FileStat,
}

impl<'a> TransferFileOperation<'a> {
    pub fn new(ctx: OperationContext<'a>) -> Self {
        Self { ctx }
    }

    async fn prepare(&self, request: TransferFileOperationRequest) -> Result<Prepared> {
        let TransferFileOperationRequest { src, dest } = request;
        let src = normalize_tier_path(&src)?;
        let dest = normalize_tier_path(&dest)?;

        let (_, src_drive) = self.ctx.locate(&src)?;
        if src == dest || self.ctx.index.contains(&dest) {
            return Err(TierError::AlreadyExists(dest));
        }

        let src_stat = src_drive.stat(&src).await?;

        Ok(Prepared {
            src,
            dest,
            src_drive,
            src_stat,
        })
    }

    pub async fn run_copy(self, request: TransferFileOperationRequest) -> Result<IndexEntry> {
        let Prepared {
            src,
            dest,
            src_drive,
            src_stat,
        } = self.prepare(request).await?;
        // placement reads indexed sizes
        let src_entry = self.ctx.index.refresh(&src, src_stat)?;

        let target = self.ctx.placement.select(
            self.ctx.registry,
            self.ctx.index,
            &dest,
            src_entry.size,
            Some(src_entry.drive.as_str()),
        )?;
        let target_drive = self.ctx.drives.get(&target)?.clone();

        if target == src_entry.drive {
            target_drive.copy_within(&src, &dest).await?;
        } else {
            target_drive
                .copy_from(src_drive.as_ref(), &src, &dest)
                .await?;
        }

        let stat = target_drive.stat(&dest).await?;
        let entry = IndexEntry::from_stat(&dest, &target, stat);
        self.ctx.index.insert(&dest, entry.clone())?;

        tracing::debug!(
            "Copied {} ({}) -> {} ({})",
            src,
            src_entry.drive,
            dest,
            target
        );
        Ok(entry)
    }

    pub async fn run_move(self, request: TransferFileOperationRequest) -> Result<IndexEntry> {
        let Prepared {
            src,
            dest,
            src_drive,
            src_stat,
        } = self.prepare(request).await?;
        // placement reads indexed sizes
        let src_entry = self.ctx.index.refresh(&src, src_stat)?;

        // Renames stay on the resident drive while it is within its limit.
        let resident = self.ctx.registry.resolve(&src_entry.drive)?;
        let target = if self.ctx.placement.is_eligible(resident, self.ctx.index, 0) {
            src_entry.drive.clone()
        } else {
            self.ctx.placement.select(
                self.ctx.registry,
                self.ctx.index,
                &dest,
                src_entry.size,
                None,
            )?
        };
        let target_drive = self.ctx.drives.get(&target)?.clone();

        if target == src_entry.drive {
            target_drive.rename(&src, &dest).await?;
        } else {
            target_drive
                .copy_from(src_drive.as_ref(), &src, &dest)
                .await?;
            if let Err(e) = src_drive.remove(&src).await {
                if let Err(cleanup) = target_drive.remove(&dest).await {
                    tracing::warn!(
                        "Could not roll back copy of {} on drive {}: {}",
                        dest,
                        target,
                        cleanup
                    );
                }
                return Err(e);
            }
        }

        let stat = target_drive.stat(&dest).await?;
        let mut entry = IndexEntry::from_stat(&dest, &target, stat);
        entry.extra = src_entry.extra;

        self.ctx.index.remove(&src)?;
        self.ctx.index.insert(&dest, entry.clone())?;

        tracing::debug!(
            "Moved {} ({}) -> {} ({})",
            src,
            src_entry.drive,
            dest,
            target
        );
        Ok(entry)
    }
}

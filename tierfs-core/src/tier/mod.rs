//! The tier aggregate: configuration, drives, master index and lifecycle.

pub mod state;

pub use state::TierState;

use crate::operations::{
    DeleteFileOperation, FileHandle, FileInfoOperation, OpenFileOperation, OperationContext,
    TransferFileOperation, TransferFileOperationRequest,
};
use crate::placement::Placement;
use crate::protocol::CommandKind;
use crate::storage::{
    DriveSet, DynDrive, IndexEntry, IndexSnapshot, MasterIndex, MergeReport, MountedDrive,
};
use crate::{DriveConfig, DriveRegistry, Result, TierConfig, TierError};
use std::sync::Arc;

enum DriveSource {
    Config(DriveConfig),
    Backend(DynDrive),
}

#[derive(Default)]
pub struct TierBuilder {
    config: Option<TierConfig>,
    drives: Vec<DriveSource>,
    saved_index: Option<IndexSnapshot>,
}

impl TierBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: TierConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Register a drive served by a [`MountedDrive`].
    pub fn drive(mut self, config: DriveConfig) -> Self {
        self.drives.push(DriveSource::Config(config));
        self
    }

    pub fn drives(mut self, configs: impl IntoIterator<Item = DriveConfig>) -> Self {
        self.drives
            .extend(configs.into_iter().map(DriveSource::Config));
        self
    }

    /// Register a drive with its own backend implementation.
    pub fn backend(mut self, drive: DynDrive) -> Self {
        self.drives.push(DriveSource::Backend(drive));
        self
    }

    /// Snapshot loaded as the initial index at startup.
    pub fn saved_index(mut self, snapshot: IndexSnapshot) -> Self {
        self.saved_index = Some(snapshot);
        self
    }

    pub fn build(self) -> Result<Tier> {
        let config = self
            .config
            .ok_or_else(|| TierError::Config("tier config is required".to_string()))?;
        config.validate()?;

        let backends: Vec<DynDrive> = self
            .drives
            .into_iter()
            .map(|source| match source {
                DriveSource::Config(drive) => Arc::new(MountedDrive::new(drive)) as DynDrive,
                DriveSource::Backend(drive) => drive,
            })
            .collect();

        let registry = DriveRegistry::new(backends.iter().map(|drive| drive.config().clone()))?;
        let placement = Placement::new(&config, &registry)?;

        tracing::info!(
            "Built tier {} (number {}) with drives {:?}",
            config.name,
            config.tier_number,
            registry.list_names()
        );

        Ok(Tier {
            config,
            registry,
            drives: DriveSet::new(backends),
            placement,
            index: MasterIndex::new(),
            saved_index: self.saved_index,
            state: TierState::Uninitialized,
        })
    }
}

pub struct Tier {
    config: TierConfig,
    registry: DriveRegistry,
    drives: DriveSet,
    placement: Placement,
    index: MasterIndex,
    saved_index: Option<IndexSnapshot>,
    state: TierState,
}

impl Tier {
    pub fn builder() -> TierBuilder {
        TierBuilder::new()
    }

    pub fn config(&self) -> &TierConfig {
        &self.config
    }

    pub fn registry(&self) -> &DriveRegistry {
        &self.registry
    }

    pub fn state(&self) -> TierState {
        self.state
    }

    pub fn ensure(&self, kind: CommandKind) -> Result<()> {
        self.state.permits(kind)
    }

    fn context(&mut self) -> OperationContext<'_> {
        OperationContext {
            registry: &self.registry,
            drives: &self.drives,
            placement: &self.placement,
            index: &mut self.index,
        }
    }

    /// Attach every drive and load the initial index.
    pub async fn startup(&mut self) -> Result<()> {
        self.ensure(CommandKind::Startup)?;

        let mut attached: Vec<DynDrive> = Vec::new();
        for drive in self.drives.iter() {
            if let Err(e) = drive.attach().await {
                tracing::error!("Failed to attach drive {}: {}", drive.name(), e);
                release(&attached).await;
                return Err(e);
            }
            attached.push(drive.clone());
        }

        let index = match self.load_initial_index().await {
            Ok(index) => index,
            Err(e) => {
                release(&attached).await;
                return Err(e);
            }
        };

        self.index = index;
        self.saved_index = None;
        self.state = TierState::Running;

        tracing::info!(
            "Tier {} started with {} indexed files (revision {})",
            self.config.name,
            self.index.len(),
            self.index.revision()
        );
        Ok(())
    }

    async fn load_initial_index(&self) -> Result<MasterIndex> {
        if let Some(snapshot) = &self.saved_index {
            return MasterIndex::from_snapshot(snapshot.clone(), &self.registry);
        }
        if !self.config.scan_on_startup {
            return Ok(MasterIndex::new());
        }

        let mut index = MasterIndex::new();
        for drive in self.drives.iter() {
            if drive.is_volatile() {
                continue;
            }
            for (path, stat) in drive.scan().await? {
                let entry = IndexEntry::from_stat(&path, drive.name(), stat);
                index.insert(&path, entry).map_err(|_| {
                    TierError::IndexCorruption(format!(
                        "{} is present on more than one drive (found again on {})",
                        path,
                        drive.name()
                    ))
                })?;
            }
        }
        Ok(index)
    }

    /// Detach every drive and hand back the final index. The tier cannot be
    /// restarted afterwards.
    pub async fn shutdown(&mut self) -> Result<IndexSnapshot> {
        self.ensure(CommandKind::Shutdown)?;

        let snapshot = self.index.dump();
        let attached: Vec<DynDrive> = self.drives.iter().cloned().collect();
        release(&attached).await;

        self.index = MasterIndex::new();
        self.state = TierState::ShutDown;

        tracing::info!(
            "Tier {} shut down at revision {} with {} indexed files",
            self.config.name,
            snapshot.revision,
            snapshot.len()
        );
        Ok(snapshot)
    }

    pub fn drive_names(&self) -> Result<Vec<String>> {
        self.ensure(CommandKind::GetDriveNames)?;
        Ok(self.registry.list_names())
    }

    pub fn dump_index(&self) -> Result<IndexSnapshot> {
        self.ensure(CommandKind::DumpIndex)?;
        Ok(self.index.dump())
    }

    pub fn refresh_index(&mut self, snapshot: IndexSnapshot) -> Result<()> {
        self.ensure(CommandKind::RefreshIndex)?;
        let entries = snapshot.len();
        self.index.replace(snapshot, &self.registry)?;
        tracing::info!(
            "Replaced index of tier {} with {} entries (revision {})",
            self.config.name,
            entries,
            self.index.revision()
        );
        Ok(())
    }

    pub fn apply_saved_index(&mut self, snapshot: IndexSnapshot) -> Result<MergeReport> {
        self.ensure(CommandKind::ApplySavedIndex)?;
        let report = self.index.merge(snapshot, &self.registry)?;
        if !report.skipped.is_empty() {
            tracing::warn!(
                "Saved index for tier {}: skipped {} already indexed paths",
                self.config.name,
                report.skipped.len()
            );
        }
        tracing::info!(
            "Applied saved index to tier {}: {} entries added",
            self.config.name,
            report.applied
        );
        Ok(report)
    }

    pub async fn get_file_info(&mut self, path: &str) -> Result<IndexEntry> {
        self.ensure(CommandKind::GetFileInfo)?;
        FileInfoOperation::new(self.context()).run_get(path).await
    }

    pub async fn exists(&mut self, path: &str) -> Result<bool> {
        self.ensure(CommandKind::Exists)?;
        FileInfoOperation::new(self.context()).run_exists(path).await
    }

    pub async fn open_file(&mut self, path: &str) -> Result<FileHandle> {
        self.ensure(CommandKind::OpenFile)?;
        OpenFileOperation::new(self.context()).run_open(path).await
    }

    pub async fn make_new_file(&mut self, path: &str) -> Result<FileHandle> {
        self.ensure(CommandKind::MakeNewFile)?;
        OpenFileOperation::new(self.context()).run_create(path).await
    }

    pub async fn copy_file(&mut self, src: &str, dest: &str) -> Result<IndexEntry> {
        self.ensure(CommandKind::CopyFile)?;
        TransferFileOperation::new(self.context())
            .run_copy(TransferFileOperationRequest {
                src: src.to_string(),
                dest: dest.to_string(),
            })
            .await
    }

    pub async fn move_file(&mut self, src: &str, dest: &str) -> Result<IndexEntry> {
        self.ensure(CommandKind::MoveFile)?;
        TransferFileOperation::new(self.context())
            .run_move(TransferFileOperationRequest {
                src: src.to_string(),
                dest: dest.to_string(),
            })
            .await
    }

    pub async fn delete_file(&mut self, path: &str) -> Result<IndexEntry> {
        self.ensure(CommandKind::DeleteFile)?;
        DeleteFileOperation::new(self.context()).run(path).await
    }
}

async fn release(drives: &[DynDrive]) {
    for drive in drives {
        if let Err(e) = drive.detach().await {
            tracing::warn!("Failed to detach drive {}: {}", drive.name(), e);
        }
    }
}

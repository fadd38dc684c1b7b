use crate::storage::drive::{Drive, FileStat};
use crate::{DriveClass, DriveConfig, Result, TierError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;

/// A drive rooted at a mounted directory. Serves both block-device mounts and
/// RAM-backed (tmpfs-style) stores; the class decides attach and scan rules.
pub struct MountedDrive {
    config: DriveConfig,
    made_mount_point: AtomicBool,
}

impl MountedDrive {
    pub fn new(config: DriveConfig) -> Self {
        Self {
            config,
            made_mount_point: AtomicBool::new(false),
        }
    }

    pub fn root(&self) -> &Path {
        &self.config.mount_point
    }

    async fn ensure_parent(&self, path: &str) -> Result<()> {
        if let Some(parent) = self.physical_path(path).parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| TierError::from_io(path, e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Drive for MountedDrive {
    fn config(&self) -> &DriveConfig {
        &self.config
    }

    fn physical_path(&self, path: &str) -> PathBuf {
        self.root().join(path)
    }

    async fn attach(&self) -> Result<()> {
        let root = self.root();
        let display = root.display().to_string();

        match fs::metadata(root).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(TierError::storage(
                    &display,
                    format!("mount point of drive {} is not a directory", self.config.name),
                ));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if self.config.class != DriveClass::Ram {
                    return Err(TierError::storage(
                        &display,
                        format!("drive {} is not connected", self.config.name),
                    ));
                }
                fs::create_dir_all(root).await.map_err(|source| TierError::Storage {
                    path: display.clone(),
                    source,
                })?;
                self.made_mount_point.store(true, Ordering::SeqCst);
            }
            Err(source) => {
                return Err(TierError::Storage {
                    path: display,
                    source,
                });
            }
        }

        let root_display = &display;
        tracing::info!(
            "Attached drive {} ({:?}) at {}",
            self.config.name,
            self.config.class,
            root_display
        );
        Ok(())
    }

    async fn detach(&self) -> Result<()> {
        if self.made_mount_point.swap(false, Ordering::SeqCst) {
            let root = self.root();
            if let Err(e) = fs::remove_dir(root).await {
                tracing::warn!(
                    "Could not remove mount point {} of drive {}: {}",
                    root.display(),
                    self.config.name,
                    e
                );
            }
        }

        tracing::info!("Detached drive {}", self.config.name);
        Ok(())
    }

    async fn stat(&self, path: &str) -> Result<FileStat> {
        let meta = fs::metadata(self.physical_path(path))
            .await
            .map_err(|e| TierError::from_io(path, e))?;
        if !meta.is_file() {
            return Err(TierError::NotFound(path.to_string()));
        }
        Ok(FileStat::from_metadata(&meta))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        match fs::metadata(self.physical_path(path)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(TierError::Storage {
                path: path.to_string(),
                source,
            }),
        }
    }

    async fn open(&self, path: &str) -> Result<PathBuf> {
        let physical = self.physical_path(path);
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&physical)
            .await
            .map_err(|e| TierError::from_io(path, e))?;
        drop(file);
        Ok(physical)
    }

    async fn create(&self, path: &str) -> Result<PathBuf> {
        self.ensure_parent(path).await?;

        let physical = self.physical_path(path);
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&physical)
            .await
            .map_err(|e| TierError::from_io(path, e))?;
        file.sync_all()
            .await
            .map_err(|e| TierError::from_io(path, e))?;
        Ok(physical)
    }

    async fn copy_within(&self, src: &str, dest: &str) -> Result<()> {
        self.ensure_parent(dest).await?;
        copy_exclusive(&self.physical_path(src), src, &self.physical_path(dest), dest).await
    }

    async fn copy_from(&self, source: &dyn Drive, src: &str, dest: &str) -> Result<()> {
        self.ensure_parent(dest).await?;
        copy_exclusive(&source.physical_path(src), src, &self.physical_path(dest), dest).await
    }

    async fn rename(&self, src: &str, dest: &str) -> Result<()> {
        let target = self.physical_path(dest);
        // rename(2) silently replaces an existing target
        if fs::try_exists(&target)
            .await
            .map_err(|e| TierError::from_io(dest, e))?
        {
            return Err(TierError::AlreadyExists(dest.to_string()));
        }

        self.ensure_parent(dest).await?;
        fs::rename(self.physical_path(src), target)
            .await
            .map_err(|e| TierError::from_io(src, e))
    }

    async fn remove(&self, path: &str) -> Result<()> {
        fs::remove_file(self.physical_path(path))
            .await
            .map_err(|e| TierError::from_io(path, e))
    }

    async fn scan(&self) -> Result<Vec<(String, FileStat)>> {
        let root = self.root().to_path_buf();
        let mut found = Vec::new();
        let mut pending = vec![root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await.map_err(|source| TierError::Storage {
                path: dir.display().to_string(),
                source,
            })?;

            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                    continue;
                }
                if !file_type.is_file() {
                    continue;
                }

                let full = entry.path();
                let Some(relative) = tier_path_of(&root, &full) else {
                    tracing::warn!("Skipping non UTF-8 path {} during scan", full.display());
                    continue;
                };
                let meta = entry.metadata().await?;
                found.push((relative, FileStat::from_metadata(&meta)));
            }
        }

        found.sort_by(|a, b| a.0.cmp(&b.0));
        tracing::debug!("Scanned drive {}: {} files", self.config.name, found.len());
        Ok(found)
    }
}

fn tier_path_of(root: &Path, full: &Path) -> Option<String> {
    let relative = full.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

/// Copy `src_path` to a destination that must not exist yet. A partially
/// written destination is removed on failure.
async fn copy_exclusive(src_path: &Path, src: &str, dest_path: &Path, dest: &str) -> Result<()> {
    let mut reader = fs::File::open(src_path)
        .await
        .map_err(|e| TierError::from_io(src, e))?;
    let mut writer = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest_path)
        .await
        .map_err(|e| TierError::from_io(dest, e))?;

    let copied = async {
        tokio::io::copy(&mut reader, &mut writer).await?;
        writer.sync_all().await
    }
    .await;

    if let Err(source) = copied {
        drop(writer);
        let _ = fs::remove_file(dest_path).await;
        return Err(TierError::Storage {
            path: dest.to_string(),
            source,
        });
    }

    Ok(())
}

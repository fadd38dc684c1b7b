use crate::{DriveConfig, Result, TierError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

/// Metadata captured from a file on a backing drive.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileStat {
    pub size: u64,
    pub uid: u32,
    pub gid: u32,
    pub mode: u32,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub accessed: Option<DateTime<Utc>>,
}

impl FileStat {
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        #[cfg(unix)]
        let (uid, gid, mode) = {
            use std::os::unix::fs::MetadataExt;
            (meta.uid(), meta.gid(), meta.mode())
        };
        #[cfg(not(unix))]
        let (uid, gid, mode) = (0, 0, 0);

        Self {
            size: meta.len(),
            uid,
            gid,
            mode,
            created: meta.created().ok().map(to_utc),
            modified: meta.modified().ok().map(to_utc),
            accessed: meta.accessed().ok().map(to_utc),
        }
    }
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// A single backing store assigned to a tier.
///
/// All paths handed to a drive are tier-relative and already normalized by
/// [`normalize_tier_path`].
#[async_trait]
pub trait Drive: Send + Sync {
    fn config(&self) -> &DriveConfig;

    fn name(&self) -> &str {
        &self.config().name
    }

    fn is_volatile(&self) -> bool {
        self.config().is_volatile()
    }

    /// Absolute location of a tier path on this drive.
    fn physical_path(&self, path: &str) -> PathBuf;

    /// Check the drive is reachable and ready to serve files.
    async fn attach(&self) -> Result<()>;

    /// Release drive-level resources.
    async fn detach(&self) -> Result<()>;

    async fn stat(&self, path: &str) -> Result<FileStat>;

    async fn exists(&self, path: &str) -> Result<bool>;

    /// Open an existing file for read/write and return its physical path.
    async fn open(&self, path: &str) -> Result<PathBuf>;

    /// Create a new empty file and return its physical path. Fails if the
    /// path is occupied.
    async fn create(&self, path: &str) -> Result<PathBuf>;

    async fn copy_within(&self, src: &str, dest: &str) -> Result<()>;

    async fn copy_from(&self, source: &dyn Drive, src: &str, dest: &str) -> Result<()>;

    async fn rename(&self, src: &str, dest: &str) -> Result<()>;

    async fn remove(&self, path: &str) -> Result<()>;

    /// Walk the drive and report every regular file it holds.
    async fn scan(&self) -> Result<Vec<(String, FileStat)>>;
}

pub type DynDrive = Arc<dyn Drive>;

/// Attached drive backends, in registration order.
#[derive(Clone, Default)]
pub struct DriveSet {
    drives: Vec<DynDrive>,
}

impl DriveSet {
    pub fn new(drives: Vec<DynDrive>) -> Self {
        Self { drives }
    }

    pub fn get(&self, name: &str) -> Result<&DynDrive> {
        self.drives
            .iter()
            .find(|drive| drive.name() == name)
            .ok_or_else(|| TierError::UnknownDrive(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DynDrive> {
        self.drives.iter()
    }

    pub fn len(&self) -> usize {
        self.drives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drives.is_empty()
    }
}

/// Normalize a tier path: strip surrounding `/`, reject empty paths and
/// `.`/`..` components.
pub fn normalize_tier_path(path: &str) -> Result<String> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(TierError::MissingArgument(
            "file path cannot be empty".to_string(),
        ));
    }

    let mut components = Vec::new();
    for component in trimmed.split('/') {
        if component.is_empty() || component == "." || component == ".." {
            return Err(TierError::MissingArgument(format!(
                "invalid path component in {}: {:?}",
                path, component
            )));
        }
        components.push(component);
    }

    Ok(components.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tier_path() {
        assert_eq!(normalize_tier_path("/a/b.txt").unwrap(), "a/b.txt");
        assert_eq!(normalize_tier_path("a/b.txt/").unwrap(), "a/b.txt");
        assert_eq!(normalize_tier_path("file").unwrap(), "file");
    }

    #[test]
    fn test_normalize_rejects_empty_and_traversal() {
        for bad in ["", "/", "//", "a//b", "../etc/passwd", "a/./b", "a/.."] {
            assert!(
                matches!(normalize_tier_path(bad), Err(TierError::MissingArgument(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }
}

use crate::storage::drive::{FileStat, normalize_tier_path};
use crate::{DriveRegistry, Result, TierError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One file known to the tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub path: String,
    pub drive: String,
    pub size: u64,
    pub uid: u32,
    pub gid: u32,
    #[serde(default)]
    pub mode: u32,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accessed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl IndexEntry {
    pub fn from_stat(path: &str, drive: &str, stat: FileStat) -> Self {
        Self {
            path: path.to_string(),
            drive: drive.to_string(),
            size: stat.size,
            uid: stat.uid,
            gid: stat.gid,
            mode: stat.mode,
            created: stat.created,
            modified: stat.modified,
            accessed: stat.accessed,
            extra: BTreeMap::new(),
        }
    }
}

/// Immutable full copy of the master index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub revision: u64,
    pub entries: BTreeMap<String, IndexEntry>,
}

impl IndexSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check every entry against the drive registry and its own key. Keys must
    /// already be normalized tier paths, or no command could reach them.
    pub fn validate(&self, registry: &DriveRegistry) -> Result<()> {
        for (path, entry) in &self.entries {
            match normalize_tier_path(path) {
                Ok(normalized) if normalized == *path => {}
                _ => {
                    return Err(TierError::IndexCorruption(format!(
                        "entry key {:?} is not a normalized tier path",
                        path
                    )));
                }
            }
            if entry.path != *path {
                return Err(TierError::IndexCorruption(format!(
                    "entry keyed {} records path {}",
                    path, entry.path
                )));
            }
            if !registry.contains(&entry.drive) {
                return Err(TierError::IndexCorruption(format!(
                    "entry {} references unknown drive {}",
                    path, entry.drive
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub applied: usize,
    pub skipped: Vec<String>,
}

/// The tier's authoritative path -> entry mapping.
#[derive(Debug, Default)]
pub struct MasterIndex {
    entries: BTreeMap<String, IndexEntry>,
    revision: u64,
}

impl MasterIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a previously dumped snapshot as-is. Loading is not a mutation, so
    /// the snapshot's revision is kept.
    pub fn from_snapshot(snapshot: IndexSnapshot, registry: &DriveRegistry) -> Result<Self> {
        snapshot.validate(registry)?;
        Ok(Self {
            entries: snapshot.entries,
            revision: snapshot.revision,
        })
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn insert(&mut self, path: &str, entry: IndexEntry) -> Result<()> {
        if self.entries.contains_key(path) {
            return Err(TierError::DuplicateEntry(path.to_string()));
        }
        self.entries.insert(path.to_string(), entry);
        self.revision += 1;
        Ok(())
    }

    pub fn update(&mut self, path: &str, entry: IndexEntry) -> Result<()> {
        let slot = self
            .entries
            .get_mut(path)
            .ok_or_else(|| TierError::NotFound(path.to_string()))?;
        *slot = entry;
        self.revision += 1;
        Ok(())
    }

    pub fn remove(&mut self, path: &str) -> Result<IndexEntry> {
        let removed = self
            .entries
            .remove(path)
            .ok_or_else(|| TierError::NotFound(path.to_string()))?;
        self.revision += 1;
        Ok(removed)
    }

    /// Rewrite the stat fields of an entry from a fresh stat of its file. The
    /// drive and extra metadata are kept and the revision only moves when
    /// something changed.
    pub fn refresh(&mut self, path: &str, stat: FileStat) -> Result<IndexEntry> {
        let indexed = self.lookup(path)?;
        let mut current = IndexEntry::from_stat(path, &indexed.drive, stat);
        current.extra = indexed.extra.clone();
        if current != *indexed {
            self.update(path, current.clone())?;
        }
        Ok(current)
    }

    pub fn lookup(&self, path: &str) -> Result<&IndexEntry> {
        self.entries
            .get(path)
            .ok_or_else(|| TierError::NotFound(path.to_string()))
    }

    pub fn dump(&self) -> IndexSnapshot {
        IndexSnapshot {
            revision: self.revision,
            entries: self.entries.clone(),
        }
    }

    /// Sum of indexed file sizes per drive.
    pub fn bytes_on_drive(&self, drive: &str) -> u64 {
        self.entries
            .values()
            .filter(|entry| entry.drive == drive)
            .map(|entry| entry.size)
            .sum()
    }

    /// Swap in a whole new mapping. Nothing changes unless every entry is valid.
    pub fn replace(&mut self, snapshot: IndexSnapshot, registry: &DriveRegistry) -> Result<()> {
        snapshot.validate(registry)?;
        self.revision = self.revision.max(snapshot.revision) + 1;
        self.entries = snapshot.entries;
        Ok(())
    }

    /// Insert entries for paths not already present. Occupied paths are
    /// reported back instead of failing the call.
    pub fn merge(&mut self, snapshot: IndexSnapshot, registry: &DriveRegistry) -> Result<MergeReport> {
        snapshot.validate(registry)?;

        let mut report = MergeReport::default();
        for (path, entry) in snapshot.entries {
            if self.entries.contains_key(&path) {
                report.skipped.push(path);
                continue;
            }
            self.insert(&path, entry)?;
            report.applied += 1;
        }
        Ok(report)
    }
}

use crate::storage::MasterIndex;
use crate::{DriveConfig, DriveRegistry, FillMethod, Result, TierConfig, TierError};
use rand::seq::SliceRandom;

/// Chooses the drive that receives a newly created file.
#[derive(Debug, Clone)]
pub struct Placement {
    method: FillMethod,
    default_drive: String,
    min_free_bytes: u64,
}

impl Placement {
    pub fn new(config: &TierConfig, registry: &DriveRegistry) -> Result<Self> {
        let default_drive = match config.default_drive.as_deref() {
            Some(name) => registry.resolve(name)?.name.clone(),
            None => registry
                .iter()
                .next()
                .map(|drive| drive.name.clone())
                .ok_or_else(|| {
                    TierError::Config(format!("tier {} has no drives", config.name))
                })?,
        };

        Ok(Self {
            method: config.fill_method,
            default_drive,
            min_free_bytes: config.min_free_bytes,
        })
    }

    pub fn method(&self) -> FillMethod {
        self.method
    }

    pub fn default_drive(&self) -> &str {
        &self.default_drive
    }

    /// Free bytes left on a drive according to its capacity hint and the
    /// bytes indexed on it. `None` when the drive has no capacity hint.
    pub fn free_bytes(&self, drive: &DriveConfig, index: &MasterIndex) -> Option<u64> {
        drive
            .capacity_bytes
            .map(|capacity| capacity.saturating_sub(index.bytes_on_drive(&drive.name)))
    }

    pub fn is_eligible(&self, drive: &DriveConfig, index: &MasterIndex, needed: u64) -> bool {
        match self.free_bytes(drive, index) {
            None => true,
            Some(free) => free.saturating_sub(needed) > self.min_free_bytes,
        }
    }

    /// Pick a drive for `needed` bytes at `path`. `preferred` wins when it is
    /// eligible, which lets copies stay on the source drive.
    pub fn select(
        &self,
        registry: &DriveRegistry,
        index: &MasterIndex,
        path: &str,
        needed: u64,
        preferred: Option<&str>,
    ) -> Result<String> {
        if let Some(name) = preferred {
            if self.is_eligible(registry.resolve(name)?, index, needed) {
                return Ok(name.to_string());
            }
        }

        let eligible: Vec<&DriveConfig> = registry
            .iter()
            .filter(|drive| self.is_eligible(drive, index, needed))
            .collect();

        let selected = match self.method {
            FillMethod::DefaultDrive => eligible
                .iter()
                .find(|drive| drive.name == self.default_drive)
                .copied(),
            FillMethod::LargestFirst => eligible
                .iter()
                .max_by_key(|drive| self.free_bytes(drive, index).unwrap_or(u64::MAX))
                .copied(),
            FillMethod::Random => eligible.choose(&mut rand::thread_rng()).copied(),
        };

        selected.map(|drive| drive.name.clone()).ok_or_else(|| {
            TierError::Storage {
                path: path.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::StorageFull,
                    format!("no drive with {} free bytes available on this tier", needed),
                ),
            }
        })
    }
}

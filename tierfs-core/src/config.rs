use crate::{Result, TierError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_MAX_FRAME_BYTES: u32 = 64 * 1024 * 1024;

/// Tier-level options. Built once by the supervisor and owned by the tier for
/// its whole lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    pub name: String,
    #[serde(default)]
    pub tier_number: u32,
    #[serde(default)]
    pub fill_method: FillMethod,
    #[serde(default)]
    pub default_drive: Option<String>,
    /// A drive with this many free bytes or fewer refuses new files.
    #[serde(default)]
    pub min_free_bytes: u64,
    #[serde(default)]
    pub scan_on_startup: bool,
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: u32,
}

fn default_max_frame_bytes() -> u32 {
    DEFAULT_MAX_FRAME_BYTES
}

impl TierConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tier_number: 0,
            fill_method: FillMethod::default(),
            default_drive: None,
            min_free_bytes: 0,
            scan_on_startup: false,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TierError::Config("tier name cannot be empty".to_string()));
        }
        if self.max_frame_bytes == 0 {
            return Err(TierError::Config(
                "max_frame_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// How a tier picks the drive that receives a newly created file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    #[default]
    DefaultDrive,
    LargestFirst,
    Random,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveClass {
    #[default]
    Disk,
    /// RAM-backed store. Empty at startup and never scanned.
    Ram,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveConfig {
    pub name: String,
    pub mount_point: PathBuf,
    #[serde(default)]
    pub class: DriveClass,
    #[serde(default)]
    pub capacity_bytes: Option<u64>,
    #[serde(default)]
    pub device: Option<String>,
}

impl DriveConfig {
    pub fn new(name: impl Into<String>, mount_point: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            mount_point: mount_point.into(),
            class: DriveClass::Disk,
            capacity_bytes: None,
            device: None,
        }
    }

    pub fn with_class(mut self, class: DriveClass) -> Self {
        self.class = class;
        self
    }

    pub fn with_capacity(mut self, capacity_bytes: u64) -> Self {
        self.capacity_bytes = Some(capacity_bytes);
        self
    }

    pub fn is_volatile(&self) -> bool {
        self.class == DriveClass::Ram
    }
}

use crate::{DriveConfig, Result, TierError};
use std::collections::HashMap;

/// The fixed set of drives assigned to one tier, in registration order.
#[derive(Debug, Clone, Default)]
pub struct DriveRegistry {
    drives: Vec<DriveConfig>,
    by_name: HashMap<String, usize>,
}

impl DriveRegistry {
    pub fn new(configs: impl IntoIterator<Item = DriveConfig>) -> Result<Self> {
        let mut registry = Self::default();
        for config in configs {
            registry.register(config)?;
        }
        Ok(registry)
    }

    fn register(&mut self, config: DriveConfig) -> Result<()> {
        if config.name.trim().is_empty() {
            return Err(TierError::Config("drive name cannot be empty".to_string()));
        }
        if self.by_name.contains_key(&config.name) {
            return Err(TierError::DuplicateDrive(config.name));
        }

        self.by_name.insert(config.name.clone(), self.drives.len());
        self.drives.push(config);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&DriveConfig> {
        self.by_name
            .get(name)
            .map(|idx| &self.drives[*idx])
            .ok_or_else(|| TierError::UnknownDrive(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn list_names(&self) -> Vec<String> {
        self.drives.iter().map(|drive| drive.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DriveConfig> {
        self.drives.iter()
    }

    pub fn len(&self) -> usize {
        self.drives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drives.is_empty()
    }
}

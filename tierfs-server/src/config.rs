use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tierfs_core::{DriveConfig, IndexSnapshot, Result, TierConfig, TierError};

/// Settings file: every drive known to the host and the tiers built from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub tiers: Vec<TierSection>,
    pub drives: Vec<DriveConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierSection {
    pub tier: TierConfig,
    /// Drive names in registration order.
    pub drives: Vec<String>,
}

impl Settings {
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path))
            .add_source(::config::Environment::with_prefix("TIERFS"))
            .build()
            .map_err(|e| TierError::Config(e.to_string()))?;

        let settings: Settings = settings
            .try_deserialize()
            .map_err(|e| TierError::Config(e.to_string()))?;

        Ok(settings)
    }

    /// Pick one tier and resolve its drives. Without a name the file must
    /// describe exactly one tier.
    pub fn select(&self, name: Option<&str>) -> Result<(TierConfig, Vec<DriveConfig>)> {
        let section = match name {
            Some(name) => self
                .tiers
                .iter()
                .find(|section| section.tier.name == name)
                .ok_or_else(|| TierError::Config(format!("tier '{}' not found in settings", name)))?,
            None => match self.tiers.as_slice() {
                [only] => only,
                [] => return Err(TierError::Config("settings define no tiers".to_string())),
                _ => {
                    return Err(TierError::Config(
                        "settings define several tiers; pick one with --tier".to_string(),
                    ));
                }
            },
        };

        let drives = section
            .drives
            .iter()
            .map(|drive_name| {
                self.drives
                    .iter()
                    .find(|drive| &drive.name == drive_name)
                    .cloned()
                    .ok_or_else(|| TierError::UnknownDrive(drive_name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((section.tier.clone(), drives))
    }
}

/// Read a JSON index snapshot written by a previous run.
pub fn load_snapshot(path: &Path) -> Result<IndexSnapshot> {
    let raw = std::fs::read(path)?;
    let snapshot = serde_json::from_slice(&raw)?;
    Ok(snapshot)
}

/// Write a snapshot as JSON, readable by [`load_snapshot`].
pub fn save_snapshot(path: &Path, snapshot: &IndexSnapshot) -> Result<()> {
    let raw = serde_json::to_vec_pretty(snapshot)?;
    std::fs::write(path, raw)?;
    Ok(())
}

/// Where a snapshot taken without SHUTDOWN is kept, next to the saved index.
pub fn recovery_path(index: &Path) -> PathBuf {
    index.with_extension("recovered.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tierfs_core::{DriveClass, FillMethod};

    const SETTINGS: &str = r#"
[[drives]]
name = "ssd0"
mount_point = "/mnt/ssd0"
capacity_bytes = 1000

[[drives]]
name = "ram0"
mount_point = "/run/tierfs/ram0"
class = "ram"

[[drives]]
name = "hdd0"
mount_point = "/mnt/hdd0"

[[tiers]]
drives = ["ram0", "ssd0"]

[tiers.tier]
name = "hot"
tier_number = 0
fill_method = "largest_first"
min_free_bytes = 10

[[tiers]]
drives = ["hdd0"]

[tiers.tier]
name = "cold"
tier_number = 1
scan_on_startup = true
"#;

    fn write_settings(contents: &str) -> (tempfile::TempDir, String) {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("tierfs.toml");
        std::fs::write(&path, contents).unwrap();
        let path = path.to_string_lossy().to_string();
        (temp_dir, path)
    }

    #[test]
    fn test_select_named_tier() {
        let (_temp_dir, path) = write_settings(SETTINGS);
        let settings = Settings::from_file(&path).unwrap();

        let (tier, drives) = settings.select(Some("hot")).unwrap();
        assert_eq!(tier.fill_method, FillMethod::LargestFirst);
        assert_eq!(tier.min_free_bytes, 10);
        let names: Vec<&str> = drives.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["ram0", "ssd0"]);
        assert_eq!(drives[0].class, DriveClass::Ram);
        assert_eq!(drives[1].capacity_bytes, Some(1000));

        let (cold, _) = settings.select(Some("cold")).unwrap();
        assert!(cold.scan_on_startup);
        assert_eq!(cold.fill_method, FillMethod::DefaultDrive);
    }

    #[test]
    fn test_select_requires_a_name_for_several_tiers() {
        let (_temp_dir, path) = write_settings(SETTINGS);
        let settings = Settings::from_file(&path).unwrap();
        assert!(matches!(settings.select(None), Err(TierError::Config(_))));
        assert!(matches!(
            settings.select(Some("warm")),
            Err(TierError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_drive_in_tier() {
        let (_temp_dir, path) = write_settings(
            r#"
drives = []

[[tiers]]
drives = ["missing"]

[tiers.tier]
name = "only"
"#,
        );
        let settings = Settings::from_file(&path).unwrap();
        assert!(matches!(
            settings.select(None),
            Err(TierError::UnknownDrive(_))
        ));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = Settings::from_file("/nonexistent/tierfs.toml");
        assert!(matches!(result, Err(TierError::Config(_))));
    }

    #[test]
    fn test_save_then_load_snapshot() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = recovery_path(&temp_dir.path().join("index.json"));
        assert_eq!(path, temp_dir.path().join("index.recovered.json"));

        let snapshot = IndexSnapshot {
            revision: 9,
            ..Default::default()
        };
        save_snapshot(&path, &snapshot).unwrap();
        assert_eq!(load_snapshot(&path).unwrap(), snapshot);
    }

    #[test]
    fn test_load_snapshot() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("index.json");
        std::fs::write(&path, br#"{"revision": 4, "entries": {}}"#).unwrap();
        let snapshot = load_snapshot(&path).unwrap();
        assert_eq!(snapshot.revision, 4);
        assert!(snapshot.is_empty());
    }
}

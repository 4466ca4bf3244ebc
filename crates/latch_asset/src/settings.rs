//! Asset system settings

use crate::io::AssetIo;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Asset system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Directory every resource path resolves against.
    pub resource_root: PathBuf,
    /// Manifest path, relative to the resource root.
    pub manifest: String,
    /// Engine data container, relative to the resource root.
    pub container: Option<String>,
    pub worker_threads: usize,
    pub budget: SchedulerBudget,
}

/// Per-tick work limits of the resource scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerBudget {
    pub disk_reads_per_tick: usize,
    pub max_in_flight: usize,
    pub reclaims_per_tick: usize,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            resource_root: PathBuf::from("resources"),
            manifest: "Manifest.json".to_string(),
            container: Some("EngineData.blob".to_string()),
            worker_threads: 8,
            budget: SchedulerBudget::default(),
        }
    }
}

impl Default for SchedulerBudget {
    fn default() -> Self {
        Self {
            disk_reads_per_tick: 1,
            max_in_flight: 4,
            reclaims_per_tick: 6,
        }
    }
}

impl AssetSettings {
    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Settings rooted at `resource_root`, everything else default.
    pub fn with_root(resource_root: impl Into<PathBuf>) -> Self {
        Self {
            resource_root: resource_root.into(),
            ..Self::default()
        }
    }

    pub fn asset_io(&self) -> AssetIo {
        let io = AssetIo::new(&self.resource_root);
        match &self.container {
            Some(container) => io.with_container(container),
            None => io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_budget() {
        let settings = AssetSettings::default();
        assert_eq!(settings.worker_threads, 8);
        assert_eq!(
            settings.budget,
            SchedulerBudget {
                disk_reads_per_tick: 1,
                max_in_flight: 4,
                reclaims_per_tick: 6,
            }
        );
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets.json");
        std::fs::write(
            &path,
            r#"{ "resource_root": "data", "budget": { "max_in_flight": 2 } }"#,
        )
        .unwrap();

        let settings = AssetSettings::load(&path).unwrap();
        assert_eq!(settings.resource_root, PathBuf::from("data"));
        assert_eq!(settings.manifest, "Manifest.json");
        assert_eq!(settings.budget.max_in_flight, 2);
        assert_eq!(settings.budget.reclaims_per_tick, 6);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            AssetSettings::load(&path),
            Err(SettingsError::Parse { .. })
        ));
        assert!(matches!(
            AssetSettings::load(dir.path().join("missing.json")),
            Err(SettingsError::Io { .. })
        ));
    }
}

//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/calctree/calctree.toml`
//! 3. Local config: `<dir>/.calctree.toml` (directory of the snapshot)
//! 4. Environment variables: `CALCTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Default snapshot file name, relative to the working directory.
pub const DEFAULT_SNAPSHOT: &str = "calctree.json";

/// Unified configuration for calctree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Decimal places when printing results
    pub precision: usize,
    /// Print calculator and variable ids next to names
    pub show_ids: bool,
    /// Snapshot used when no `--file` is given
    pub snapshot: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            precision: 4,
            show_ids: true,
            snapshot: PathBuf::from(DEFAULT_SNAPSHOT),
        }
    }
}

/// Raw settings for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub precision: Option<usize>,
    pub show_ids: Option<bool>,
    pub snapshot: Option<PathBuf>,
}

/// Get the XDG config directory for calctree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "calctree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("calctree.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".calctree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

impl Settings {
    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            precision: overlay.precision.unwrap_or(self.precision),
            show_ids: overlay.show_ids.unwrap_or(self.show_ids),
            snapshot: overlay
                .snapshot
                .clone()
                .unwrap_or_else(|| self.snapshot.clone()),
        }
    }

    /// Expand `~` and `$VAR` in the snapshot path.
    fn expand_paths(&mut self) {
        let raw = self.snapshot.to_string_lossy().to_string();
        if let Ok(expanded) = shellexpand::full(&raw) {
            self.snapshot = PathBuf::from(expanded.into_owned());
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory holding a `.calctree.toml`
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let global = global_config_path().filter(|p| p.exists());
        Self::load_from(global.as_deref(), local_dir)
    }

    /// Load settings from an explicit global config file (used by tests).
    pub fn load_from(global: Option<&Path>, local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global {
            if global_path.exists() {
                current = current.merge_with(&load_raw_settings(global_path)?);
            }
        }

        // 3. Local config
        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                current = current.merge_with(&load_raw_settings(&local_path)?);
            }
        }

        // 4. Environment variables (explicit override)
        current = Self::apply_env_overrides(current)?;

        current.expand_paths();
        Ok(current)
    }

    /// Apply CALCTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("CALCTREE").try_parsing(true))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get::<usize>("precision") {
            settings.precision = val;
        }
        if let Ok(val) = config.get_bool("show_ids") {
            settings.show_ids = val;
        }
        if let Ok(val) = config.get_string("snapshot") {
            settings.snapshot = PathBuf::from(val);
        }

        Ok(settings)
    }

    /// Render as TOML for `calctree config`.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.precision, 4);
        assert!(settings.show_ids);
        assert_eq!(settings.snapshot, PathBuf::from(DEFAULT_SNAPSHOT));
    }

    #[test]
    fn test_merge_with_only_overrides_specified_fields() {
        let base = Settings::default();
        let overlay = RawSettings {
            precision: Some(2),
            ..Default::default()
        };
        let merged = base.merge_with(&overlay);
        assert_eq!(merged.precision, 2);
        assert!(merged.show_ids);
    }

    #[test]
    fn test_raw_settings_parse_partial_toml() {
        let raw: RawSettings = toml::from_str("show_ids = false\n").unwrap();
        assert_eq!(raw.show_ids, Some(false));
        assert_eq!(raw.precision, None);
    }

    #[test]
    fn test_to_toml_round_trip() {
        let settings = Settings::default();
        let text = settings.to_toml().unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }
}

//! Configuration file support for medtrack.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/medtrack/config.toml`.

use crate::calendar::WeekStart;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub calendar: CalendarConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl DataConfig {
    /// Location of the record store inside the data directory
    pub fn store_path(data_dir: &Path) -> PathBuf {
        data_dir.join("medtrack.json")
    }
}

/// Today view configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// List doses already taken below the pending ones
    #[serde(default = "default_show_taken")]
    pub show_taken: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            show_taken: default_show_taken(),
        }
    }
}

/// Week view configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct CalendarConfig {
    #[serde(default)]
    pub week_start: WeekStart,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("medtrack")
}

fn default_show_taken() -> bool {
    true
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("medtrack").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.dashboard.show_taken);
        assert_eq!(config.calendar.week_start, WeekStart::Sunday);
        assert!(config.data.data_dir.ends_with("medtrack"));
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.calendar.week_start = WeekStart::Monday;
        config.save_to(&path).unwrap();

        let parsed = Config::load_from(&path).unwrap();
        assert_eq!(parsed.calendar.week_start, WeekStart::Monday);
        assert_eq!(parsed.data.data_dir, config.data.data_dir);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[dashboard]
show_taken = false
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(!config.dashboard.show_taken);
        assert_eq!(config.calendar.week_start, WeekStart::Sunday); // default
    }

    #[test]
    fn test_invalid_week_start() {
        let toml_str = r#"
[calendar]
week_start = "friday"
"#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }
}

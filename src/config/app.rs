//! Application configuration loading from config.toml
//!
//! Every section and field has a default, so a missing file or a partial file
//! both produce a usable configuration.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where attached photos are stored
    pub photos: PhotoConfig,
    /// Nutrition analysis knobs
    pub nutrition: NutritionConfig,
}

/// Photo storage settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    /// Root directory; one sub-folder per record kind is created beneath it
    pub root: PathBuf,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data/photos"),
        }
    }
}

/// Nutrition analysis settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NutritionConfig {
    /// First hour of the target eating window (24h clock)
    pub eating_window_start_hour: u32,
    /// Last hour of the target eating window (24h clock)
    pub eating_window_end_hour: u32,
    /// Look-back used by the plateau check when the caller gives none
    pub plateau_weeks: u32,
}

impl Default for NutritionConfig {
    fn default() -> Self {
        Self {
            eating_window_start_hour: 12,
            eating_window_end_hour: 20,
            plateau_weeks: 2,
        }
    }
}

impl AppConfig {
    /// Rejects settings that would make later calculations meaningless.
    pub fn validate(&self) -> Result<()> {
        let nutrition = &self.nutrition;
        if nutrition.eating_window_end_hour > 24
            || nutrition.eating_window_start_hour >= nutrition.eating_window_end_hour
        {
            return Err(Error::Config {
                message: format!(
                    "Eating window {}:00-{}:00 is not a valid range",
                    nutrition.eating_window_start_hour, nutrition.eating_window_end_hour
                ),
            });
        }
        if nutrition.plateau_weeks == 0 {
            return Err(Error::Config {
                message: "plateau_weeks must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Parses configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from a TOML file, falling back to defaults when the
/// file does not exist.
///
/// # Errors
/// Returns an error if:
/// - The file exists but cannot be read
/// - The TOML syntax is invalid
/// - The eating window or plateau look-back is out of range
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!("{} not found, using default configuration", path.display());
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;
    parse_config(&contents)
}

/// Loads configuration from the default location (./config.toml)
pub fn load_default_config() -> Result<AppConfig> {
    load_config("config.toml")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [photos]
            root = "/var/lib/pool-buddy/photos"

            [nutrition]
            eating_window_start_hour = 11
            eating_window_end_hour = 19
            plateau_weeks = 3
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.photos.root, PathBuf::from("/var/lib/pool-buddy/photos"));
        assert_eq!(config.nutrition.eating_window_start_hour, 11);
        assert_eq!(config.nutrition.eating_window_end_hour, 19);
        assert_eq!(config.nutrition.plateau_weeks, 3);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = parse_config("[nutrition]\nplateau_weeks = 4\n").unwrap();
        assert_eq!(config.photos.root, PathBuf::from("data/photos"));
        assert_eq!(config.nutrition.eating_window_start_hour, 12);
        assert_eq!(config.nutrition.eating_window_end_hour, 20);
        assert_eq!(config.nutrition.plateau_weeks, 4);
    }

    #[test]
    fn test_invalid_window_rejected() {
        let result = parse_config("[nutrition]\neating_window_start_hour = 20\neating_window_end_hour = 12\n");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = load_config("definitely/not/here/config.toml").unwrap();
        assert_eq!(config.nutrition.plateau_weeks, 2);
    }
}

//! Application Configuration
//!
//! Scanner settings stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analysis::ReferenceSet;
use crate::error::ConfigError;
use crate::pipeline::PipelineConfig;

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Numbers to check tickets against, if fixed in the config file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_numbers: Option<Vec<u32>>,
    /// Frame analysis settings
    pub pipeline: PipelineConfig,
    /// Scan loop pacing
    pub scan_loop: ScanLoopSettings,
}

impl AppConfig {
    /// Check the scanner settings; called once when a session is set up
    ///
    /// `reference_numbers` is checked by [`AppConfig::reference_set`], only
    /// when the configured numbers are actually used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        self.scan_loop.validate()
    }

    /// The configured reference set, if any
    pub fn reference_set(&self) -> Result<Option<ReferenceSet>, ConfigError> {
        self.reference_numbers
            .as_ref()
            .map(|numbers| ReferenceSet::new(numbers.iter().copied()))
            .transpose()
    }
}

/// Scan loop pacing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanLoopSettings {
    /// Minimum time between the starts of two analyses
    pub min_interval_ms: u64,
    /// Analyses slower than this are logged as warnings
    pub slow_frame_warn_ms: u64,
}

impl Default for ScanLoopSettings {
    fn default() -> Self {
        Self {
            min_interval_ms: 500,
            slow_frame_warn_ms: 500,
        }
    }
}

impl ScanLoopSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slow_frame_warn_ms == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "scan_loop.slow_frame_warn_ms",
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Get the configuration directory
pub fn config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "lottoscanner", "LottoScanner")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(proj_dirs.config_dir().to_path_buf())
}

/// Default location of the configuration file
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

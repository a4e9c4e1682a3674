use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::market::{default_trend, TrendPoint};
use crate::parcel::LandParcel;

fn default_name() -> String {
    "valuation_demo".to_string()
}

fn default_tick_interval_ms() -> u64 {
    1_500
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Master seed for the soil scan. Drawn from entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default)]
    pub parcel: LandParcel,
    #[serde(default = "default_trend")]
    pub market_trend: Vec<TrendPoint>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            seed: None,
            tick_interval_ms: default_tick_interval_ms(),
            parcel: LandParcel::default(),
            market_trend: default_trend(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(text).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            bail!("tick_interval_ms must be greater than zero");
        }
        if let Some(point) = self.market_trend.iter().find(|p| p.label.trim().is_empty()) {
            bail!("market trend point with price {} has an empty label", point.price);
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<AppConfig> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Like [`load`](Self::load) but falls back to defaults when no file is
    /// given.
    pub fn load_or_default(&self, file: Option<&Path>) -> Result<AppConfig> {
        match file {
            Some(file) => self.load(file),
            None => Ok(AppConfig::default()),
        }
    }
}

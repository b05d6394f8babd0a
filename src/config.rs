use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.exchangeratesapi.io";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TaxConfig {
    #[serde(default = "default_flat_rate")]
    pub flat_rate: f64,
}

impl Default for TaxConfig {
    fn default() -> Self {
        TaxConfig {
            flat_rate: default_flat_rate(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Reporting currency all profit/loss and tax figures are expressed in.
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Minimum spacing between upstream rate requests.
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
    /// Append-only log of every upstream call.
    #[serde(default = "default_audit_log")]
    pub audit_log: PathBuf,
    #[serde(default)]
    pub tax: TaxConfig,
    /// Memoize rates per pair/date for the duration of a run.
    #[serde(default = "default_cache_rates")]
    pub cache_rates: bool,
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_flat_rate() -> f64 {
    crate::core::FlatRateTax::DEFAULT_RATE
}

fn default_rate_limit_ms() -> u64 {
    100
}

fn default_audit_log() -> PathBuf {
    PathBuf::from("fx_audit.log")
}

fn default_cache_rates() -> bool {
    true
}

impl AppConfig {
    /// Loads the configuration from the platform config directory, falling
    /// back to defaults when no file has been set up.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config file at {}, using defaults", config_path.display());
            return Ok(Self::default_values());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "cryptotax")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    fn default_values() -> Self {
        // Route through serde so the field defaults stay the single source
        // of truth.
        serde_yaml::from_str("{}").expect("default config must deserialize")
    }
}

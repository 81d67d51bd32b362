//! Oracle configuration.
//!
//! Sources, lowest precedence first: built-in defaults, an optional JSON
//! file, then `SIGHTLINE_*` environment variables (a `.env` file is honoured).
//! Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

pub const ENV_DATA_DIR: &str = "SIGHTLINE_DATA_DIR";
pub const ENV_DEFAULT_WAVE: &str = "SIGHTLINE_DEFAULT_WAVE";
pub const ENV_DEFAULT_TARGET: &str = "SIGHTLINE_DEFAULT_TARGET";
pub const ENV_ORDER_CONFLICT: &str = "SIGHTLINE_ORDER_CONFLICT";

/// What to do when a query asks for merged-only and orders-only at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderConflictPolicy {
    /// Return merged spectra only and emit a warning.
    #[default]
    MergedWins,
    /// Fail with [`crate::error::OracleError::ConflictingOrderFlags`].
    Reject,
}

impl std::str::FromStr for OrderConflictPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "merged_wins" => Ok(OrderConflictPolicy::MergedWins),
            "reject" => Ok(OrderConflictPolicy::Reject),
            other => bail!("Unknown order conflict policy: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Directory the table paths below are resolved against.
    pub data_dir: PathBuf,
    pub observation_log_file: PathBuf,
    pub reddening_file: PathBuf,
    pub spectral_type_file: PathBuf,
    /// Wavelength (Å) used by wavelength queries that omit one.
    pub default_wave: f64,
    /// Target used by target queries that omit one.
    pub default_target: String,
    pub order_conflict: OrderConflictPolicy,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            observation_log_file: PathBuf::from("DR4_ObsLog.csv"),
            reddening_file: PathBuf::from("sightline_data/Formatted_EBV.csv"),
            spectral_type_file: PathBuf::from("sightline_data/Targets_SpType.csv"),
            default_wave: 5000.0,
            default_target: "HD164073".to_string(),
            order_conflict: OrderConflictPolicy::MergedWins,
        }
    }
}

impl OracleConfig {
    /// Defaults, overlaid with `file` when given, then with the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = match file {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Overlay values from a key lookup (the process environment in practice).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(wave) = lookup(ENV_DEFAULT_WAVE) {
            self.default_wave = wave
                .trim()
                .parse()
                .with_context(|| format!("{ENV_DEFAULT_WAVE}: '{wave}' is not a number"))?;
        }
        if let Some(target) = lookup(ENV_DEFAULT_TARGET) {
            self.default_target = target;
        }
        if let Some(policy) = lookup(ENV_ORDER_CONFLICT) {
            self.order_conflict = policy.parse().context(ENV_ORDER_CONFLICT)?;
        }
        Ok(())
    }

    pub fn observation_log_path(&self) -> PathBuf {
        self.data_dir.join(&self.observation_log_file)
    }

    pub fn reddening_path(&self) -> PathBuf {
        self.data_dir.join(&self.reddening_file)
    }

    pub fn spectral_type_path(&self) -> PathBuf {
        self.data_dir.join(&self.spectral_type_file)
    }
}

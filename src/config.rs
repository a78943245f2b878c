//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MBOXTUNE_CONFIG` (environment variable)
//! 2. `~/.config/mboxtune/config.toml` (Linux/macOS)
//!    `%APPDATA%\mboxtune\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TuneError};
use crate::filter::{ContentFilter, FilterConfig};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Content filter thresholds and patterns.
    pub filter: FilterConfig,
    /// Dataset finalization and output files.
    pub dataset: DatasetConfig,
    /// Synthetic prompt generation.
    pub enhancer: EnhancerConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// The mailbox owner's address; `--owner` on the command line wins.
    pub owner_address: Option<String>,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Dataset finalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Share of examples written to the validation file, in `[0, 1)`.
    pub validation_split_ratio: f64,
    /// Seed for the shuffle before splitting.
    pub seed: u64,
    /// Below this many examples a warning is logged.
    pub min_examples: usize,
    /// Hard cap on the number of examples.
    pub max_examples: usize,
    /// File name for training examples inside the output directory.
    pub training_file: String,
    /// File name for validation examples inside the output directory.
    pub validation_file: String,
}

/// Prompt enhancer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    /// Unresolved responses sent to the enhancer per call.
    pub batch_size: usize,
    /// Response bodies are truncated to this many characters before enhancement.
    pub max_body_chars: usize,
    /// Prompt used when a batch fails or returns nothing for an entry.
    pub fallback_prompt: String,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            owner_address: None,
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            validation_split_ratio: 0.1,
            seed: 42,
            min_examples: 10,
            max_examples: 10_000,
            training_file: "training.jsonl".to_string(),
            validation_file: "validation.jsonl".to_string(),
        }
    }
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_body_chars: 1000,
            fallback_prompt: "Write an email in your tone.".to_string(),
        }
    }
}

// ── Validation ──────────────────────────────────────────────────

impl Config {
    /// Resolve the owner address: the explicit value first, then `[general]`.
    pub fn owner<'a>(&'a self, explicit: Option<&'a str>) -> Option<&'a str> {
        explicit
            .or(self.general.owner_address.as_deref())
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }

    /// Check everything that must hold before any mail is read.
    ///
    /// Returns the owner address to use.
    pub fn validate<'a>(&'a self, explicit_owner: Option<&'a str>) -> Result<&'a str> {
        let owner = self.owner(explicit_owner).ok_or_else(|| {
            TuneError::Config("no owner address given (use --owner or [general] owner_address)".into())
        })?;
        if !owner.contains('@') {
            return Err(TuneError::Config(format!(
                "owner address '{owner}' is not an email address"
            )));
        }

        let ratio = self.dataset.validation_split_ratio;
        if !(0.0..1.0).contains(&ratio) {
            return Err(TuneError::Config(format!(
                "validation_split_ratio must be in [0, 1), got {ratio}"
            )));
        }
        if self.enhancer.batch_size == 0 {
            return Err(TuneError::Config("enhancer batch_size must be at least 1".into()));
        }

        ContentFilter::new(&self.filter)?;
        Ok(owner)
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    let Some(path) = config_file_path() else {
        return Config::default();
    };
    if !path.exists() {
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(cfg) => {
                tracing::info!(path = %path.display(), "Loaded config");
                cfg
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config, using defaults"
                );
                Config::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read config file, using defaults"
            );
            Config::default()
        }
    }
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<PathBuf> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(path)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MBOXTUNE_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mboxtune").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mboxtune")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mboxtune.log")
}

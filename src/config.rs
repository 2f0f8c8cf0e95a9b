//! Configuration module.
//!
//! Handles loading, validating, and merging `snaplog.toml`. Stock defaults
//! are the base layer; a user file in the config directory overrides any
//! subset of keys.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [compression]
//! max_dimension = 1920                    # Longest side in pixels
//! max_file_size = 500000                  # Byte budget per compressed image
//! quality_ladder = [0.8, 0.6, 0.4, 0.2]   # JPEG qualities, highest first
//!
//! [drafts]
//! storage_key = "item-store"              # Key the draft queue is stored under
//!
//! [sync]
//! max_retries = 5                         # Omit for unbounded retries
//!
//! [processing]
//! max_processes = 4                       # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse: override just the values you want:
//!
//! ```toml
//! [compression]
//! max_file_size = 250000
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::storage::validate_key;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the config directory.
pub const CONFIG_FILENAME: &str = "snaplog.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `snaplog.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SnapLogConfig {
    /// Image size and quality budget.
    pub compression: CompressionSettings,
    /// Local draft queue settings.
    pub drafts: DraftsConfig,
    /// Sync driver retry policy.
    pub sync: SyncConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl SnapLogConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let compression = &self.compression;
        if compression.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "compression.max_dimension must be positive".into(),
            ));
        }
        if compression.max_file_size == 0 {
            return Err(ConfigError::Validation(
                "compression.max_file_size must be positive".into(),
            ));
        }
        if compression.quality_ladder.is_empty() {
            return Err(ConfigError::Validation(
                "compression.quality_ladder must not be empty".into(),
            ));
        }
        if compression
            .quality_ladder
            .iter()
            .any(|q| !(*q > 0.0 && *q <= 1.0))
        {
            return Err(ConfigError::Validation(
                "compression.quality_ladder values must be in (0, 1]".into(),
            ));
        }
        if compression.quality_ladder.windows(2).any(|w| w[1] >= w[0]) {
            return Err(ConfigError::Validation(
                "compression.quality_ladder must be strictly descending".into(),
            ));
        }
        if validate_key(&self.drafts.storage_key).is_err() {
            return Err(ConfigError::Validation(format!(
                "drafts.storage_key '{}' may only contain letters, digits, '.', '_' or '-'",
                self.drafts.storage_key
            )));
        }
        Ok(())
    }
}

/// Compression budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionSettings {
    /// Longest allowed side in pixels.
    pub max_dimension: u32,
    /// Maximum encoded size in bytes.
    pub max_file_size: u64,
    /// Normalized JPEG qualities, tried from first to last.
    pub quality_ladder: Vec<f32>,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            max_dimension: 1920,
            max_file_size: 500_000,
            quality_ladder: vec![0.8, 0.6, 0.4, 0.2],
        }
    }
}

/// Draft queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DraftsConfig {
    /// Storage key holding the serialized queue.
    pub storage_key: String,
}

impl Default for DraftsConfig {
    fn default() -> Self {
        Self {
            storage_key: "item-store".to_string(),
        }
    }
}

/// Sync retry settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Failed attempts after which automatic sync skips a draft.
    /// When absent, drafts are retried indefinitely.
    pub max_retries: Option<u32>,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image compression workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SnapLogConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `snaplog.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no config file exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SnapLogConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SnapLogConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `snaplog.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<SnapLogConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `snaplog.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# SnapLog Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.

# ---------------------------------------------------------------------------
# Image compression
# ---------------------------------------------------------------------------
[compression]
# Longest side of a compressed photo, in pixels. Smaller photos are never
# upscaled; larger ones are scaled down preserving aspect ratio.
max_dimension = 1920

# Byte budget for each compressed photo.
max_file_size = 500000

# JPEG qualities tried in order until a result fits the budget. Must be
# strictly descending and within (0, 1]. The last entry is accepted even if
# it is still over budget.
quality_ladder = [0.8, 0.6, 0.4, 0.2]

# ---------------------------------------------------------------------------
# Draft queue
# ---------------------------------------------------------------------------
[drafts]
# Storage key the queue is persisted under (file <data-dir>/<key>.json).
storage_key = "item-store"

# ---------------------------------------------------------------------------
# Sync
# ---------------------------------------------------------------------------
[sync]
# Failed attempts after which automatic sync stops retrying a draft.
# Manual retry always works. Omit for unbounded retries.
# max_retries = 5

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel compression workers. Omit for auto (= CPU cores).
# Values above the core count are clamped down.
# max_processes = 4
"##
}

//! Configuration for the life simulation.
//!
//! Maps directly to `lifesim.toml`. Every field has a default, so an empty
//! file is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Environment variable that overrides `oracle.api_key`.
pub const API_KEY_ENV: &str = "LIFESIM_ORACLE_API_KEY";

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LifeSimConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Oracle (text generation service) settings.
    #[serde(default)]
    pub oracle: OracleConfig,
    /// Turn mechanics.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Long-term memory consolidation.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Checkpoint retention.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    /// Storage backend.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl LifeSimConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `CoreError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        let mut config: Self =
            toml::from_str(toml_str).map_err(|e| crate::CoreError::Config(e.to_string()))?;
        config.oracle.apply_env();
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error. `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit JSON-formatted log lines.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

/// Oracle client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Chat-completions endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Bearer token. Overridden by `LIFESIM_ORACLE_API_KEY` when set.
    #[serde(default)]
    pub api_key: String,
    /// Model name sent with each request.
    #[serde(default = "default_model")]
    pub model: String,
    /// Total attempts per call, including the first.
    #[serde(default = "default_3")]
    pub max_attempts: u32,
    /// Backoff base: attempt `n` waits `base^n` seconds before retrying.
    #[serde(default = "default_2_u64")]
    pub backoff_base_secs: u64,
    /// TCP connect timeout.
    #[serde(default = "default_60")]
    pub connect_timeout_secs: u64,
}

impl OracleConfig {
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.api_key = key;
            }
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: String::new(),
            model: default_model(),
            max_attempts: 3,
            backoff_base_secs: 2,
            connect_timeout_secs: 60,
        }
    }
}

/// Turn mechanics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Calendar year at the profile's start age.
    #[serde(default = "default_base_year")]
    pub base_year: i32,
    /// Choice used when the caller submits none.
    #[serde(default = "default_choice")]
    pub default_choice: String,
    /// Snapshot the profile after every persisted turn.
    #[serde(default = "default_true")]
    pub auto_checkpoint: bool,
    /// Length cap for NPC situation updates, in characters.
    #[serde(default = "default_20_usize")]
    pub npc_situation_max_chars: usize,
    /// Largest span accepted by a single skip. Unbounded when absent.
    #[serde(default)]
    pub max_skip_years: Option<u32>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            base_year: default_base_year(),
            default_choice: default_choice(),
            auto_checkpoint: true,
            npc_situation_max_chars: 20,
            max_skip_years: None,
        }
    }
}

/// Long-term memory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Soft ceiling for the rolling memory, in characters. Sent to the
    /// oracle as a target, not enforced by truncation.
    #[serde(default = "default_500")]
    pub soft_limit_chars: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { soft_limit_chars: 500 }
    }
}

/// How duplicate `(profile, age)` snapshots are handled on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep every snapshot; the newest wins on lookup.
    KeepAll,
    /// Delete older snapshots at the same age when a new one is inserted.
    #[default]
    ReplaceSameAge,
}

/// Checkpoint retention policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Upper bound on snapshots kept per profile. Unbounded when absent.
    #[serde(default)]
    pub max_per_profile: Option<usize>,
    /// Duplicate handling.
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// SQLite file (or `:memory:`).
    #[default]
    Sqlite,
    /// Process-local maps.
    Memory,
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Backend.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Database path for the SQLite backend.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            path: default_db_path(),
            wal_mode: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_api_url() -> String { "https://api.deepseek.com/chat/completions".to_string() }
fn default_model() -> String { "deepseek-chat".to_string() }
fn default_choice() -> String { "平稳度过".to_string() }
fn default_db_path() -> String { "lifesim.db".to_string() }
fn default_base_year() -> i32 { 2024 }
fn default_2_u64() -> u64 { 2 }
fn default_3() -> u32 { 3 }
fn default_20_usize() -> usize { 20 }
fn default_60() -> u64 { 60 }
fn default_500() -> usize { 500 }

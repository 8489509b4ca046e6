//! Installation configuration for the gigchat conversational core.
//!
//! Stored in a machine-readable TOML file located at:
//!   %APPDATA%/GigChat/config.toml on Windows
//!   $XDG_DATA_HOME/GigChat/config.toml on Linux
//!   ~/Library/Application Support/GigChat/config.toml on macOS
//!
//! Every tunable the synchronizer and the participation trigger depend on
//! (poll cadence, scroll tolerance, trigger probabilities, delay bounds)
//! lives here so tests can pin them to deterministic values.

use serde::{Deserialize, Serialize};

/// Root configuration persisted per installation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Message-stream synchronizer knobs (poll cadence, viewport tolerance).
    #[serde(default)]
    pub sync: SyncSettings,
    /// Autonomous group-participation knobs (probabilities, delays, keywords).
    #[serde(default)]
    pub participation: ParticipationSettings,
}

/// Synchronizer-related preferences tied to the local install.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Fixed interval between message-list polls for the open conversation.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Pixel tolerance below which the viewport still counts as at-bottom.
    #[serde(default = "default_scroll_epsilon_px")]
    pub scroll_epsilon_px: f64,
    /// How long a typing indicator stays visible without a refresh.
    #[serde(default = "default_typing_timeout_ms")]
    pub typing_indicator_timeout_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            scroll_epsilon_px: default_scroll_epsilon_px(),
            typing_indicator_timeout_ms: default_typing_timeout_ms(),
        }
    }
}

const fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_scroll_epsilon_px() -> f64 {
    10.0
}

const fn default_typing_timeout_ms() -> u64 {
    3_000
}

/// Group-participation preferences for the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipationSettings {
    /// Handle that counts as an explicit mention (with or without `@`).
    #[serde(default = "default_assistant_handle")]
    pub assistant_handle: String,
    /// Keywords that raise the odds of an unprompted reply.
    #[serde(default = "default_trigger_keywords")]
    pub trigger_keywords: Vec<String>,
    /// Probability of replying when a trigger keyword is present.
    #[serde(default = "default_keyword_probability")]
    pub keyword_probability: f64,
    /// Background probability of replying to any group message.
    #[serde(default = "default_ambient_probability")]
    pub ambient_probability: f64,
    /// Lower bound of the randomized response delay.
    #[serde(default = "default_min_response_delay_ms")]
    pub min_response_delay_ms: u64,
    /// Upper bound of the randomized response delay.
    #[serde(default = "default_max_response_delay_ms")]
    pub max_response_delay_ms: u64,
}

impl Default for ParticipationSettings {
    fn default() -> Self {
        Self {
            assistant_handle: default_assistant_handle(),
            trigger_keywords: default_trigger_keywords(),
            keyword_probability: default_keyword_probability(),
            ambient_probability: default_ambient_probability(),
            min_response_delay_ms: default_min_response_delay_ms(),
            max_response_delay_ms: default_max_response_delay_ms(),
        }
    }
}

fn default_assistant_handle() -> String {
    "assistant".into()
}

fn default_trigger_keywords() -> Vec<String> {
    ["help", "question", "anyone", "advice", "recommend"]
        .iter()
        .map(|keyword| keyword.to_string())
        .collect()
}

fn default_keyword_probability() -> f64 {
    0.8
}

fn default_ambient_probability() -> f64 {
    0.05
}

const fn default_min_response_delay_ms() -> u64 {
    1_200
}

const fn default_max_response_delay_ms() -> u64 {
    4_500
}

/// Standard relative path to the config file (resolved per OS at runtime).
pub const CONFIG_FILE_NAME: &str = "config.toml";

use anyhow::{Context, Result};
use directories::BaseDirs;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Returns the root directory where gigchat stores data.
///
/// Order of precedence:
/// 1. `GIGCHAT_HOME` environment variable.
/// 2. OS-specific data directory via `directories::BaseDirs`.
pub fn workspace_root() -> Result<PathBuf> {
    if let Ok(path) = env::var("GIGCHAT_HOME") {
        return Ok(PathBuf::from(path));
    }
    let base_dirs = BaseDirs::new().context("Unable to determine OS data directory")?;
    Ok(base_dirs.data_dir().join("GigChat"))
}

/// Returns the config directory under the workspace root.
pub fn config_dir() -> Result<PathBuf> {
    let root = workspace_root()?;
    Ok(root.join("config"))
}

/// Path to the config file.
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Loads the configuration from disk or returns defaults.
pub fn load_or_default() -> Result<AppConfig> {
    let path = config_file_path()?;
    if path.exists() {
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let cfg: AppConfig = toml::from_str(&data)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(cfg)
    } else {
        Ok(AppConfig::default())
    }
}

/// Persists the configuration to disk.
pub fn save(config: &AppConfig) -> Result<()> {
    let dir = config_dir()?;
    fs::create_dir_all(&dir)?;
    let path = config_file_path()?;
    let data = toml::to_string_pretty(config)?;
    fs::write(&path, data)?;
    Ok(())
}

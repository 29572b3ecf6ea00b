use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Config directory not found")]
    NoDirFound,
    #[error("No bot token: set telegram.bot_token or BOT_TOKEN")]
    MissingBotToken,
}

/// Telegram transport settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token. Falls back to the `BOT_TOKEN` environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
}

/// Where reminder profiles are persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON data file. Defaults to `~/.remindbot/reminders.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// IANA timezone reminders are evaluated in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "Europe/Rome".to_string()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

/// Plain HTTP endpoint answered for uptime pings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on. The `PORT` environment variable takes precedence.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    10000
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogConfig {
    /// Words that open the menu when a message starts with them (case-insensitive).
    #[serde(default = "default_greetings")]
    pub greetings: Vec<String>,
    /// Unfinished dialogs older than this are discarded. 0 keeps them forever.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_greetings() -> Vec<String> {
    ["ciao", "menu", "hey", "avvia"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_idle_timeout() -> u64 {
    3600
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            greetings: default_greetings(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

/// Retry policy for delivering fired reminders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    2000
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

/// Top-level remindbot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemindBotConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub liveness: LivenessConfig,
    #[serde(default)]
    pub dialog: DialogConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

impl RemindBotConfig {
    /// Resolve the bot token from the config, then from `BOT_TOKEN`.
    pub fn bot_token(&self) -> Result<String, ConfigError> {
        self.telegram
            .bot_token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var("BOT_TOKEN").ok().filter(|t| !t.is_empty()))
            .ok_or(ConfigError::MissingBotToken)
    }

    /// Resolve the data file, defaulting to `~/.remindbot/reminders.json`.
    pub fn data_file(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.data_file {
            Some(path) => Ok(path.clone()),
            None => Ok(config_dir()?.join("reminders.json")),
        }
    }

    /// Liveness port, with `PORT` from the environment taking precedence.
    pub fn liveness_port(&self) -> u16 {
        std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(self.liveness.port)
    }
}

/// Resolve the remindbot config directory (~/.remindbot/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".remindbot"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.remindbot/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load configuration from the default path, falling back to defaults.
pub fn load_config() -> Result<RemindBotConfig, ConfigError> {
    let _ = dotenvy::dotenv();

    let path = config_file_path()?;
    load_config_from(&path)
}

/// Load configuration from a specific path, falling back to defaults if not found.
pub fn load_config_from(path: &Path) -> Result<RemindBotConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(RemindBotConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: RemindBotConfig = json5::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a specific path, creating parent directories.
pub fn save_config_to(config: &RemindBotConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| ConfigError::Io(std::io::Error::other(e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RemindBotConfig::default();
        assert_eq!(config.scheduler.timezone, "Europe/Rome");
        assert_eq!(config.liveness.port, 10000);
        assert!(config.liveness.enabled);
        assert_eq!(config.dialog.greetings, ["ciao", "menu", "hey", "avvia"]);
        assert_eq!(config.delivery.max_attempts, 3);
    }

    #[test]
    fn test_json5_parse() {
        let json5_str = r#"{
            telegram: { bot_token: "123:ABC" },
            storage: { data_file: "/tmp/reminders.json" },
            scheduler: { timezone: "UTC" },
            dialog: { idle_timeout_secs: 0 },
        }"#;
        let config: RemindBotConfig = json5::from_str(json5_str).unwrap();
        assert_eq!(config.bot_token().unwrap(), "123:ABC");
        assert_eq!(
            config.data_file().unwrap(),
            PathBuf::from("/tmp/reminders.json")
        );
        assert_eq!(config.scheduler.timezone, "UTC");
        assert_eq!(config.dialog.idle_timeout_secs, 0);
        // Untouched sections keep their defaults
        assert_eq!(config.dialog.greetings.len(), 4);
        assert_eq!(config.delivery.initial_backoff_ms, 2000);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.json5")).unwrap();
        assert_eq!(config.scheduler.timezone, "Europe/Rome");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json5");
        let mut config = RemindBotConfig::default();
        config.liveness.port = 8080;
        config.dialog.greetings = vec!["hello".into()];
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.liveness.port, 8080);
        assert_eq!(loaded.dialog.greetings, ["hello"]);
    }

    #[test]
    fn test_invalid_json5_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json5");
        std::fs::write(&path, "{ scheduler: ").unwrap();
        assert!(matches!(
            load_config_from(&path),
            Err(ConfigError::Json5(_))
        ));
    }
}

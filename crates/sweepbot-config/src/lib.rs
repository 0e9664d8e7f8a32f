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
}

/// Top-level sweepbot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Telegram bot token. The `SWEEPBOT_BOT_TOKEN` env var (or `.env`
    /// entry) overrides the file value.
    #[serde(default)]
    pub bot_token: String,
    /// SQLite database path (default: `<config dir>/messages.db`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
    /// User allowed to use the bot in private chats and to run admin
    /// commands. 0 means unset.
    #[serde(default)]
    pub admin_user_id: i64,
    /// Group chat IDs the bot may operate in when restriction is on.
    #[serde(default)]
    pub allowed_groups: Vec<i64>,
    /// When true, the bot only works in `allowed_groups` groups.
    #[serde(default = "default_true")]
    pub restrict_to_allowed_groups: bool,
    /// Default deletion delay when `/del` carries no argument.
    #[serde(default = "default_delete_after_hours")]
    pub delete_after_hours: f64,
    /// Ceiling on user-supplied deletion delays.
    #[serde(default = "default_max_delete_hours")]
    pub max_delete_hours: f64,
    /// Explicit sweep interval override; derived from
    /// `delete_after_hours` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep_interval_secs: Option<u64>,
    /// Delay before the first sweep after startup.
    #[serde(default = "default_sweep_initial_delay_secs")]
    pub sweep_initial_delay_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_delete_after_hours() -> f64 {
    24.0
}

fn default_max_delete_hours() -> f64 {
    240.0
}

fn default_sweep_initial_delay_secs() -> u64 {
    10
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            db_path: None,
            admin_user_id: 0,
            allowed_groups: Vec::new(),
            restrict_to_allowed_groups: default_true(),
            delete_after_hours: default_delete_after_hours(),
            max_delete_hours: default_max_delete_hours(),
            sweep_interval_secs: None,
            sweep_initial_delay_secs: default_sweep_initial_delay_secs(),
        }
    }
}

impl BotConfig {
    /// Database path, defaulting to `<config dir>/messages.db`.
    pub fn resolve_db_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => Ok(config_dir()?.join("messages.db")),
        }
    }
}

/// Resolve the sweepbot config directory (~/.sweepbot/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".sweepbot"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.sweepbot/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load configuration from the default path, falling back to defaults.
pub fn load_config() -> Result<BotConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let path = config_file_path()?;
    load_config_from(&path)
}

/// Load configuration from a specific path, falling back to defaults if
/// not found. `SWEEPBOT_BOT_TOKEN` overrides the file's token either way.
pub fn load_config_from(path: &Path) -> Result<BotConfig, ConfigError> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        json5::from_str(&content)?
    } else {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        BotConfig::default()
    };

    if let Ok(token) = std::env::var("SWEEPBOT_BOT_TOKEN")
        && !token.is_empty()
    {
        config.bot_token = token;
    }

    Ok(config)
}

/// Ensure the config directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = config_dir()?;
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Save configuration to the default path.
pub fn save_config(config: &BotConfig) -> Result<(), ConfigError> {
    let dir = ensure_config_dir()?;
    save_config_to(&dir.join("config.json5"), config)
}

/// Save configuration to a specific path.
pub fn save_config_to(path: &Path, config: &BotConfig) -> Result<(), ConfigError> {
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
        let config = BotConfig::default();
        assert_eq!(config.delete_after_hours, 24.0);
        assert_eq!(config.max_delete_hours, 240.0);
        assert!(config.restrict_to_allowed_groups);
        assert!(config.allowed_groups.is_empty());
        assert_eq!(config.sweep_initial_delay_secs, 10);
        assert!(config.sweep_interval_secs.is_none());
    }

    #[test]
    fn test_json5_parse() {
        let json5_str = r#"{
            bot_token: "123:ABC",
            admin_user_id: 42,
            allowed_groups: [-100200300, -100200301],
            delete_after_hours: 1.0,
        }"#;
        let config: BotConfig = json5::from_str(json5_str).unwrap();
        assert_eq!(config.bot_token, "123:ABC");
        assert_eq!(config.admin_user_id, 42);
        assert_eq!(config.allowed_groups, vec![-100200300, -100200301]);
        assert_eq!(config.delete_after_hours, 1.0);
        // Untouched fields keep their defaults.
        assert_eq!(config.max_delete_hours, 240.0);
        assert!(config.restrict_to_allowed_groups);
    }

    #[test]
    fn test_json5_parse_sweep_overrides() {
        let json5_str = r#"{
            sweep_interval_secs: 5,
            sweep_initial_delay_secs: 1,
            restrict_to_allowed_groups: false,
        }"#;
        let config: BotConfig = json5::from_str(json5_str).unwrap();
        assert_eq!(config.sweep_interval_secs, Some(5));
        assert_eq!(config.sweep_initial_delay_secs, 1);
        assert!(!config.restrict_to_allowed_groups);
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "sweepbot-config-test-{}.json5",
            std::process::id()
        ));
        let config = BotConfig {
            bot_token: "123:ABC".into(),
            admin_user_id: 42,
            allowed_groups: vec![-100200300],
            ..BotConfig::default()
        };

        save_config_to(&path, &config).unwrap();
        let loaded = load_config_from(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.bot_token, "123:ABC");
        assert_eq!(loaded.admin_user_id, 42);
        assert_eq!(loaded.allowed_groups, vec![-100200300]);
        assert_eq!(loaded.delete_after_hours, 24.0);
    }
}

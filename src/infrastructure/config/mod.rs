//! Configuration management
//!
//! A YAML file provides the base values; the environment overrides them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::application::errors::ConfigError;

pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const BOT_TOKEN_ENV: &str = "BOT_TOKEN";
pub const BOT_PREFIX_ENV: &str = "BOT_PREFIX";
pub const BOT_ADMINS_ENV: &str = "TELEGRAM_BOT_ADMINS";
pub const DISABLED_PLUGINS_ENV: &str = "REVENTLOV_DISABLED_PLUGINS";
pub const TRELLO_API_KEY_ENV: &str = "TRELLO_API_KEY";
pub const TRELLO_API_TOKEN_ENV: &str = "TRELLO_API_TOKEN";
pub const TRELLO_ADMINS_ENV: &str = "TRELLO_ADMINS";
pub const TRELLO_DEFAULT_ORG_ENV: &str = "TRELLO_DEFAULT_ORGANIZATION";

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub plugins: PluginsConfig,
    pub adapters: AdaptersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    pub prefix: String,
    /// Usernames allowed to enable and disable plugins. Empty allows everyone.
    pub admins: Vec<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "reventlov".to_string(),
            prefix: "/".to_string(),
            admins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PluginsConfig {
    /// Comma-separated plugin names to keep disabled at startup
    pub disabled: Option<String>,
    pub trello: TrelloConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TrelloConfig {
    pub api_key: Option<String>,
    pub api_token: Option<String>,
    pub admins: Vec<String>,
    pub default_organization: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AdaptersConfig {
    pub telegram: Option<TelegramConfig>,
    pub console: Option<ConsoleConfig>,
}

impl Default for AdaptersConfig {
    fn default() -> Self {
        Self {
            telegram: Some(TelegramConfig {
                enabled: false,
                token: None,
                poll_timeout: default_poll_timeout(),
            }),
            console: Some(ConsoleConfig {
                enabled: true,
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TelegramConfig {
    pub enabled: bool,
    pub token: Option<String>,
    /// Long-poll timeout in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout: i64,
}

fn default_poll_timeout() -> i64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConsoleConfig {
    pub enabled: bool,
}

/// Split a comma-separated list, trimming items and dropping empty ones
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::InvalidValue(format!("Failed to serialize config: {}", e)))
    }

    pub fn load_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`, which maps a variable name to its value
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(TELEGRAM_TOKEN_ENV).or_else(|| lookup(BOT_TOKEN_ENV)) {
            let tg = self.adapters.telegram.get_or_insert_with(|| TelegramConfig {
                enabled: true,
                token: None,
                poll_timeout: default_poll_timeout(),
            });
            tg.token = Some(token);
            tg.enabled = true;
        }

        if let Some(prefix) = lookup(BOT_PREFIX_ENV) {
            self.bot.prefix = prefix;
        }

        if let Some(admins) = lookup(BOT_ADMINS_ENV) {
            self.bot.admins = split_list(&admins);
        }

        if let Some(disabled) = lookup(DISABLED_PLUGINS_ENV) {
            self.plugins.disabled = Some(disabled);
        }

        let trello = &mut self.plugins.trello;
        if let Some(key) = lookup(TRELLO_API_KEY_ENV) {
            trello.api_key = Some(key);
        }
        if let Some(token) = lookup(TRELLO_API_TOKEN_ENV) {
            trello.api_token = Some(token);
        }
        if let Some(admins) = lookup(TRELLO_ADMINS_ENV) {
            trello.admins = split_list(&admins);
        }
        if let Some(org) = lookup(TRELLO_DEFAULT_ORG_ENV) {
            trello.default_organization = Some(org);
        }
    }

    /// Telegram token, if the adapter is enabled and has one
    pub fn telegram_token(&self) -> Option<&str> {
        self.adapters.telegram.as_ref()
            .filter(|tg| tg.enabled)
            .and_then(|tg| tg.token.as_deref())
            .filter(|t| !t.is_empty())
    }

    /// Whether `username` may toggle plugins
    pub fn is_bot_admin(&self, username: Option<&str>) -> bool {
        if self.bot.admins.is_empty() {
            return true;
        }
        username
            .map(|u| self.bot.admins.iter().any(|a| a == u))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(split_list("trello, pomodoro,,"), vec!["trello", "pomodoro"]);
        assert!(split_list("").is_empty());
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let config = Config::from_yaml("bot:\n  name: marvin\nplugins:\n  disabled: trello\n").unwrap();
        assert_eq!(config.bot.name, "marvin");
        assert_eq!(config.bot.prefix, "/");
        assert_eq!(config.plugins.disabled.as_deref(), Some("trello"));
        assert!(config.telegram_token().is_none());
    }

    #[test]
    fn yaml_round_trips_through_init_config() {
        let yaml = Config::default().to_yaml().unwrap();
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.bot.name, "reventlov");
        assert!(config.adapters.console.map(|c| c.enabled).unwrap_or(false));
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            (TELEGRAM_TOKEN_ENV, "123:abc"),
            (BOT_ADMINS_ENV, "alice,bob"),
            (DISABLED_PLUGINS_ENV, "trello"),
            (TRELLO_API_KEY_ENV, "key"),
            (TRELLO_API_TOKEN_ENV, "token"),
            (TRELLO_ADMINS_ENV, "alice"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_with(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.telegram_token(), Some("123:abc"));
        assert_eq!(config.bot.admins, vec!["alice", "bob"]);
        assert_eq!(config.plugins.disabled.as_deref(), Some("trello"));
        assert_eq!(config.plugins.trello.api_key.as_deref(), Some("key"));
        assert_eq!(config.plugins.trello.admins, vec!["alice"]);
        assert!(config.plugins.trello.default_organization.is_none());
    }

    #[test]
    fn empty_admin_list_allows_everyone() {
        let mut config = Config::default();
        assert!(config.is_bot_admin(None));

        config.bot.admins = vec!["alice".into()];
        assert!(config.is_bot_admin(Some("alice")));
        assert!(!config.is_bot_admin(Some("mallory")));
        assert!(!config.is_bot_admin(None));
    }
}

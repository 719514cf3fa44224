use std::{env::var, fs, io::ErrorKind, path::Path, time::Duration};

use tracing::warn;

use crate::bot::{commands::commands::BotResult, state::def::{default_cooldown_sweep, default_max_message_len, default_min_spacing, default_packages, default_prefix, BotConfig, BotError, BotSecrets, CommandOverrides, ShutdownPolicy}};

pub const CONFIG_PATH_VAR: &str = "BOT_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Lowest outbound spacing accepted from config. Unprivileged accounts get
/// 20 messages per 30s, so anything faster risks a global chat ban.
pub const MIN_SPACING_FLOOR: Duration = Duration::from_millis(1000);

impl BotSecrets {
    /// Reads the bot credentials from the environment. Call `dotenvy::dotenv()`
    /// first if a `.env` file should be honoured.
    pub fn from_env() -> BotResult<Self> {
        let nickname = var("TWITCH_BOT_NICK").map_err(|_| BotError::MissingSecret("TWITCH_BOT_NICK"))?;
        let oauth_token_bot = var("TWITCH_OAUTH_TOKEN_BOT").map_err(|_| BotError::MissingSecret("TWITCH_OAUTH_TOKEN_BOT"))?;

        Ok(Self {
            nickname: nickname.to_lowercase(),
            oauth_token_bot: oauth_token_bot.trim_start_matches("oauth:").to_string(),
        })
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            channels: Vec::new(),
            prefix: default_prefix(),
            case_sensitive: false,
            min_spacing: default_min_spacing(),
            max_message_len: default_max_message_len(),
            packages: default_packages(),
            commands: CommandOverrides::default(),
            rate_window: None,
            cooldown_sweep: default_cooldown_sweep(),
            shutdown: ShutdownPolicy::Drain,
        }
    }
}

impl BotConfig {
    pub fn config_path() -> String {
        var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    pub fn from_json(raw: &str) -> BotResult<Self> {
        let config: BotConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates the config file. A missing file means "run with
    /// defaults"; a file that exists and fails to parse is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> BotResult<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(raw) => Self::from_json(&raw),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn validate(&self) -> BotResult<()> {
        if self.prefix.trim().is_empty() {
            return Err(BotError::InvalidConfig("prefix must not be empty".into()));
        }
        if self.min_spacing < MIN_SPACING_FLOOR {
            return Err(BotError::InvalidConfig(format!(
                "min_spacing must be at least {}ms, got {}ms",
                MIN_SPACING_FLOOR.as_millis(),
                self.min_spacing.as_millis()
            )));
        }
        if self.cooldown_sweep.is_zero() {
            return Err(BotError::InvalidConfig("cooldown_sweep must be positive".into()));
        }
        if self.max_message_len == 0 {
            return Err(BotError::InvalidConfig("max_message_len must be positive".into()));
        }
        if let Some(window) = &self.rate_window {
            if window.limit == 0 || window.window.is_zero() {
                return Err(BotError::InvalidConfig("rate_window needs a positive limit and window".into()));
            }
        }
        Ok(())
    }

    pub fn cooldown_override(&self, command: &str) -> Option<Duration> {
        self.commands.cooldowns.get(command).map(|ms| Duration::from_millis(*ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = BotConfig::from_json("{}").unwrap();
        assert_eq!(config.prefix, "!");
        assert!(!config.case_sensitive);
        assert_eq!(config.min_spacing, Duration::from_millis(1200));
        assert_eq!(config.max_message_len, 500);
        assert_eq!(config.packages, vec!["general", "fun", "moderation"]);
        assert_eq!(config.shutdown, ShutdownPolicy::Drain);
        assert!(config.rate_window.is_none());
    }

    #[test]
    fn durations_are_read_as_milliseconds() {
        let config = BotConfig::from_json(
            r##"{
                "prefix": "#",
                "min_spacing": 1500,
                "rate_window": { "limit": 5, "window_ms": 10000 },
                "commands": { "cooldowns": { "rate": 3000 }, "disabled_commands": ["say"] },
                "shutdown": "discard"
            }"##,
        )
        .unwrap();

        assert_eq!(config.prefix, "#");
        assert_eq!(config.min_spacing, Duration::from_millis(1500));
        assert_eq!(config.rate_window.unwrap().window, Duration::from_secs(10));
        assert_eq!(config.cooldown_override("rate"), Some(Duration::from_secs(3)));
        assert!(config.commands.disabled_commands.contains("say"));
        assert_eq!(config.shutdown, ShutdownPolicy::Discard);
    }

    #[test]
    fn spacing_below_floor_is_rejected() {
        let err = BotConfig::from_json(r#"{ "min_spacing": 200 }"#).unwrap_err();
        assert!(matches!(err, BotError::InvalidConfig(_)));
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let err = BotConfig::from_json(r#"{ "cooldown_sweep": 0 }"#).unwrap_err();
        assert!(matches!(err, BotError::InvalidConfig(msg) if msg.contains("cooldown_sweep")));
    }

    #[test]
    fn empty_prefix_is_rejected() {
        let err = BotConfig::from_json(r#"{ "prefix": "  " }"#).unwrap_err();
        assert!(matches!(err, BotError::InvalidConfig(_)));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = BotConfig::load_or_default("/definitely/not/here/config.json").unwrap();
        assert_eq!(config.prefix, "!");
    }
}

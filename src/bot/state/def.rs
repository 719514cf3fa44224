use std::{collections::{HashMap, HashSet}, io, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use twitch_irc::{login::StaticLoginCredentials, validate, SecureTCPTransport};

use crate::bot::permissions::permissions::PermissionLevel;

pub struct BotSecrets {
    pub nickname: String,
    pub oauth_token_bot: String,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct BotConfig {
    // Channels joined on startup
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default = "default_min_spacing", with = "serde_millis")]
    pub min_spacing: Duration,
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
    // Which command groups are registered
    #[serde(default = "default_packages")]
    pub packages: Vec<String>,
    #[serde(default)]
    pub commands: CommandOverrides,
    #[serde(default)]
    pub rate_window: Option<RateWindowConfig>,
    #[serde(default = "default_cooldown_sweep", with = "serde_millis")]
    pub cooldown_sweep: Duration,
    #[serde(default)]
    pub shutdown: ShutdownPolicy,
}

pub(crate) fn default_prefix() -> String {
    "!".into()
}

pub(crate) fn default_min_spacing() -> Duration {
    Duration::from_millis(1200)
}

pub(crate) fn default_max_message_len() -> usize {
    500
}

pub(crate) fn default_packages() -> Vec<String> {
    vec!["general".to_string(), "fun".to_string(), "moderation".to_string()]
}

pub(crate) fn default_cooldown_sweep() -> Duration {
    Duration::from_secs(60)
}

/// Startup-only adjustments to the built-in command table.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct CommandOverrides {
    /// Cooldown per command name, in milliseconds.
    #[serde(default)]
    pub cooldowns: HashMap<String, u64>,
    #[serde(default)]
    pub disabled_commands: HashSet<String>,
    #[serde(default)]
    pub removed_aliases: HashSet<String>,
    /// Extra alias -> command name.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateWindowConfig {
    pub limit: u32,
    #[serde(rename = "window_ms", with = "serde_millis")]
    pub window: Duration,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownPolicy {
    #[default]
    Drain,
    Discard,
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error("Command or alias already registered: {0}")]
    DuplicateCommand(String),
    #[error("Alias points at unknown command: {0}")]
    UnknownCommand(String),
    #[error("Permission denied, requires {0}")]
    PermissionDenied(PermissionLevel),
    #[error("Cooldown active for another {}ms", .0.as_millis())]
    CooldownActive(Duration),
    #[error("Rate limited for another {}ms", .0.as_millis())]
    RateLimited(Duration),
    #[error("Command is disabled: {0}")]
    CommandDisabled(String),
    #[error("Handler failure: {0}")]
    HandlerFailure(String),
    #[error("Delivery failure: {0}")]
    DeliveryFailure(String),
    #[error("Outbound queue is closed")]
    QueueClosed,
    #[error("Missing secret: {0}")]
    MissingSecret(&'static str),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON deserialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("TwitchIRC Error: {0}")]
    TwitchIrc(#[from] twitch_irc::Error<SecureTCPTransport, StaticLoginCredentials>),
    #[error("Validate Error: {0}")]
    Validate(#[from] validate::Error),
    #[error("{0}")]
    Custom(String),
}

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bot::{chat_event::badges::BadgeSet, permissions::permissions::PermissionLevel};

/// Lowercase channel login without the IRC `#`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(channel: impl AsRef<str>) -> Self {
        ChannelId(channel.as_ref().trim().trim_start_matches('#').to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for ChannelId {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = ChannelId::new(s);
        if id.0.is_empty() {
            return Err("channel must not be empty");
        }
        if id.0.contains(char::is_whitespace) {
            return Err("channel must not contain whitespace");
        }
        Ok(id)
    }
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub channel: ChannelId,
    pub user: ChatUser,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ChatUser {
    pub identity: UserIdentity,
    pub name: DisplayName,
    pub badges: BadgeSet,
    pub permission: PermissionLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserIdentity {
    pub platform_user_id: String,
}

#[derive(Debug, Clone)]
pub struct DisplayName {
    pub login: String,        // lowercase (twitch login)
    pub display: String,      // FancyName
}

impl ChatUser {
    /// Builds a user whose permission level is derived from `badges`.
    pub fn new(user_id: impl Into<String>, login: impl Into<String>, display: impl Into<String>, badges: BadgeSet) -> Self {
        let permission = PermissionLevel::from_badges(&badges);
        ChatUser {
            identity: UserIdentity { platform_user_id: user_id.into() },
            name: DisplayName { login: login.into().to_lowercase(), display: display.into() },
            badges,
            permission,
        }
    }

    pub fn id(&self) -> &str {
        &self.identity.platform_user_id
    }

    pub fn display(&self) -> &str {
        &self.name.display
    }
}

impl ChatMessage {
    pub fn new(channel: ChannelId, user: ChatUser, text: impl Into<String>) -> Self {
        ChatMessage { channel, user, text: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_ids_are_normalized() {
        assert_eq!(ChannelId::new("#KrapMatt"), ChannelId::new("krapmatt"));
        assert_eq!(ChannelId::new("#x").to_string(), "#x");
        assert_eq!(ChannelId::new("#x").as_str(), "x");
    }

    #[test]
    fn channel_id_parse_rejects_garbage() {
        assert!("#".parse::<ChannelId>().is_err());
        assert!("two words".parse::<ChannelId>().is_err());
        assert_eq!("#Some_Channel".parse::<ChannelId>().unwrap().as_str(), "some_channel");
    }
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::info;

use crate::bot::{chat_event::{badges::BadgeSet, chat_event::{ChannelId, ChatMessage}}, handler::handler::ChatEventHandler};

#[derive(Debug, Clone)]
pub struct ChannelPrivilegeState {
    pub channel: ChannelId,
    pub can_bypass: bool,
    pub last_updated: DateTime<Utc>,
}

/// Tracks, per channel, whether the bot's own account holds a role that lifts the
/// unprivileged outbound rate cap.
///
/// The value is only as fresh as the last badge set we saw for ourselves. If the
/// bot gets demoted and no new badge data arrives, we keep believing we may
/// bypass until the next `USERSTATE`.
#[derive(Clone)]
pub struct PrivilegeTracker {
    bot_login: Arc<str>,
    channels: Arc<DashMap<ChannelId, ChannelPrivilegeState>>,
}

impl PrivilegeTracker {
    pub fn new(bot_login: impl AsRef<str>) -> Self {
        PrivilegeTracker {
            bot_login: Arc::from(bot_login.as_ref().to_lowercase()),
            channels: Arc::new(DashMap::new()),
        }
    }

    pub fn update(&self, channel: &ChannelId, badges: &BadgeSet) {
        let can_bypass = badges.grants_bypass();
        let previous = self.channels.insert(
            channel.clone(),
            ChannelPrivilegeState { channel: channel.clone(), can_bypass, last_updated: Utc::now() },
        );

        if previous.map(|p| p.can_bypass) != Some(can_bypass) {
            info!("Outbound bypass in {} is now {}", channel, can_bypass);
        }
    }

    /// Unknown channels never bypass.
    pub fn can_bypass(&self, channel: &ChannelId) -> bool {
        self.channels.get(channel).map(|s| s.can_bypass).unwrap_or(false)
    }

    pub fn state(&self, channel: &ChannelId) -> Option<ChannelPrivilegeState> {
        self.channels.get(channel).map(|s| s.clone())
    }

    /// Creates the default (non-bypassing) record the first time a channel is seen.
    pub fn observe(&self, channel: &ChannelId) {
        self.channels.entry(channel.clone()).or_insert_with(|| ChannelPrivilegeState {
            channel: channel.clone(),
            can_bypass: false,
            last_updated: Utc::now(),
        });
    }

    pub fn forget(&self, channel: &ChannelId) {
        self.channels.remove(channel);
    }

    pub fn bot_login(&self) -> &str {
        &self.bot_login
    }
}

impl ChatEventHandler for PrivilegeTracker {
    fn on_message(&self, message: &ChatMessage) {
        if message.user.name.login == *self.bot_login {
            self.update(&message.channel, &message.user.badges);
        } else {
            self.observe(&message.channel);
        }
    }

    fn on_user_state(&self, channel: &ChannelId, badges: &BadgeSet) {
        self.update(channel, badges);
    }

    fn on_part(&self, channel: &ChannelId) {
        self.forget(channel);
    }
}

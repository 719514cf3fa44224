use dashmap::DashSet;
use tracing::{error, info};

use crate::bot::{chat_event::chat_event::ChannelId, commands::commands::BotResult, handler::handler::{ChatClient, ChatEventHandler}, state::def::BotConfig};

/// Channels the bot is currently sitting in, as confirmed by the transport.
#[derive(Default)]
pub struct ActiveChannels {
    channels: DashSet<ChannelId>,
}

impl ActiveChannels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, channel: &ChannelId) -> bool {
        self.channels.contains(channel)
    }

    pub fn list(&self) -> Vec<ChannelId> {
        let mut list: Vec<ChannelId> = self.channels.iter().map(|c| c.clone()).collect();
        list.sort();
        list
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl ChatEventHandler for ActiveChannels {
    fn on_join(&self, channel: &ChannelId) {
        if self.channels.insert(channel.clone()) {
            info!("Joined {}", channel);
        }
    }

    fn on_part(&self, channel: &ChannelId) {
        if self.channels.remove(channel).is_some() {
            info!("Left {}", channel);
        }
    }
}

/// Asks the transport to join every configured channel. A channel that fails
/// validation is logged and skipped so one typo does not keep the bot offline.
pub fn start_channels_from_config(client: &dyn ChatClient, config: &BotConfig) -> BotResult<usize> {
    let mut requested = 0;
    for raw in &config.channels {
        let channel: ChannelId = match raw.parse() {
            Ok(channel) => channel,
            Err(e) => {
                error!("Skipping configured channel '{}': {}", raw, e);
                continue;
            }
        };

        if let Err(e) = client.join_channel(&channel) {
            error!("Failed to join {}: {}", channel, e);
            continue;
        }
        requested += 1;
    }
    Ok(requested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::test_support::RecordingClient;

    #[test]
    fn join_and_part_maintain_the_set() {
        let channels = ActiveChannels::new();
        channels.on_join(&ChannelId::new("#b"));
        channels.on_join(&ChannelId::new("#a"));
        channels.on_join(&ChannelId::new("#a"));
        assert_eq!(channels.list(), vec![ChannelId::new("a"), ChannelId::new("b")]);

        channels.on_part(&ChannelId::new("a"));
        assert!(!channels.contains(&ChannelId::new("a")));
        assert_eq!(channels.len(), 1);
    }

    #[test]
    fn invalid_configured_channels_are_skipped() {
        let mut config = BotConfig::default();
        config.channels = vec!["#good".into(), "#".into(), "bad name".into()];

        let requested = start_channels_from_config(&RecordingClient::default(), &config).unwrap();
        assert_eq!(requested, 1);
    }
}

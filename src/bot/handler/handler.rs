use std::sync::Arc;

use futures::future::BoxFuture;

use crate::bot::{chat_event::{badges::BadgeSet, chat_event::{ChannelId, ChatMessage}}, commands::commands::BotResult};

/// Outbound side of a chat transport.
pub trait ChatClient: Send + Sync {
    fn send_message<'a>(&'a self, channel: &'a ChannelId, message: &'a str) -> BoxFuture<'a, BotResult<()>>;
    fn join_channel(&self, channel: &ChannelId) -> BotResult<()>;
    fn leave_channel(&self, channel: &ChannelId) -> BotResult<()>;
}

/// Inbound side of a chat transport, one method per event kind. Implementors
/// override only what they care about; every call must return without awaiting.
pub trait ChatEventHandler: Send + Sync {
    fn on_message(&self, _message: &ChatMessage) {}
    /// Badges the platform reports for the bot's own account in `channel`.
    fn on_user_state(&self, _channel: &ChannelId, _badges: &BadgeSet) {}
    fn on_join(&self, _channel: &ChannelId) {}
    fn on_part(&self, _channel: &ChannelId) {}
}

#[derive(Debug, Clone)]
pub enum ChatEvent {
    Message(ChatMessage),
    UserState { channel: ChannelId, badges: BadgeSet },
    Join(ChannelId),
    Part(ChannelId),
}

/// Explicit subscriber list the transport loop publishes into.
#[derive(Clone, Default)]
pub struct EventSubscribers {
    handlers: Vec<Arc<dyn ChatEventHandler>>,
}

impl EventSubscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: Arc<dyn ChatEventHandler>) {
        self.handlers.push(handler);
    }

    /// Delivers `event` to every subscriber in subscription order.
    pub fn publish(&self, event: &ChatEvent) {
        for handler in &self.handlers {
            match event {
                ChatEvent::Message(message) => handler.on_message(message),
                ChatEvent::UserState { channel, badges } => handler.on_user_state(channel, badges),
                ChatEvent::Join(channel) => handler.on_join(channel),
                ChatEvent::Part(channel) => handler.on_part(channel),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

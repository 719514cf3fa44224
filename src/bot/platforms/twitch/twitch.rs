use std::sync::RwLock;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use twitch_irc::message::{Badge as IrcBadge, PrivmsgMessage, ServerMessage};
use twitch_irc::{SecureTCPTransport, login::StaticLoginCredentials};
use twitch_irc::{ClientConfig, TwitchIRCClient};

use crate::bot::{chat_event::{badges::BadgeSet, chat_event::{ChannelId, ChatMessage, ChatUser}}, commands::commands::BotResult, handler::handler::ChatClient, state::def::{BotError, BotSecrets}};

pub type TwitchClient = TwitchIRCClient<SecureTCPTransport, StaticLoginCredentials>;

pub fn map_badges(badges: &[IrcBadge]) -> BadgeSet {
    BadgeSet::from_names(badges.iter().map(|b| b.name.as_str()))
}

pub fn map_privmsg(msg: &PrivmsgMessage) -> ChatMessage {
    let user = ChatUser::new(msg.sender.id.clone(), msg.sender.login.clone(), msg.sender.name.clone(), map_badges(&msg.badges));
    ChatMessage::new(ChannelId::new(&msg.channel_login), user, msg.message_text.clone())
}

/// Messages relayed from another room during a shared chat session carry a
/// `source-room-id` that differs from `room-id`; those belong to the other channel.
pub fn is_forwarded(msg: &PrivmsgMessage) -> bool {
    let tags = &msg.source.tags.0;
    match (tags.get("room-id"), tags.get("source-room-id")) {
        (Some(rid), Some(srid)) => rid != srid,
        _ => false,
    }
}

pub fn build_twitch_client(nick: String, oauth: String) -> (mpsc::UnboundedReceiver<ServerMessage>, TwitchClient) {
    let creds = StaticLoginCredentials::new(nick, Some(oauth));
    let config = ClientConfig::new_simple(creds);
    TwitchIRCClient::<SecureTCPTransport, _>::new(config)
}

/// `ChatClient` over twitch-irc. The inner client is swapped on reconnect, so
/// callers holding this keep working across sessions.
pub struct TwitchChatClient {
    nickname: String,
    oauth: String,
    client: RwLock<Option<TwitchClient>>,
}

impl TwitchChatClient {
    pub fn new(secrets: &BotSecrets) -> Self {
        TwitchChatClient {
            nickname: secrets.nickname.clone(),
            oauth: secrets.oauth_token_bot.clone(),
            client: RwLock::new(None),
        }
    }

    /// Builds a fresh IRC client, replacing the previous one, opens its
    /// connection and returns its incoming message stream.
    pub async fn connect(&self) -> BotResult<mpsc::UnboundedReceiver<ServerMessage>> {
        let (incoming, client) = build_twitch_client(self.nickname.clone(), self.oauth.clone());
        {
            let mut slot = self.client.write().map_err(|_| BotError::Custom("twitch client lock poisoned".into()))?;
            *slot = Some(client.clone());
        }
        client.connect().await;
        Ok(incoming)
    }

    /// Drops the current client. Once no send holds a clone, twitch-irc closes the connection.
    pub fn disconnect(&self) {
        if let Ok(mut slot) = self.client.write() {
            *slot = None;
        }
    }

    fn current(&self) -> BotResult<TwitchClient> {
        let slot = self.client.read().map_err(|_| BotError::Custom("twitch client lock poisoned".into()))?;
        slot.clone().ok_or_else(|| BotError::DeliveryFailure("not connected to twitch".into()))
    }
}

impl ChatClient for TwitchChatClient {
    fn send_message<'a>(&'a self, channel: &'a ChannelId, message: &'a str) -> BoxFuture<'a, BotResult<()>> {
        Box::pin(async move {
            let client = self.current()?;
            client.say(channel.as_str().to_owned(), message.to_owned()).await?;
            Ok(())
        })
    }

    fn join_channel(&self, channel: &ChannelId) -> BotResult<()> {
        self.current()?.join(channel.as_str().to_owned())?;
        Ok(())
    }

    fn leave_channel(&self, channel: &ChannelId) -> BotResult<()> {
        self.current()?.part(channel.as_str().to_owned());
        Ok(())
    }
}

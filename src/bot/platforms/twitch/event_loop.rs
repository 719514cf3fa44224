use std::{sync::Arc, time::Duration};

use rand::Rng;
use tokio::{sync::mpsc::UnboundedReceiver, time::{sleep, timeout}};
use tracing::{debug, error, info, warn};
use twitch_irc::message::ServerMessage;

use crate::bot::{
    chat_event::chat_event::ChannelId,
    commands::commands::BotResult,
    handler::handler::{ChatEvent, EventSubscribers},
    platforms::twitch::{connection::{Connection, ConnectionState, ReconnectPolicy}, twitch::{is_forwarded, map_badges, map_privmsg, TwitchChatClient}},
    runtime::channel_lifecycle::{start_channels_from_config, ActiveChannels},
    state::def::{BotConfig, BotError, BotSecrets},
};

/// Longest silence tolerated on the incoming stream. twitch-irc pings the
/// server every 30s and forwards the PONGs, so a healthy session is never this quiet.
pub const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Server sent RECONNECT ahead of a restart.
    ServerReconnect,
    /// Nothing arrived within the keepalive window.
    Silent,
    StreamClosed,
    AuthFailed,
}

/// Translates one raw IRC message into the events subscribers understand.
/// Join/part of other users is ignored; only the bot's own membership matters.
pub fn to_chat_events(msg: &ServerMessage, bot_login: &str) -> Vec<ChatEvent> {
    match msg {
        ServerMessage::Privmsg(privmsg) => {
            if is_forwarded(privmsg) {
                debug!("Ignoring shared-chat message in #{}", privmsg.channel_login);
                return Vec::new();
            }
            vec![ChatEvent::Message(map_privmsg(privmsg))]
        }
        ServerMessage::UserState(state) => vec![ChatEvent::UserState {
            channel: ChannelId::new(&state.channel_login),
            badges: map_badges(&state.badges),
        }],
        ServerMessage::Join(join) if join.user_login.eq_ignore_ascii_case(bot_login) => {
            vec![ChatEvent::Join(ChannelId::new(&join.channel_login))]
        }
        ServerMessage::Part(part) if part.user_login.eq_ignore_ascii_case(bot_login) => {
            vec![ChatEvent::Part(ChannelId::new(&part.channel_login))]
        }
        _ => Vec::new(),
    }
}

fn is_auth_failure(msg: &ServerMessage) -> bool {
    matches!(msg, ServerMessage::Notice(notice) if notice.message_text.contains("Login authentication failed"))
}

async fn pump(incoming: &mut UnboundedReceiver<ServerMessage>, bot_login: &str, keepalive: Duration, conn: &mut Connection, subscribers: &EventSubscribers) -> SessionEnd {
    loop {
        let msg = match timeout(keepalive, incoming.recv()).await {
            Ok(Some(msg)) => msg,
            Ok(None) => return SessionEnd::StreamClosed,
            Err(_) => return SessionEnd::Silent,
        };

        if is_auth_failure(&msg) {
            return SessionEnd::AuthFailed;
        }
        match &msg {
            ServerMessage::Reconnect(_) => return SessionEnd::ServerReconnect,
            ServerMessage::GlobalUserState(_) => {
                if conn.state() != ConnectionState::Connected {
                    info!("Logged in to Twitch as {}", bot_login);
                }
                conn.on_connected();
            }
            _ => {
                for event in to_chat_events(&msg, bot_login) {
                    subscribers.publish(&event);
                }
            }
        }
    }
}

/// Decides what follows a finished session: how long to wait before the next
/// one, or the error that ends the bot.
pub fn after_session<R: Rng + ?Sized>(end: SessionEnd, conn: &mut Connection, rng: &mut R) -> BotResult<Duration> {
    if end == SessionEnd::AuthFailed {
        error!("Twitch rejected the bot's credentials");
        return Err(BotError::Custom("twitch login authentication failed".into()));
    }

    match conn.on_disconnect(rng) {
        ConnectionState::Reconnecting { attempt, delay } => {
            warn!("Twitch session ended ({:?}), reconnect attempt {} in {:?}", end, attempt, delay);
            Ok(delay)
        }
        ConnectionState::Disconnected | ConnectionState::Connected => {
            error!("Giving up on Twitch after {} attempts", conn.policy().max_attempts);
            Err(BotError::Custom("twitch reconnect attempts exhausted".into()))
        }
    }
}

/// Connects, joins configured channels and feeds events to `subscribers`,
/// reconnecting with backoff until the attempt budget is exhausted or login is rejected.
pub async fn run_twitch_session(client: Arc<TwitchChatClient>, secrets: &BotSecrets, config: &BotConfig, channels: Arc<ActiveChannels>, subscribers: EventSubscribers) -> BotResult<()> {
    let mut conn = Connection::new(ReconnectPolicy::default());

    loop {
        let mut incoming = client.connect().await?;
        let requested = start_channels_from_config(client.as_ref(), config)?;
        info!("Requested {} Twitch channel joins", requested);

        let end = pump(&mut incoming, &secrets.nickname, KEEPALIVE_TIMEOUT, &mut conn, &subscribers).await;
        // Dropping the last handle closes the old connection
        client.disconnect();
        drop(incoming);

        // Membership and privileges are re-learned from the next session's JOIN/USERSTATE
        for channel in channels.list() {
            subscribers.publish(&ChatEvent::Part(channel));
        }

        let delay = after_session(end, &mut conn, &mut rand::rng())?;
        sleep(delay).await;
    }
}

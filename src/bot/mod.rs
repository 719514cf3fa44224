use std::sync::Arc;

use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::bot::{commands::{command_groups, commands::BotResult, registry::CommandRegistry}, cooldown::{cooldown::CooldownTracker, rate_window::RateWindow}, dispatcher::dispatcher::Dispatcher, handler::handler::EventSubscribers, outbound::throttle::OutboundThrottle, platforms::twitch::{event_loop::run_twitch_session, twitch::TwitchChatClient}, privileges::privileges::PrivilegeTracker, runtime::channel_lifecycle::ActiveChannels, state::def::{BotConfig, BotSecrets}};

pub mod state;
pub mod chat_event;
pub mod dispatcher;
pub mod commands;
pub mod cooldown;
pub mod privileges;
pub mod outbound;
pub mod platforms;
pub mod permissions;
pub mod handler;
pub mod runtime;
pub mod replies;

/// Wires the core together and runs until Ctrl-C or until the transport gives up.
pub async fn run_chat_bot(config: BotConfig, secrets: BotSecrets) -> BotResult<()> {
    let registry = Arc::new(CommandRegistry::from_groups(command_groups(), &config)?);
    info!("Registered {} commands from packages {:?}", registry.len(), config.packages);

    let client = Arc::new(TwitchChatClient::new(&secrets));
    let privileges = PrivilegeTracker::new(&secrets.nickname);
    let outbound = OutboundThrottle::new(client.clone(), privileges.clone(), config.min_spacing, config.max_message_len);
    let cooldowns = Arc::new(CooldownTracker::new());

    let mut dispatcher = Dispatcher::new(config.prefix.clone(), registry, cooldowns.clone(), outbound.clone());
    if let Some(window) = &config.rate_window {
        dispatcher = dispatcher.with_rate_window(RateWindow::from_config(window));
    }
    let dispatcher = Arc::new(dispatcher);
    let channels = Arc::new(ActiveChannels::new());

    // Privileges first so a message carrying fresh badges is seen before its reply is queued
    let mut subscribers = EventSubscribers::new();
    subscribers.subscribe(Arc::new(privileges.clone()));
    subscribers.subscribe(channels.clone());
    subscribers.subscribe(dispatcher.clone());

    let sweeper = {
        let dispatcher = dispatcher.clone();
        let every = config.cooldown_sweep;
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let now = Instant::now();
                let cooldowns = dispatcher.cooldowns().sweep(now);
                let windows = dispatcher.rate_window().map(|w| w.sweep(now)).unwrap_or(0);
                debug!("Swept {} cooldown and {} rate window entries", cooldowns, windows);
            }
        })
    };

    let result = tokio::select! {
        res = run_twitch_session(client, &secrets, &config, channels, subscribers) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
            Ok(())
        }
    };

    sweeper.abort();
    info!("Stopping outbound queue ({:?})", config.shutdown);
    outbound.shutdown(config.shutdown).await;

    if let Err(e) = &result {
        error!("Chat bot stopped: {}", e);
    }
    result
}

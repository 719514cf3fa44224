use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::bot::{chat_event::chat_event::{ChatMessage, ChatUser}, commands::{commands::{BotResult, CommandContext}, registry::{CommandRegistry, RegisteredCommand}}, cooldown::{cooldown::CooldownTracker, rate_window::RateWindow}, handler::handler::ChatEventHandler, outbound::throttle::OutboundThrottle, permissions::permissions::check_permission, replies::Replies, state::def::BotError};

/// What became of one inbound line.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Not a command, or a token nobody registered.
    Ignored,
    /// Stopped by a gate before the handler ran.
    Rejected(BotError),
    Executed,
    /// The handler returned an error or panicked.
    Failed(BotError),
}

/// A command that passed every gate and only needs to run.
pub struct Invocation {
    command: Arc<RegisteredCommand>,
    ctx: CommandContext,
    outbound: OutboundThrottle,
}

impl Invocation {
    /// Runs the handler. Errors and panics are turned into one generic failure
    /// reply for the caller and never escape.
    pub async fn run(self) -> DispatchOutcome {
        let Invocation { command, ctx, outbound } = self;
        let channel = ctx.channel.clone();
        let caller = ctx.caller.display().to_string();
        debug!("Executing {} for {} in {}", command.name, caller, channel);

        let result = AssertUnwindSafe(command.command.execute(ctx)).catch_unwind().await;
        let failure = match result {
            Ok(Ok(())) => return DispatchOutcome::Executed,
            Ok(Err(e)) => BotError::HandlerFailure(e.to_string()),
            Err(panic) => BotError::HandlerFailure(panic_message(panic.as_ref())),
        };

        error!("Command {} failed in {}: {}", command.name, channel, failure);
        if let Err(e) = outbound.enqueue(channel.clone(), Replies::handler_failed(&caller)) {
            warn!("Could not queue failure reply in {}: {}", channel, e);
        }
        DispatchOutcome::Failed(failure)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

/// Turns inbound chat lines into gated command executions.
///
/// The dispatcher holds no state of its own beyond configuration. It composes the
/// registry, cooldown tracker, optional rate window and the outbound throttle.
pub struct Dispatcher {
    prefix: String,
    registry: Arc<CommandRegistry>,
    cooldowns: Arc<CooldownTracker>,
    rate_window: Option<Arc<RateWindow>>,
    outbound: OutboundThrottle,
}

impl Dispatcher {
    pub fn new(prefix: impl Into<String>, registry: Arc<CommandRegistry>, cooldowns: Arc<CooldownTracker>, outbound: OutboundThrottle) -> Self {
        Dispatcher { prefix: prefix.into(), registry, cooldowns, rate_window: None, outbound }
    }

    pub fn with_rate_window(mut self, rate_window: RateWindow) -> Self {
        self.rate_window = Some(Arc::new(rate_window));
        self
    }

    pub fn cooldowns(&self) -> &Arc<CooldownTracker> {
        &self.cooldowns
    }

    pub fn rate_window(&self) -> Option<&Arc<RateWindow>> {
        self.rate_window.as_ref()
    }

    /// Runs every gate for `message` without awaiting anything.
    ///
    /// `Ok(None)` means the line is not for us. `Err` means a gate rejected it.
    /// The cooldown is consumed here, so a later `Invocation::run` is the only
    /// execution this window allows.
    pub fn route(&self, message: &ChatMessage, now: Instant) -> BotResult<Option<Invocation>> {
        let Some(without_prefix) = message.text.strip_prefix(&self.prefix) else {
            return Ok(None);
        };

        let mut parts = without_prefix.split_whitespace();
        let Some(token) = parts.next() else {
            return Ok(None);
        };
        // "! rate" is not a command
        if without_prefix.starts_with(char::is_whitespace) {
            return Ok(None);
        }

        let Some(command) = self.registry.resolve(token) else {
            return Ok(None);
        };

        if !command.enabled {
            return Err(BotError::CommandDisabled(command.name.clone()));
        }
        check_permission(&command, &message.user)?;
        // Cooldown first, so attempts it turns away never use up the caller's window
        self.cooldowns.try_consume(&command.name, message.user.id(), command.cooldown, now)?;
        if let Some(window) = &self.rate_window {
            window.try_acquire(message.user.id(), now)?;
        }

        let args = parts.map(str::to_string).collect();
        let ctx = CommandContext::new(message.channel.clone(), message.user.clone(), command.name.clone(), args, self.prefix.clone(), self.registry.clone(), self.outbound.clone());
        Ok(Some(Invocation { command, ctx, outbound: self.outbound.clone() }))
    }

    /// Gates and runs `message` to completion. Never fails: every problem ends
    /// up as a chat reply and/or a log line.
    pub async fn handle(&self, message: &ChatMessage) -> DispatchOutcome {
        match self.route(message, Instant::now()) {
            Ok(None) => DispatchOutcome::Ignored,
            Ok(Some(invocation)) => invocation.run().await,
            Err(e) => self.reject(message, e),
        }
    }

    fn reject(&self, message: &ChatMessage, e: BotError) -> DispatchOutcome {
        debug!("Rejected '{}' from {} in {}: {}", message.text, message.user.display(), message.channel, e);

        if let Some(reply) = rejection_reply(&self.prefix, &message.text, &message.user, &e) {
            if let Err(err) = self.outbound.enqueue(message.channel.clone(), reply) {
                warn!("Could not queue rejection reply in {}: {}", message.channel, err);
            }
        }
        DispatchOutcome::Rejected(e)
    }
}

/// Text sent back for a gate rejection, `None` for rejections that stay silent.
fn rejection_reply(prefix: &str, text: &str, user: &ChatUser, e: &BotError) -> Option<String> {
    let typed = text.split_whitespace().next().unwrap_or(prefix);
    match e {
        BotError::PermissionDenied(required) => Some(Replies::no_permission(user.display(), *required)),
        BotError::CommandDisabled(name) => Some(Replies::command_disabled(user.display(), &format!("{prefix}{name}"))),
        BotError::CooldownActive(remaining) => Some(Replies::on_cooldown(user.display(), typed, *remaining)),
        // Answering a spammer would only add to the spam
        BotError::RateLimited(_) => None,
        _ => None,
    }
}

impl ChatEventHandler for Dispatcher {
    /// Gates run synchronously in arrival order; only the handler body is spawned,
    /// so a slow lookup never holds up the next line.
    fn on_message(&self, message: &ChatMessage) {
        match self.route(message, Instant::now()) {
            Ok(None) => {}
            Ok(Some(invocation)) => {
                tokio::spawn(invocation.run());
            }
            Err(e) => {
                self.reject(message, e);
            }
        }
    }
}

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::bot::{chat_event::chat_event::{ChannelId, ChatUser}, commands::registry::CommandRegistry, outbound::throttle::OutboundThrottle, permissions::permissions::PermissionLevel, state::def::BotError};

pub type BotResult<T> = Result<T, BotError>;

pub type CommandFuture = BoxFuture<'static, BotResult<()>>;

pub trait CommandT: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn usage(&self) -> &str;
    fn permission(&self) -> PermissionLevel;

    fn execute(&self, ctx: CommandContext) -> CommandFuture;
}

pub struct FnCommand<F> {func: F, desc: String, usage: String, name: String, permission: PermissionLevel} impl<F> FnCommand<F>
    where
        F: Fn(CommandContext) -> CommandFuture + Send + Sync + 'static {
    pub fn new(func: F, desc: impl Into<String>, usage: impl Into<String>, name: impl Into<String>, permission: PermissionLevel,) -> Self {
        Self {
            func,
            desc: desc.into(),
            usage: usage.into(),
            name: name.into(),
            permission,
        }
    }
}

impl<F> CommandT for FnCommand<F> where
    F: Fn(CommandContext) -> CommandFuture + Send + Sync + 'static {
        fn execute(&self, ctx: CommandContext) -> CommandFuture {
            (self.func)(ctx)
        }

        fn name(&self) -> &str { &self.name }
        fn description(&self) -> &str { &self.desc }
        fn usage(&self) -> &str { &self.usage }
        fn permission(&self) -> PermissionLevel { self.permission }
}

/// Everything a handler gets to see about one invocation.
#[derive(Clone)]
pub struct CommandContext {
    pub channel: ChannelId,
    pub caller: ChatUser,
    /// Canonical name of the resolved command, never the alias that was typed.
    pub command: String,
    pub args: Vec<String>,
    /// Prefix the dispatcher matched, for replies that echo command names.
    pub prefix: String,
    pub registry: Arc<CommandRegistry>,
    outbound: OutboundThrottle,
}

impl CommandContext {
    pub fn new(channel: ChannelId, caller: ChatUser, command: impl Into<String>, args: Vec<String>, prefix: impl Into<String>, registry: Arc<CommandRegistry>, outbound: OutboundThrottle) -> Self {
        CommandContext { channel, caller, command: command.into(), args, prefix: prefix.into(), registry, outbound }
    }

    /// Queues `text` for the invoking channel. Delivery happens later on the
    /// channel's outbound lane, so `Ok` only means "accepted".
    pub fn reply(&self, text: impl Into<String>) -> BotResult<()> {
        self.outbound.enqueue(self.channel.clone(), text)
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    pub fn rest(&self) -> String {
        self.args.join(" ")
    }
}

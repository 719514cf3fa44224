use std::{sync::Arc, time::Duration};

use crate::bot::commands::commands::CommandT;

pub mod commands;
pub mod registry;
pub mod general;
pub mod fun;
pub mod moderation;

#[derive(Clone)]
pub struct CommandRegistration {
    pub aliases: Vec<String>,
    pub cooldown: Duration,
    pub enabled: bool,
    pub command: Arc<dyn CommandT>
}

impl CommandRegistration {
    pub fn new(command: Arc<dyn CommandT>) -> Self {
        CommandRegistration { aliases: Vec::new(), cooldown: Duration::ZERO, enabled: true, command }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn name(&self) -> &str {
        self.command.name()
    }
}

pub struct CommandGroup {
    pub name: String,
    pub commands: Vec<CommandRegistration>,
}

/// Every group the bot knows about; `BotConfig::packages` picks which ones get registered.
pub fn command_groups() -> Vec<CommandGroup> {
    vec![
        general::commands::general_commands(),
        fun::commands::fun_commands(),
        moderation::commands::moderation_commands(),
    ]
}

#[macro_export]
macro_rules! cmd {
    ($command:expr $(, $alias:expr)* $(,)?) => {
        $crate::bot::commands::CommandRegistration {
            aliases: vec![$($alias.to_string()),*],
            cooldown: ::std::time::Duration::ZERO,
            enabled: true,
            command: $command,
        }
    };
}

use std::{collections::HashMap, sync::Arc, time::Duration};

use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

use crate::bot::{commands::{commands::{BotResult, CommandT}, CommandGroup, CommandRegistration}, permissions::permissions::PermissionLevel, state::def::{BotConfig, BotError}};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaseSensitivity {
    Sensitive,
    Insensitive,
}

impl CaseSensitivity {
    pub fn from_flag(case_sensitive: bool) -> Self {
        if case_sensitive { CaseSensitivity::Sensitive } else { CaseSensitivity::Insensitive }
    }

    /// Key used for both registration and lookup. Insensitive mode also applies
    /// NFKC so fullwidth or styled letters typed in chat still match.
    pub fn fold(&self, token: &str) -> String {
        match self {
            CaseSensitivity::Sensitive => token.to_string(),
            CaseSensitivity::Insensitive => token.nfkc().collect::<String>().to_lowercase(),
        }
    }
}

pub struct RegisteredCommand {
    pub name: String,
    pub aliases: Vec<String>,
    pub permission: PermissionLevel,
    pub cooldown: Duration,
    pub enabled: bool,
    pub command: Arc<dyn CommandT>,
}

impl RegisteredCommand {
    pub fn description(&self) -> &str {
        self.command.description()
    }

    pub fn usage(&self) -> &str {
        self.command.usage()
    }
}

pub struct CommandRegistry {
    case: CaseSensitivity,
    commands: HashMap<String, Arc<RegisteredCommand>>,
    // alias -> canonical name
    aliases: HashMap<String, String>,
}

impl CommandRegistry {
    pub fn new(case: CaseSensitivity) -> Self {
        Self { case, commands: HashMap::new(), aliases: HashMap::new() }
    }

    /// Builds the table from the enabled packages and applies the startup overrides
    /// (cooldowns, disabled commands, removed and extra aliases).
    pub fn from_groups(groups: Vec<CommandGroup>, config: &BotConfig) -> BotResult<Self> {
        let mut registry = CommandRegistry::new(CaseSensitivity::from_flag(config.case_sensitive));
        let overrides = &config.commands;

        for package in &config.packages {
            let Some(group) = groups.iter().find(|g| g.name.eq_ignore_ascii_case(package)) else {
                warn!("Unknown command package '{}', skipping", package);
                continue;
            };

            for reg in &group.commands {
                let mut reg = reg.clone();
                let name = reg.name().to_string();

                if let Some(cooldown) = config.cooldown_override(&name) {
                    reg.cooldown = cooldown;
                }
                if overrides.disabled_commands.contains(&name) {
                    reg.enabled = false;
                }
                reg.aliases.retain(|alias| !overrides.removed_aliases.contains(alias));

                registry.register(reg)?;
            }
        }

        for (alias, target) in &overrides.aliases {
            registry.register_alias(alias, target)?;
        }

        Ok(registry)
    }

    pub fn case(&self) -> CaseSensitivity {
        self.case
    }

    pub fn register(&mut self, registration: CommandRegistration) -> BotResult<()> {
        let name = self.case.fold(registration.name());
        let aliases: Vec<String> = registration.aliases.iter().map(|a| self.case.fold(a)).collect();

        let mut seen: Vec<&str> = Vec::with_capacity(aliases.len() + 1);
        for key in std::iter::once(&name).chain(aliases.iter()) {
            if key.is_empty() || key.contains(char::is_whitespace) {
                return Err(BotError::Custom(format!("Invalid command token '{}'", key)));
            }
            if self.contains(key) || seen.contains(&key.as_str()) {
                return Err(BotError::DuplicateCommand(key.clone()));
            }
            seen.push(key.as_str());
        }

        for alias in &aliases {
            self.aliases.insert(alias.clone(), name.clone());
        }

        debug!("Registered command {} (aliases: {:?})", name, aliases);
        let command = RegisteredCommand {
            permission: registration.command.permission(),
            name: name.clone(),
            aliases,
            cooldown: registration.cooldown,
            enabled: registration.enabled,
            command: registration.command,
        };
        self.commands.insert(name, Arc::new(command));

        Ok(())
    }

    /// Adds one more alias to an already registered command.
    pub fn register_alias(&mut self, alias: &str, target: &str) -> BotResult<()> {
        let alias = self.case.fold(alias);
        let target = self.case.fold(target);

        let Some(existing) = self.commands.get(&target).cloned() else {
            return Err(BotError::UnknownCommand(target));
        };
        if self.contains(&alias) {
            return Err(BotError::DuplicateCommand(alias));
        }

        let mut aliases = existing.aliases.clone();
        aliases.push(alias.clone());
        let updated = RegisteredCommand {
            name: existing.name.clone(),
            aliases,
            permission: existing.permission,
            cooldown: existing.cooldown,
            enabled: existing.enabled,
            command: existing.command.clone(),
        };

        self.aliases.insert(alias, target.clone());
        self.commands.insert(target, Arc::new(updated));
        Ok(())
    }

    /// Unknown tokens are not an error: chat is full of lines that merely start with the prefix.
    pub fn resolve(&self, token: &str) -> Option<Arc<RegisteredCommand>> {
        let key = self.case.fold(token);
        let name = self.aliases.get(&key).unwrap_or(&key);
        self.commands.get(name).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.commands.contains_key(key) || self.aliases.contains_key(key)
    }

    /// Registered commands sorted by name.
    pub fn commands(&self) -> Vec<Arc<RegisteredCommand>> {
        let mut list: Vec<_> = self.commands.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::{bot::{commands::{commands::{CommandT, FnCommand}, CommandGroup}, permissions::permissions::PermissionLevel, replies::Replies}, cmd};

pub fn general_commands() -> CommandGroup {
    let started = Utc::now();
    CommandGroup {
        name: "general".into(),
        commands: vec![
            cmd!(ping_command(), "pong"),
            cmd!(commands_command(), "help"),
            cmd!(uptime_command(started)),
            cmd!(whoami_command()),
        ],
    }
}

pub fn ping_command() -> Arc<dyn CommandT> {
    Arc::new(FnCommand::new(
        |ctx| {
            Box::pin(async move {
                ctx.reply(Replies::pong())?;
                Ok(())
            })
        },
        "Checks that the bot is alive",
        "!ping",
        "ping",
        PermissionLevel::Viewer,
    ))
}

pub fn commands_command() -> Arc<dyn CommandT> {
    Arc::new(FnCommand::new(
        |ctx| {
            Box::pin(async move {
                if let Some(name) = ctx.arg(0) {
                    let name = name.trim_start_matches(ctx.prefix.as_str());
                    match ctx.registry.resolve(name) {
                        Some(cmd) => ctx.reply(Replies::command_help(&ctx.prefix, &cmd.name, cmd.description(), cmd.usage()))?,
                        None => ctx.reply(Replies::unknown_command(ctx.caller.display(), name))?,
                    }
                    return Ok(());
                }

                let names: Vec<String> = ctx.registry.commands()
                    .iter()
                    .filter(|cmd| cmd.enabled && ctx.caller.permission >= cmd.permission)
                    .map(|cmd| cmd.name.clone())
                    .collect();
                ctx.reply(Replies::command_list(&ctx.prefix, &names))?;
                Ok(())
            })
        },
        "Lists the commands you can use, or shows help for one",
        "!commands [command]",
        "commands",
        PermissionLevel::Viewer,
    ))
}

pub fn uptime_command(started: DateTime<Utc>) -> Arc<dyn CommandT> {
    Arc::new(FnCommand::new(
        move |ctx| {
            Box::pin(async move {
                ctx.reply(Replies::uptime(&format_elapsed(Utc::now() - started)))?;
                Ok(())
            })
        },
        "Shows how long the bot has been running",
        "!uptime",
        "uptime",
        PermissionLevel::Viewer,
    ))
}

pub fn whoami_command() -> Arc<dyn CommandT> {
    Arc::new(FnCommand::new(
        |ctx| {
            Box::pin(async move {
                ctx.reply(Replies::whoami(ctx.caller.display(), ctx.caller.permission))?;
                Ok(())
            })
        },
        "Shows your permission level in this channel",
        "!whoami",
        "whoami",
        PermissionLevel::Viewer,
    ))
}

pub fn format_elapsed(elapsed: TimeDelta) -> String {
    let total = elapsed.num_seconds().max(0);
    let (days, hours, minutes, seconds) = (total / 86_400, total / 3600 % 24, total / 60 % 60, total % 60);

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}

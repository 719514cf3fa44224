use std::sync::Arc;

use crate::{bot::{commands::{commands::{CommandT, FnCommand}, CommandGroup}, permissions::permissions::PermissionLevel, replies::Replies}, cmd};

pub fn moderation_commands() -> CommandGroup {
    CommandGroup {
        name: "moderation".into(),
        commands: vec![
            cmd!(say_command(), "echo"),
        ],
    }
}

pub fn say_command() -> Arc<dyn CommandT> {
    Arc::new(FnCommand::new(
        |ctx| {
            Box::pin(async move {
                let text = ctx.rest();
                // Never echo something chat would parse as a command of its own
                if text.is_empty() || text.starts_with('/') || text.starts_with('.') {
                    ctx.reply(Replies::usage(ctx.caller.display(), "!say <text>"))?;
                    return Ok(());
                }
                ctx.reply(text)?;
                Ok(())
            })
        },
        "Makes the bot say something",
        "!say <text>",
        "say",
        PermissionLevel::Moderator,
    ))
}

use std::time::Duration;

use crate::bot::permissions::permissions::PermissionLevel;

pub struct Replies;

impl Replies {
    pub fn no_permission(user: &str, required: PermissionLevel) -> String {
        format!("❌ {} you need to be {} to use this command", user, required)
    }

    pub fn command_disabled(user: &str, command: &str) -> String {
        format!("❌ {} the {} command is disabled right now 😴", user, command)
    }

    pub fn on_cooldown(user: &str, command: &str, remaining: Duration) -> String {
        format!("⏳ {} {} is on cooldown, try again in {}s 💜", user, command, whole_seconds(remaining))
    }

    pub fn handler_failed(user: &str) -> String {
        format!("❌ {} something went wrong 😭 please try again later 💜", user)
    }

    pub fn usage(user: &str, usage: &str) -> String {
        format!("{} usage: {}", user, usage)
    }

    pub fn pong() -> String {
        "🏓 Pong!".to_string()
    }

    pub fn command_list(prefix: &str, names: &[String]) -> String {
        let list = names.iter().map(|n| format!("{prefix}{n}")).collect::<Vec<_>>().join(", ");
        format!("📋 Commands: {}", list)
    }

    pub fn command_help(prefix: &str, name: &str, description: &str, usage: &str) -> String {
        format!("📋 {prefix}{name}: {description} | usage: {usage}")
    }

    pub fn unknown_command(user: &str, name: &str) -> String {
        format!("❌ {} there is no command called {} 👁👄👁", user, name)
    }

    pub fn uptime(elapsed: &str) -> String {
        format!("⏱️ I have been running for {}", elapsed)
    }

    pub fn whoami(user: &str, level: PermissionLevel) -> String {
        format!("🪪 {} you are a {} here", user, level)
    }

    pub fn rate(user: &str, thing: &str, score: u8) -> String {
        format!("🤔 {} I rate {} a solid {}/10", user, thing, score)
    }

    pub fn roll(user: &str, spec: &str, rolls: &[u32], total: u32) -> String {
        if rolls.len() == 1 {
            format!("🎲 {} rolled {}: {}", user, spec, total)
        } else {
            let parts = rolls.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(" + ");
            format!("🎲 {} rolled {}: {} = {}", user, spec, parts, total)
        }
    }

    pub fn eight_ball(user: &str, answer: &str) -> String {
        format!("🎱 {} {}", user, answer)
    }
}

/// Rounds up so "0s" is never shown while a cooldown is still running.
pub fn whole_seconds(remaining: Duration) -> u64 {
    let millis = remaining.as_millis() as u64;
    millis.div_ceil(1000).max(1)
}

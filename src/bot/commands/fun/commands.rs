use std::{sync::Arc, time::Duration};

use rand::{seq::IndexedRandom, Rng};

use crate::{bot::{commands::{commands::{CommandT, FnCommand}, CommandGroup}, permissions::permissions::PermissionLevel, replies::Replies}, cmd};

const MAX_DICE: u32 = 20;
const MAX_SIDES: u32 = 1000;

const EIGHT_BALL: &[&str] = &[
    "it is certain",
    "without a doubt",
    "you may rely on it",
    "most likely",
    "ask again later",
    "cannot predict now",
    "don't count on it",
    "my sources say no",
    "very doubtful",
];

pub fn fun_commands() -> CommandGroup {
    CommandGroup {
        name: "fun".into(),
        commands: vec![
            cmd!(rate_command()).cooldown(Duration::from_secs(3)),
            cmd!(roll_command(), "dice"),
            cmd!(eight_ball_command(), "eightball"),
        ],
    }
}

pub fn rate_command() -> Arc<dyn CommandT> {
    Arc::new(FnCommand::new(
        |ctx| {
            Box::pin(async move {
                let thing = ctx.rest();
                if thing.is_empty() {
                    ctx.reply(Replies::usage(ctx.caller.display(), "!rate <thing>"))?;
                    return Ok(());
                }
                let score = rand::rng().random_range(0..=10);
                ctx.reply(Replies::rate(ctx.caller.display(), &thing, score))?;
                Ok(())
            })
        },
        "Rates anything out of 10",
        "!rate <thing>",
        "rate",
        PermissionLevel::Viewer,
    ))
}

pub fn roll_command() -> Arc<dyn CommandT> {
    Arc::new(FnCommand::new(
        |ctx| {
            Box::pin(async move {
                let spec = ctx.arg(0).unwrap_or("1d6").to_lowercase();
                let Some((count, sides)) = parse_dice(&spec) else {
                    ctx.reply(Replies::usage(ctx.caller.display(), "!roll [NdM], up to 20d1000"))?;
                    return Ok(());
                };
                let rolls = roll_dice(&mut rand::rng(), count, sides);
                let total = rolls.iter().sum();
                ctx.reply(Replies::roll(ctx.caller.display(), &spec, &rolls, total))?;
                Ok(())
            })
        },
        "Rolls dice, 1d6 by default",
        "!roll [NdM]",
        "roll",
        PermissionLevel::Viewer,
    ))
}

pub fn eight_ball_command() -> Arc<dyn CommandT> {
    Arc::new(FnCommand::new(
        |ctx| {
            Box::pin(async move {
                if ctx.args.is_empty() {
                    ctx.reply(Replies::usage(ctx.caller.display(), "!8ball <question>"))?;
                    return Ok(());
                }
                let answer = EIGHT_BALL.choose(&mut rand::rng()).copied().unwrap_or("ask again later");
                ctx.reply(Replies::eight_ball(ctx.caller.display(), answer))?;
                Ok(())
            })
        },
        "Answers a yes/no question",
        "!8ball <question>",
        "8ball",
        PermissionLevel::Viewer,
    ))
}

/// Parses `NdM` (or `dM`) within the allowed bounds.
pub fn parse_dice(spec: &str) -> Option<(u32, u32)> {
    let (count, sides) = spec.split_once('d')?;
    let count = if count.is_empty() { 1 } else { count.parse().ok()? };
    let sides: u32 = sides.parse().ok()?;

    ((1..=MAX_DICE).contains(&count) && (2..=MAX_SIDES).contains(&sides)).then_some((count, sides))
}

pub fn roll_dice<R: Rng + ?Sized>(rng: &mut R, count: u32, sides: u32) -> Vec<u32> {
    (0..count).map(|_| rng.random_range(1..=sides)).collect()
}

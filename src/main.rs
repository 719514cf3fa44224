use std::process::exit;

use chatterbot::bot::{run_chat_bot, state::def::{BotConfig, BotSecrets}};
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let secrets = match BotSecrets::from_env() {
        Ok(secrets) => secrets,
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    };

    let config = match BotConfig::load_or_default(BotConfig::config_path()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            exit(1);
        }
    };

    info!("Starting chat bot as {} in {} channels", secrets.nickname, config.channels.len());
    if run_chat_bot(config, secrets).await.is_err() {
        exit(1);
    }
}

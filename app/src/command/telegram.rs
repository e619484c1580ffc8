use crate::command::{CommandStrategy, build_orchestrator};
use dpdrbot_config::Config;
use dpdrbot_telegram::TelegramBot;
use std::sync::Arc;
use tracing::info;

/// Input for Telegram bot command.
pub struct TelegramInput {
    /// Optional bot token (overrides config)
    pub token: Option<String>,
}

/// Strategy for running Telegram bot.
pub struct TelegramStrategy;

impl CommandStrategy for TelegramStrategy {
    type Input = TelegramInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let mut config = Config::load()?;
        if let Some(token) = input.token {
            config.telegram.token = token;
        }
        config.validate()?;

        info!("Starting Telegram bot...");
        let orchestrator = Arc::new(build_orchestrator(&config).await?);
        let bot = TelegramBot::new(config.telegram.token.clone(), orchestrator);

        info!("Telegram bot is running. Press Ctrl+C to stop.");
        bot.run().await?;

        Ok(())
    }
}

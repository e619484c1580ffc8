use crate::{Command, Result};
use dpdrbot_conversation::ConversationOrchestrator;
use std::{sync::Arc, time::Duration};
use teloxide::prelude::*;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Telegram front end for the conversation orchestrator
#[derive(Clone)]
pub struct TelegramBot {
    /// Teloxide bot instance
    pub bot: Bot,
    pub orchestrator: Arc<ConversationOrchestrator>,
    /// Cancelled on shutdown so in-flight runs stop polling
    pub cancel: CancellationToken,
}

impl TelegramBot {
    #[must_use]
    pub fn new(token: String, orchestrator: Arc<ConversationOrchestrator>) -> Self {
        Self {
            bot: Bot::new(token),
            orchestrator,
            cancel: CancellationToken::new(),
        }
    }

    /// Test connection to Telegram API with linear backoff.
    /// Starts at 2s, increases by 2s each attempt, max 10s delay.
    /// Retries until connection succeeds.
    async fn test_connection(&self) {
        const INITIAL_DELAY_SECS: u64 = 2;
        const MAX_DELAY_SECS: u64 = 10;

        let mut attempt = 1u64;
        loop {
            match self.bot.get_me().await {
                Ok(bot_user) => {
                    info!(
                        "Connected to Telegram API: @{} (id: {})",
                        bot_user
                            .user
                            .username
                            .unwrap_or_else(|| "no username".to_string()),
                        bot_user.user.id
                    );
                    return;
                }
                Err(e) => {
                    let delay_secs = (INITIAL_DELAY_SECS * attempt).min(MAX_DELAY_SECS);

                    warn!("Connection attempt {attempt} failed: {e}. Retrying in {delay_secs}s...");

                    if attempt == 1 {
                        warn!("This may be due to:");
                        warn!("  - Network connectivity issues");
                        warn!("  - Firewall blocking api.telegram.org");
                        warn!("  - Invalid bot token");
                    }

                    tokio::select! {
                        () = self.cancel.cancelled() => return,
                        () = sleep(Duration::from_secs(delay_secs)) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Run the bot until Ctrl-C
    pub async fn run(self) -> Result<()> {
        use teloxide::dispatching::{Dispatcher, UpdateFilterExt};
        use teloxide::dptree;
        use teloxide::types::Update;

        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested, cancelling in-flight runs");
                cancel.cancel();
            }
        });

        self.test_connection().await;
        if self.cancel.is_cancelled() {
            return Ok(());
        }

        if let Err(e) = self.bot.set_my_commands(Command::bot_commands()).await {
            warn!("Failed to register command menu: {e}");
        }

        let bot = self.bot.clone();

        let schema = dptree::entry().branch(Update::filter_message().endpoint({
            let bot_clone = self.clone();
            move |_bot: Bot, msg: teloxide::types::Message| {
                let bot_clone = bot_clone.clone();
                async move { crate::handler::handle_message(bot_clone, msg).await }
            }
        }));

        Dispatcher::builder(bot, schema)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        self.cancel.cancel();
        info!("Telegram bot stopped");
        Ok(())
    }
}

//! One-shot question from the terminal, handled like a chat message.

use async_trait::async_trait;
use dpdrbot_config::Config;
use dpdrbot_conversation::InboundMessage;
use dpdrbot_core::{OutboundMessage, ReplySink, UserId};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::build_orchestrator;

/// Input parameters for the Ask command strategy.
#[derive(Debug, Clone)]
pub struct AskInput {
    pub message: String,
    /// User id the quota and session are charged to
    pub user_id: UserId,
}

/// Prints replies, rendering keyboards as bracketed button rows.
struct StdoutSink;

#[async_trait]
impl ReplySink for StdoutSink {
    async fn send(&self, message: OutboundMessage) -> anyhow::Result<()> {
        println!("{}", message.text);
        for row in message.keyboard.unwrap_or_default() {
            let buttons: Vec<String> = row.iter().map(|label| format!("[{label}]")).collect();
            println!("  {}", buttons.join(" "));
        }
        Ok(())
    }
}

/// Strategy for executing the Ask command.
#[derive(Debug, Clone, Copy)]
pub struct AskStrategy;

impl super::CommandStrategy for AskStrategy {
    type Input = AskInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        config.validate_assistant()?;

        let orchestrator = build_orchestrator(&config).await?;
        let cancel = CancellationToken::new();
        let watcher = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                watcher.cancel();
            }
        });

        info!("Asking as user {}", input.user_id);
        orchestrator
            .on_message(
                InboundMessage::new(input.user_id, input.message),
                &StdoutSink,
                &cancel,
            )
            .await
    }
}

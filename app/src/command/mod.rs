//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy with its own input type, dispatched
//! statically from `main`.

use dpdrbot_config::Config;
use dpdrbot_conversation::{
    ConversationOrchestrator, RunLifecycleController, RunSettings, SessionRegistry, UsageTracker,
};
use dpdrbot_core::SystemClock;
use dpdrbot_providers::OpenAIAssistantsProvider;
use dpdrbot_session::DatabaseStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod ask;
mod init;
mod plans;
mod telegram;
mod version;

pub use ask::{AskInput, AskStrategy};
pub use init::InitStrategy;
pub use plans::PlansStrategy;
pub use telegram::{TelegramInput, TelegramStrategy};
pub use version::VersionStrategy;

fn run_settings(config: &Config) -> RunSettings {
    let assistant = &config.assistant;
    RunSettings {
        assistant_id: assistant.assistant_id.clone(),
        model: assistant.model.clone(),
        temperature: assistant.temperature,
        poll_interval: Duration::from_secs(assistant.poll_interval_secs),
        timeout: Duration::from_secs(assistant.run_timeout_secs),
    }
}

/// Wire the provider, optional store and quota tracker into an orchestrator.
async fn build_orchestrator(config: &Config) -> anyhow::Result<ConversationOrchestrator> {
    let provider = OpenAIAssistantsProvider::new(config.assistant.api_key.clone())?
        .with_base_url(config.assistant.base_url.clone());
    info!(
        "Using assistant {} at {}",
        config.assistant.assistant_id, config.assistant.base_url
    );

    let sessions = Arc::new(SessionRegistry::new());
    let usage = Arc::new(UsageTracker::new(Arc::new(SystemClock)));
    let runs = RunLifecycleController::new(
        Arc::new(provider),
        Arc::clone(&sessions),
        run_settings(config),
    );

    let mut orchestrator =
        ConversationOrchestrator::new(usage, sessions, runs).with_quota(config.quota.enabled);
    if !config.quota.enabled {
        info!("Daily quotas disabled");
    }

    if config.database.enabled {
        let store = DatabaseStore::connect(&config.database.url).await?;
        info!("Persisting conversations to {}", config.database.url);
        orchestrator = orchestrator.with_store(Arc::new(store));
    }

    Ok(orchestrator)
}

/// Core trait defining the contract for all command strategies.
///
/// # Example
/// ```rust,ignore
/// struct MyStrategy;
///
/// impl CommandStrategy for MyStrategy {
///     type Input = MyInput;
///
///     async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

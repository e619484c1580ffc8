//! Submit → poll → completed/failed/timed-out lifecycle of one assistant run.

use dpdrbot_core::{
    AssistantBackend, Classification, OutboundMessage, ReplySink, Role, RunId, RunRequest,
    RunStatus, ThreadId, UserId, classify,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::session::SessionRegistry;

const PROCESSING_NOTICE: &str = "Procesando tu pregunta, por favor espera...";
const ERROR_PREFIX: &str = "Lo siento, hubo un error al procesar tu mensaje";

/// Fixed parameters for every run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub assistant_id: String,
    pub model: String,
    pub temperature: f32,
    pub poll_interval: Duration,
    /// Wall-clock budget for the polling phase.
    pub timeout: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            assistant_id: String::new(),
            model: "gpt-4-turbo-preview".to_string(),
            temperature: 0.7,
            poll_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(300),
        }
    }
}

impl RunSettings {
    #[must_use]
    pub fn with_assistant_id(mut self, assistant_id: impl Into<String>) -> Self {
        self.assistant_id = assistant_id.into();
        self
    }

    #[must_use]
    pub const fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Created,
    MessageAppended,
    RunSubmitted,
    Polling,
    Completed,
    Failed,
    TimedOut,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::MessageAppended => "message-appended",
            Self::RunSubmitted => "run-submitted",
            Self::Polling => "polling",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed-out",
        };
        f.write_str(name)
    }
}

/// Why a run ended without an answer. Display texts are user-facing.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Error del asistente: {0}")]
    RemoteRunFailed(String),

    #[error("El asistente tardó demasiado en responder")]
    TimedOut,

    #[error("El asistente no devolvió ninguna respuesta")]
    EmptyResponse,

    #[error("El servicio se está deteniendo")]
    Cancelled,

    #[error("{0}")]
    Transport(#[from] anyhow::Error),
}

/// Outcome of handling one message.
#[derive(Debug)]
pub enum Reply {
    /// Courtesy text or a button that needs no answer.
    Silent,
    /// Canned text produced without the backend.
    Acknowledgment(String),
    /// The assistant's answer.
    Answer(String),
    /// The run ended in failure and the session was discarded.
    Failed(RunError),
}

impl Reply {
    /// Text to send; empty means nothing is sent.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Silent => String::new(),
            Self::Acknowledgment(text) | Self::Answer(text) => text.clone(),
            Self::Failed(error) => format!("{ERROR_PREFIX}: {error}"),
        }
    }

    /// Terminal state the lifecycle ended in.
    #[must_use]
    pub const fn state(&self) -> RunState {
        match self {
            Self::Silent | Self::Acknowledgment(_) | Self::Answer(_) => RunState::Completed,
            Self::Failed(RunError::TimedOut) => RunState::TimedOut,
            Self::Failed(_) => RunState::Failed,
        }
    }
}

/// Drives a classified message through the remote run lifecycle.
pub struct RunLifecycleController {
    backend: Arc<dyn AssistantBackend>,
    sessions: Arc<SessionRegistry>,
    settings: RunSettings,
}

impl RunLifecycleController {
    #[must_use]
    pub fn new(
        backend: Arc<dyn AssistantBackend>,
        sessions: Arc<SessionRegistry>,
        settings: RunSettings,
    ) -> Self {
        Self {
            backend,
            sessions,
            settings,
        }
    }

    pub async fn handle(
        &self,
        user_id: UserId,
        raw_text: &str,
        sink: &dyn ReplySink,
        cancel: &CancellationToken,
    ) -> Reply {
        let classification = classify(raw_text);

        let (prompt, instructions) = match &classification {
            Classification::Feedback(kind) => {
                info!("User {user_id} sent feedback: {kind:?}");
                return kind
                    .acknowledgment()
                    .map_or(Reply::Silent, |text| Reply::Acknowledgment(text.to_string()));
            }
            Classification::Courtesy => {
                debug!("Absorbed courtesy message from user {user_id}");
                return Reply::Silent;
            }
            Classification::FaqCategory { template, prompt } => {
                info!("User {user_id} selected FAQ category {template:?}");
                (prompt.as_str(), template.instructions())
            }
            Classification::Content { prompt } => (
                prompt.as_str(),
                classification.instructions().unwrap_or_default(),
            ),
        };

        let mut state = RunState::Created;
        match self
            .run(user_id, prompt, instructions, &mut state, sink, cancel)
            .await
        {
            Ok(answer) => {
                info!("Run for user {user_id} completed");
                Reply::Answer(answer)
            }
            Err(err) => {
                error!("Run for user {user_id} failed in state {state}: {err}");
                self.sessions.clear(user_id).await;
                Reply::Failed(err)
            }
        }
    }

    async fn run(
        &self,
        user_id: UserId,
        prompt: &str,
        instructions: &str,
        state: &mut RunState,
        sink: &dyn ReplySink,
        cancel: &CancellationToken,
    ) -> Result<String, RunError> {
        let backend = Arc::clone(&self.backend);
        let session = self
            .sessions
            .get_or_create(user_id, || async move { backend.create_thread().await })
            .await?;
        let thread = &session.thread;

        self.backend
            .append_message(thread, Role::User, prompt)
            .await?;
        *state = RunState::MessageAppended;

        let request = RunRequest {
            assistant_id: self.settings.assistant_id.clone(),
            model: self.settings.model.clone(),
            temperature: self.settings.temperature,
            instructions: instructions.to_string(),
        };
        let run = self.backend.create_run(thread, &request).await?;
        *state = RunState::RunSubmitted;
        info!("Submitted run {run} on thread {thread} for user {user_id}");

        if let Err(err) = sink.send(OutboundMessage::text(PROCESSING_NOTICE)).await {
            warn!("Could not send progress notice to user {user_id}: {err}");
        }

        *state = RunState::Polling;
        match self.poll(thread, &run, cancel).await {
            Ok(()) => {}
            Err(RunError::TimedOut) => {
                *state = RunState::TimedOut;
                return Err(RunError::TimedOut);
            }
            Err(err) => {
                *state = RunState::Failed;
                return Err(err);
            }
        }

        let messages = self.backend.list_messages(thread).await?;
        let answer = messages
            .into_iter()
            .find(|message| message.role == Role::Assistant)
            .map(|message| message.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or(RunError::EmptyResponse)?;

        *state = RunState::Completed;
        Ok(answer)
    }

    /// Check the run status at a fixed interval until it settles or the
    /// budget runs out.
    async fn poll(
        &self,
        thread: &ThreadId,
        run: &RunId,
        cancel: &CancellationToken,
    ) -> Result<(), RunError> {
        let started = Instant::now();
        let mut checks = 0u32;

        while started.elapsed() < self.settings.timeout {
            checks += 1;
            match self.backend.run_status(thread, run).await? {
                RunStatus::Completed => {
                    debug!("Run {run} completed after {checks} check(s)");
                    return Ok(());
                }
                RunStatus::Failed { reason } => return Err(RunError::RemoteRunFailed(reason)),
                RunStatus::Submitted => debug!("Run {run} still pending (check {checks})"),
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(RunError::Cancelled),
                () = sleep(self.settings.poll_interval) => {}
            }
        }

        warn!(
            "Run {run} did not finish within {}s",
            self.settings.timeout.as_secs()
        );
        Err(RunError::TimedOut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_texts_are_user_facing() {
        let reply = Reply::Failed(RunError::RemoteRunFailed("rate limited".to_string()));
        assert_eq!(
            reply.text(),
            "Lo siento, hubo un error al procesar tu mensaje: Error del asistente: rate limited"
        );
        assert_eq!(reply.state(), RunState::Failed);

        let reply = Reply::Failed(RunError::TimedOut);
        assert!(reply.text().ends_with("El asistente tardó demasiado en responder"));
        assert_eq!(reply.state(), RunState::TimedOut);

        let reply = Reply::Failed(RunError::Transport(anyhow::anyhow!("connection reset")));
        assert!(reply.text().ends_with(": connection reset"));
    }

    #[test]
    fn silent_reply_is_empty() {
        assert!(Reply::Silent.text().is_empty());
        assert_eq!(Reply::Silent.state(), RunState::Completed);
    }

    #[test]
    fn default_settings_match_fixed_constants() {
        let settings = RunSettings::default().with_assistant_id("asst_1");
        assert_eq!(settings.poll_interval, Duration::from_secs(2));
        assert_eq!(settings.timeout, Duration::from_secs(300));
        assert_eq!(settings.model, "gpt-4-turbo-preview");
        assert_eq!(settings.assistant_id, "asst_1");
    }
}

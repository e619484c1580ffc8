//! Interface to the remote assistant: threads, messages and runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Role;

/// Handle of a remote conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub String);

/// Handle of a single run on a thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRequest {
    pub assistant_id: String,
    pub model: String,
    pub temperature: f32,
    pub instructions: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Queued or still in progress.
    Submitted,
    Completed,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMessage {
    pub role: Role,
    pub text: String,
}

#[async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn create_thread(&self) -> anyhow::Result<ThreadId>;

    async fn append_message(&self, thread: &ThreadId, role: Role, text: &str)
    -> anyhow::Result<()>;

    async fn create_run(&self, thread: &ThreadId, request: &RunRequest) -> anyhow::Result<RunId>;

    async fn run_status(&self, thread: &ThreadId, run: &RunId) -> anyhow::Result<RunStatus>;

    /// Messages on the thread, most recent first.
    async fn list_messages(&self, thread: &ThreadId) -> anyhow::Result<Vec<ThreadMessage>>;
}

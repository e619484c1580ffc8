//! Scripted collaborators shared by the conversation integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use dpdrbot_conversation::{
    ConversationOrchestrator, RunLifecycleController, RunSettings, SessionRegistry, UsageTracker,
};
use dpdrbot_core::{
    AssistantBackend, ConversationLogEntry, ConversationStore, ManualClock, OutboundMessage,
    ReplySink, Role, RunId, RunRequest, RunStatus, ThreadId, ThreadMessage, UserId, UserProfile,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Backend whose run statuses and answers are set up front.
#[derive(Default)]
pub struct ScriptedBackend {
    threads: AtomicUsize,
    runs: AtomicUsize,
    statuses: Mutex<VecDeque<RunStatus>>,
    answer: Mutex<Option<String>>,
    failing: Mutex<Vec<String>>,
    pub calls: Mutex<Vec<String>>,
    pub appended: Mutex<Vec<(ThreadId, String)>>,
    pub requests: Mutex<Vec<RunRequest>>,
}

impl ScriptedBackend {
    pub fn answering(answer: &str) -> Arc<Self> {
        let backend = Self::default();
        *backend.answer.lock().unwrap() = Some(answer.to_string());
        Arc::new(backend)
    }

    /// Statuses returned by successive polls; once drained, every poll
    /// reports completion.
    pub fn script(&self, statuses: impl IntoIterator<Item = RunStatus>) {
        self.statuses.lock().unwrap().extend(statuses);
    }

    pub fn pending_forever(&self) {
        self.script(std::iter::repeat_n(RunStatus::Submitted, 10_000));
    }

    pub fn fail_thread_creation(&self) {
        self.fail_on("create_thread");
    }

    /// Make every later `call` fail with a transport error.
    pub fn fail_on(&self, call: &str) {
        self.failing.lock().unwrap().push(call.to_string());
    }

    pub fn threads_created(&self) -> usize {
        self.threads.load(Ordering::SeqCst)
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == call)
            .count()
    }

    fn log(&self, call: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(call.to_string());
        if self.failing.lock().unwrap().iter().any(|c| c == call) {
            anyhow::bail!("{call} failed");
        }
        Ok(())
    }
}

#[async_trait]
impl AssistantBackend for ScriptedBackend {
    async fn create_thread(&self) -> anyhow::Result<ThreadId> {
        self.log("create_thread")?;
        let n = self.threads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ThreadId(format!("thread_{n}")))
    }

    async fn append_message(
        &self,
        thread: &ThreadId,
        role: Role,
        text: &str,
    ) -> anyhow::Result<()> {
        self.log("append_message")?;
        assert_eq!(role, Role::User);
        self.appended
            .lock()
            .unwrap()
            .push((thread.clone(), text.to_string()));
        Ok(())
    }

    async fn create_run(&self, _thread: &ThreadId, request: &RunRequest) -> anyhow::Result<RunId> {
        self.log("create_run")?;
        self.requests.lock().unwrap().push(request.clone());
        let n = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RunId(format!("run_{n}")))
    }

    async fn run_status(&self, _thread: &ThreadId, _run: &RunId) -> anyhow::Result<RunStatus> {
        self.log("run_status")?;
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(RunStatus::Completed))
    }

    async fn list_messages(&self, thread: &ThreadId) -> anyhow::Result<Vec<ThreadMessage>> {
        self.log("list_messages")?;
        let mut messages = Vec::new();
        if let Some(answer) = self.answer.lock().unwrap().clone() {
            messages.push(ThreadMessage {
                role: Role::Assistant,
                text: answer,
            });
        }
        for (t, text) in self.appended.lock().unwrap().iter().rev() {
            if t == thread {
                messages.push(ThreadMessage {
                    role: Role::User,
                    text: text.clone(),
                });
            }
        }
        Ok(messages)
    }
}

/// Collects everything sent to the user.
#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingSink {
    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.text.clone())
            .collect()
    }

    pub fn last(&self) -> Option<OutboundMessage> {
        self.sent.lock().unwrap().last().cloned()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn send(&self, message: OutboundMessage) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// In-memory store that can be told to fail every call.
#[derive(Default)]
pub struct MemoryStore {
    pub users: Mutex<HashMap<UserId, UserProfile>>,
    pub log: Mutex<Vec<ConversationLogEntry>>,
    pub usage: Mutex<HashMap<(UserId, NaiveDate), u32>>,
    pub broken: bool,
}

impl MemoryStore {
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.broken {
            anyhow::bail!("database is locked");
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn get_user(&self, user_id: UserId) -> anyhow::Result<Option<UserProfile>> {
        self.check()?;
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }

    async fn upsert_user(&self, profile: &UserProfile) -> anyhow::Result<()> {
        self.check()?;
        self.users
            .lock()
            .unwrap()
            .insert(profile.user_id, profile.clone());
        Ok(())
    }

    async fn log_conversation(&self, entry: &ConversationLogEntry) -> anyhow::Result<()> {
        self.check()?;
        self.log.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn increment_daily_usage(&self, user_id: UserId, date: NaiveDate) -> anyhow::Result<()> {
        self.check()?;
        *self.usage.lock().unwrap().entry((user_id, date)).or_default() += 1;
        Ok(())
    }

    async fn daily_usage(&self, user_id: UserId, date: NaiveDate) -> anyhow::Result<u32> {
        self.check()?;
        Ok(self
            .usage
            .lock()
            .unwrap()
            .get(&(user_id, date))
            .copied()
            .unwrap_or(0))
    }
}

pub fn settings() -> RunSettings {
    RunSettings::default()
        .with_assistant_id("asst_test")
        .with_polling(Duration::from_secs(2), Duration::from_secs(300))
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
    ))
}

pub struct Harness {
    pub backend: Arc<ScriptedBackend>,
    pub clock: Arc<ManualClock>,
    pub sessions: Arc<SessionRegistry>,
    pub orchestrator: ConversationOrchestrator,
}

pub fn harness(backend: Arc<ScriptedBackend>) -> Harness {
    let clock = clock();
    let sessions = Arc::new(SessionRegistry::new());
    let usage = Arc::new(UsageTracker::new(clock.clone()));
    let runs = RunLifecycleController::new(backend.clone(), sessions.clone(), settings());
    Harness {
        backend,
        clock,
        sessions: sessions.clone(),
        orchestrator: ConversationOrchestrator::new(usage, sessions, runs),
    }
}

//! Per-message orchestration: quota, run, reply and feedback prompt.
//!
//! The `ConversationOrchestrator` is the entry point the chat transport calls
//! for every inbound text message.

use chrono::Utc;
use dpdrbot_core::{
    ConversationLogEntry, ConversationStore, OutboundMessage, ReplySink, UserId, UserProfile,
    suppresses_feedback_prompt,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::run::{Reply, RunLifecycleController};
use crate::session::SessionRegistry;
use crate::usage::{UsageReport, UsageTracker};

pub const LIMIT_REACHED: &str = "Has alcanzado tu límite diario de mensajes. 🚫\nUsa /plan para ver los planes disponibles y sus límites.";
pub const FEEDBACK_PROMPT: &str = "¿Te ha resultado útil esta respuesta?";
pub const FEEDBACK_KEYBOARD: [&str; 3] = ["👍 Útil", "👎 No útil", "❓ Nueva pregunta"];

/// A text message as received from the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub user_id: UserId,
    pub username: Option<String>,
    pub text: String,
}

impl InboundMessage {
    #[must_use]
    pub fn new(user_id: UserId, text: impl Into<String>) -> Self {
        Self {
            user_id,
            username: None,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lock table with one async mutex per user.
#[derive(Default)]
struct UserLocks {
    locks: StdMutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    async fn acquire(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let user_lock = Arc::clone(lock(&self.locks).entry(user_id).or_default());
        user_lock.lock_owned().await
    }
}

/// Serves inbound messages one user at a time.
pub struct ConversationOrchestrator {
    usage: Arc<UsageTracker>,
    sessions: Arc<SessionRegistry>,
    runs: RunLifecycleController,
    store: Option<Arc<dyn ConversationStore>>,
    quota_enabled: bool,
    locks: UserLocks,
    known_users: StdMutex<HashSet<UserId>>,
}

impl ConversationOrchestrator {
    #[must_use]
    pub fn new(
        usage: Arc<UsageTracker>,
        sessions: Arc<SessionRegistry>,
        runs: RunLifecycleController,
    ) -> Self {
        Self {
            usage,
            sessions,
            runs,
            store: None,
            quota_enabled: true,
            locks: UserLocks::default(),
            known_users: StdMutex::new(HashSet::new()),
        }
    }

    /// Attach a durable store for profiles, logs and usage counters.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub const fn with_quota(mut self, enabled: bool) -> Self {
        self.quota_enabled = enabled;
        self
    }

    #[must_use]
    pub const fn usage(&self) -> &Arc<UsageTracker> {
        &self.usage
    }

    #[must_use]
    pub const fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub async fn on_message(
        &self,
        message: InboundMessage,
        sink: &dyn ReplySink,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let user_id = message.user_id;
        let _guard = self.locks.acquire(user_id).await;

        self.ensure_profile(&message).await;

        if self.quota_enabled {
            if !self.usage.can_send(user_id) {
                info!("User {user_id} reached the daily message limit");
                sink.send(OutboundMessage::text(LIMIT_REACHED)).await?;
                return Ok(());
            }
            let record = self.usage.record_sent(user_id);
            if let Some(store) = &self.store {
                if let Err(err) = store.increment_daily_usage(user_id, record.date).await {
                    warn!("Failed to persist usage for user {user_id}: {err}");
                }
            }
        }

        let reply = self
            .runs
            .handle(user_id, &message.text, sink, cancel)
            .await;
        let text = reply.text();
        if text.is_empty() {
            debug!("No reply for user {user_id}");
            return Ok(());
        }

        sink.send(OutboundMessage::text(text.clone())).await?;

        if let (Reply::Answer(_), Some(store)) = (&reply, &self.store) {
            let entry = ConversationLogEntry {
                user_id,
                message: message.text.clone(),
                response: text,
                timestamp: Utc::now(),
            };
            if let Err(err) = store.log_conversation(&entry).await {
                warn!("Failed to log conversation for user {user_id}: {err}");
            }
        }

        if !suppresses_feedback_prompt(&message.text) {
            sink.send(OutboundMessage::text(FEEDBACK_PROMPT).with_keyboard([FEEDBACK_KEYBOARD]))
                .await?;
        }

        Ok(())
    }

    /// Forget the user's thread; the next content message opens a new one.
    pub async fn reset_session(&self, user_id: UserId) {
        let _guard = self.locks.acquire(user_id).await;
        self.sessions.clear(user_id).await;
        info!("Conversation reset for user {user_id}");
    }

    #[must_use]
    pub fn plan_report(&self, user_id: UserId) -> UsageReport {
        self.usage.report(user_id)
    }

    /// Load or register the user's profile the first time they are seen,
    /// and resume today's persisted message count.
    async fn ensure_profile(&self, message: &InboundMessage) {
        let Some(store) = &self.store else {
            return;
        };
        let user_id = message.user_id;
        if !lock(&self.known_users).insert(user_id) {
            return;
        }

        match store.daily_usage(user_id, self.usage.today()).await {
            Ok(0) => {}
            Ok(count) => {
                let record = self.usage.seed_today(user_id, count);
                debug!(
                    "Resumed {} message(s) for user {user_id} today",
                    record.message_count
                );
            }
            Err(err) => warn!("Failed to load usage for user {user_id}: {err}"),
        }

        match store.get_user(user_id).await {
            Ok(Some(profile)) => {
                if let Some(subscription) = profile.subscription {
                    debug!("Seeding {:?} subscription for user {user_id}", subscription.plan);
                    self.usage.set_subscription(user_id, subscription);
                }
            }
            Ok(None) => {
                let profile = UserProfile::new(user_id).with_username(message.username.clone());
                match store.upsert_user(&profile).await {
                    Ok(()) => info!("Registered new user {user_id}"),
                    Err(err) => warn!("Failed to register user {user_id}: {err}"),
                }
            }
            Err(err) => {
                warn!("Failed to load profile for user {user_id}: {err}");
                lock(&self.known_users).remove(&user_id);
            }
        }
    }
}

//! Optional durability layer for profiles, conversation logs and usage.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::{UserId, UserSubscription};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: Option<String>,
    pub subscription: Option<UserSubscription>,
}

impl UserProfile {
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            username: None,
            subscription: None,
        }
    }

    #[must_use]
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationLogEntry {
    pub user_id: UserId,
    pub message: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get_user(&self, user_id: UserId) -> anyhow::Result<Option<UserProfile>>;

    async fn upsert_user(&self, profile: &UserProfile) -> anyhow::Result<()>;

    async fn log_conversation(&self, entry: &ConversationLogEntry) -> anyhow::Result<()>;

    async fn increment_daily_usage(&self, user_id: UserId, date: NaiveDate) -> anyhow::Result<()>;

    /// Messages counted for `user_id` on `date`; zero when nothing was recorded.
    async fn daily_usage(&self, user_id: UserId, date: NaiveDate) -> anyhow::Result<u32>;
}

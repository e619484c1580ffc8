#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod backend;
pub mod classifier;
pub mod clock;
pub mod plan;
pub mod store;
pub mod usage;

pub use backend::{AssistantBackend, RunId, RunRequest, RunStatus, ThreadId, ThreadMessage};
pub use classifier::{
    Classification, FaqTemplate, FeedbackKind, classify, suppresses_feedback_prompt,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use plan::{Plan, PlanCatalog, PlanId, UnknownPlan, UserSubscription};
pub use store::{ConversationLogEntry, ConversationStore, UserProfile};
pub use usage::UsageRecord;

/// Chat-platform user identifier.
pub type UserId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Quick-reply keyboard: ordered rows of button labels.
pub type Keyboard = Vec<Vec<String>>;

/// One message the core wants delivered back to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl OutboundMessage {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    #[must_use]
    pub fn with_keyboard<R, S>(mut self, rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keyboard = Some(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        );
        self
    }
}

/// Delivery channel for replies to a single user.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> anyhow::Result<()>;
}

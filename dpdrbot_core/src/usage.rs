use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Counters for one user on one calendar day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageRecord {
    pub date: NaiveDate,
    pub message_count: u32,
    /// Tracked for reporting only; nothing increments or enforces it yet.
    pub token_count: u32,
}

impl UsageRecord {
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self {
            date,
            message_count: 0,
            token_count: 0,
        }
    }

    #[must_use]
    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.date >= today
    }
}

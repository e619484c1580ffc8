//! Per-user daily message quotas.

use chrono::NaiveDate;
use dpdrbot_core::{
    Clock, Plan, PlanCatalog, PlanId, UsageRecord, UserId, UserSubscription,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Snapshot used by the `/plan` report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageReport {
    pub plan: &'static Plan,
    pub usage: UsageRecord,
    /// The active paid subscription, if any.
    pub subscription: Option<UserSubscription>,
}

impl UsageReport {
    #[must_use]
    pub const fn remaining_messages(&self) -> u32 {
        self.plan
            .daily_message_limit
            .saturating_sub(self.usage.message_count)
    }
}

/// Owns usage records and subscriptions, partitioned by user.
pub struct UsageTracker {
    clock: Arc<dyn Clock>,
    usage: Mutex<HashMap<UserId, UsageRecord>>,
    subscriptions: Mutex<HashMap<UserId, UserSubscription>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The user's record for `today`, zeroed first if it belongs to an earlier day.
fn current(
    usage: &mut HashMap<UserId, UsageRecord>,
    user_id: UserId,
    today: NaiveDate,
) -> &mut UsageRecord {
    let record = usage
        .entry(user_id)
        .or_insert_with(|| UsageRecord::new(today));
    if !record.is_current(today) {
        debug!("Resetting daily usage for user {user_id}");
        *record = UsageRecord::new(today);
    }
    record
}

impl UsageTracker {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            usage: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Today's record, replacing a stale one with a zeroed record.
    pub fn get_or_create_today(&self, user_id: UserId) -> UsageRecord {
        let today = self.clock.today();
        *current(&mut lock(&self.usage), user_id, today)
    }

    pub fn can_send(&self, user_id: UserId) -> bool {
        let plan = PlanCatalog::resolve(self.effective_plan(user_id));
        self.get_or_create_today(user_id).message_count < plan.daily_message_limit
    }

    /// Raise today's count to at least `count`, e.g. from a persisted counter.
    pub fn seed_today(&self, user_id: UserId, count: u32) -> UsageRecord {
        let today = self.clock.today();
        let mut usage = lock(&self.usage);
        let record = current(&mut usage, user_id, today);
        record.message_count = record.message_count.max(count);
        *record
    }

    /// Count one accepted message against today's quota.
    pub fn record_sent(&self, user_id: UserId) -> UsageRecord {
        let today = self.clock.today();
        let mut usage = lock(&self.usage);
        let record = current(&mut usage, user_id, today);
        record.message_count = record.message_count.saturating_add(1);
        debug!(
            "User {user_id} has sent {} message(s) today",
            record.message_count
        );
        *record
    }

    pub fn effective_plan(&self, user_id: UserId) -> PlanId {
        self.active_subscription(user_id)
            .map_or(PlanId::Free, |sub| sub.plan)
    }

    pub fn active_subscription(&self, user_id: UserId) -> Option<UserSubscription> {
        let now = self.clock.now();
        lock(&self.subscriptions)
            .get(&user_id)
            .copied()
            .filter(|sub| sub.is_active(now))
    }

    /// Record a subscription granted by the upgrade flow.
    pub fn set_subscription(&self, user_id: UserId, subscription: UserSubscription) {
        lock(&self.subscriptions).insert(user_id, subscription);
    }

    pub fn report(&self, user_id: UserId) -> UsageReport {
        let subscription = self.active_subscription(user_id);
        UsageReport {
            plan: PlanCatalog::resolve(subscription.map_or(PlanId::Free, |sub| sub.plan)),
            usage: self.get_or_create_today(user_id),
            subscription,
        }
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}

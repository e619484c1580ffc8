//! Per-user mapping to a remote conversation thread.

use chrono::{DateTime, Utc};
use dpdrbot_core::{ThreadId, UserId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// A user's live conversation thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub thread: ThreadId,
    pub created_at: DateTime<Utc>,
}

type Slot = Arc<Mutex<Option<Session>>>;

/// Holds at most one session per user.
///
/// Each user gets a slot with its own lock, so creating a thread for one user
/// never waits on another user's remote call.
#[derive(Default)]
pub struct SessionRegistry {
    slots: Mutex<HashMap<UserId, Slot>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: UserId) -> Option<Session> {
        let slot = self.slots.lock().await.get(&user_id).cloned()?;
        let session = slot.lock().await.clone();
        session
    }

    /// Return the user's session, creating one with `factory` if absent.
    ///
    /// Concurrent callers for the same user wait on the first creation.
    pub async fn get_or_create<F, Fut>(
        &self,
        user_id: UserId,
        factory: F,
    ) -> anyhow::Result<Session>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<ThreadId>>,
    {
        let slot = {
            let mut slots = self.slots.lock().await;
            Arc::clone(slots.entry(user_id).or_default())
        };

        let mut guard = slot.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        let thread = factory().await?;
        info!("Opened thread {thread} for user {user_id}");
        let session = Session {
            thread,
            created_at: Utc::now(),
        };
        *guard = Some(session.clone());
        Ok(session)
    }

    /// Drop the user's session; a no-op when there is none.
    pub async fn clear(&self, user_id: UserId) {
        let Some(slot) = self.slots.lock().await.remove(&user_id) else {
            return;
        };
        let session = slot.lock().await.take();
        if let Some(session) = session {
            info!("Cleared thread {} for user {user_id}", session.thread);
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        let slots: Vec<Slot> = self.slots.lock().await.values().cloned().collect();
        let mut count = 0;
        for slot in slots {
            if slot.lock().await.is_some() {
                count += 1;
            }
        }
        count
    }

    #[cfg(test)]
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn thread(id: &str) -> ThreadId {
        ThreadId(id.to_string())
    }

    #[tokio::test]
    async fn get_or_create_reuses_existing_session() {
        let registry = SessionRegistry::new();
        let first = registry
            .get_or_create(1, || async { Ok(thread("t1")) })
            .await
            .unwrap();
        let second = registry
            .get_or_create(1, || async { Ok(thread("t2")) })
            .await
            .unwrap();
        assert_eq!(first.thread, second.thread);
        assert_eq!(registry.get(1).await.unwrap().thread, thread("t1"));
    }

    #[tokio::test]
    async fn failed_factory_leaves_no_session() {
        let registry = SessionRegistry::new();
        let result = registry
            .get_or_create(1, || async { Err(anyhow::anyhow!("backend down")) })
            .await;
        assert!(result.is_err());
        assert!(registry.get(1).await.is_none());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let registry = SessionRegistry::new();
        registry
            .get_or_create(1, || async { Ok(thread("t1")) })
            .await
            .unwrap();
        registry.clear(1).await;
        registry.clear(1).await;
        assert!(registry.get(1).await.is_none());
        assert!(registry.is_empty().await);

        let next = registry
            .get_or_create(1, || async { Ok(thread("t2")) })
            .await
            .unwrap();
        assert_eq!(next.thread, thread("t2"));
    }

    #[tokio::test]
    async fn concurrent_creation_opens_one_thread() {
        let registry = Arc::new(SessionRegistry::new());
        let created = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            let created = Arc::clone(&created);
            handles.push(tokio::spawn(async move {
                registry
                    .get_or_create(7, || async move {
                        let n = created.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok(ThreadId(format!("t{n}")))
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut threads = Vec::new();
        for handle in handles {
            threads.push(handle.await.unwrap().thread);
        }
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(threads.iter().all(|t| *t == threads[0]));
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let registry = SessionRegistry::new();
        registry
            .get_or_create(1, || async { Ok(thread("a")) })
            .await
            .unwrap();
        registry
            .get_or_create(2, || async { Ok(thread("b")) })
            .await
            .unwrap();
        registry.clear(1).await;
        assert!(registry.get(1).await.is_none());
        assert_eq!(registry.get(2).await.unwrap().thread, thread("b"));
        assert_eq!(registry.len().await, 1);
    }
}

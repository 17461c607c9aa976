//! Per-session turn serialization.

use std::sync::Arc;

use bl_core::SessionId;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per session id. Turns on the same session run one at a
/// time; different sessions never wait on each other.
///
/// Entries live only while a turn holds or waits for them.
#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: DashMap<SessionId, Arc<Mutex<()>>>,
}

/// Exclusive access to one session. Releases the lock on drop and removes
/// the table entry when nobody else is waiting for it.
#[derive(Debug)]
pub struct SessionTurn<'a> {
    locks: &'a SessionLocks,
    id: SessionId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionTurn<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // The table's own Arc is the last one left once no turn holds or awaits it.
        self.locks
            .locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl SessionLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`.
    pub async fn acquire(&self, id: SessionId) -> SessionTurn<'_> {
        // Clone the Arc out so the map shard is not held across the await.
        let lock = Arc::clone(self.locks.entry(id).or_default().value());
        let guard = lock.lock_owned().await;
        SessionTurn {
            locks: self,
            id,
            guard: Some(guard),
        }
    }

    /// Number of sessions with a turn running or waiting.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// True when no turn is running or waiting.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_session_waits() {
        let locks = Arc::new(SessionLocks::new());
        let id = SessionId::new();
        let turn = locks.acquire(id).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _turn = locks.acquire(id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        assert_eq!(locks.len(), 1);

        drop(turn);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn other_sessions_proceed() {
        let locks = SessionLocks::new();
        let _a = locks.acquire(SessionId::new()).await;
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(SessionId::new()))
            .await
            .expect("independent session should not block");
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn entries_go_away_after_the_turn() {
        let locks = SessionLocks::new();
        for _ in 0..100 {
            let _turn = locks.acquire(SessionId::new()).await;
        }
        assert!(locks.is_empty());
    }
}

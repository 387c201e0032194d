//! Per-User Serializer
//!
//! Process-wide map from user id to an async mutex. The coordinator takes
//! the user's mutex around its cross-step critical section (open -> commit
//! -> wallet call -> commit) so two concurrent operations on one user
//! observe each other's effects. Contention on different users does not
//! serialise.
//!
//! Mutexes are created lazily and live for the process lifetime. The manager
//! is injected as a dependency so tests can substitute their own instance
//! and a multi-replica deployment can swap in a distributed lock without
//! touching the coordinator.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::error::AppError;

/// Absolute ceiling on lock acquisition, regardless of caller deadline
const LOCK_CEILING: Duration = Duration::from_secs(5);

/// RAII guard for a user's serializer slot; released on drop
pub struct UserGuard {
    user_id: i64,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for UserGuard {
    fn drop(&mut self) {
        debug!(user_id = self.user_id, "Released user lock");
    }
}

/// Process-wide per-user mutual exclusion
pub struct UserLockManager {
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl UserLockManager {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Acquire the user's mutex.
    ///
    /// Fails with `LockTimeout` when the caller's deadline elapses or the
    /// absolute 5-second ceiling is reached, whichever comes first.
    pub async fn lock(
        &self,
        user_id: i64,
        deadline: Option<Duration>,
    ) -> Result<UserGuard, AppError> {
        let mutex = self.get_or_create(user_id);

        let timeout = match deadline {
            Some(d) => d.min(LOCK_CEILING),
            None => LOCK_CEILING,
        };

        match tokio::time::timeout(timeout, mutex.lock_owned()).await {
            Ok(guard) => {
                debug!(user_id, "Acquired user lock");
                Ok(UserGuard {
                    user_id,
                    _guard: guard,
                })
            }
            Err(_) => {
                warn!(user_id, timeout_ms = timeout.as_millis() as u64, "User lock timed out");
                Err(AppError::LockTimeout)
            }
        }
    }

    fn get_or_create(&self, user_id: i64) -> Arc<Mutex<()>> {
        self.locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl Default for UserLockManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lock_and_release() {
        let mgr = UserLockManager::new();

        let guard = mgr.lock(1, None).await.unwrap();
        drop(guard);

        // Re-acquire after release succeeds immediately
        let _guard = mgr.lock(1, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_contention_on_same_user_times_out() {
        let mgr = UserLockManager::new();

        let _held = mgr.lock(1, None).await.unwrap();
        let result = mgr.lock(1, Some(Duration::from_millis(50))).await;
        assert!(matches!(result, Err(AppError::LockTimeout)));
    }

    #[tokio::test]
    async fn test_different_users_do_not_serialise() {
        let mgr = UserLockManager::new();

        let _a = mgr.lock(1, None).await.unwrap();
        let _b = mgr.lock(2, Some(Duration::from_millis(50))).await.unwrap();
    }

    #[tokio::test]
    async fn test_caller_deadline_is_capped_by_ceiling() {
        let mgr = UserLockManager::new();
        let _held = mgr.lock(1, None).await.unwrap();

        // A deadline far beyond the ceiling must still give up at 5 s; probe
        // with a short wait and just assert the error shape.
        let start = std::time::Instant::now();
        let result = mgr.lock(1, Some(Duration::from_millis(20))).await;
        assert!(matches!(result, Err(AppError::LockTimeout)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_lock_serialises_critical_sections() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicI64, Ordering};

        let mgr = Arc::new(UserLockManager::new());
        let counter = Arc::new(AtomicI64::new(0));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let mgr = mgr.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let _guard = mgr.lock(7, None).await.unwrap();
                // Inside the critical section no other task may be present
                let in_section = counter.fetch_add(1, Ordering::SeqCst);
                assert_eq!(in_section, 0);
                tokio::time::sleep(Duration::from_millis(5)).await;
                counter.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for h in handles {
            h.await.unwrap();
        }
    }
}

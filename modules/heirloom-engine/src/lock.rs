// Named single-flight locks for scheduled jobs.
//
// Acquire is compare-and-set against the lock store: it fails when a live
// record exists, so a contending run skips its work entirely rather than
// waiting. The TTL backstops crashed holders — strictly longer than any
// expected job duration, so an expired record always means a dead run.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use tracing::{debug, error};
use uuid::Uuid;

use heirloom_common::LockRecord;
use heirloom_store::LockStore;

pub struct LockManager {
    store: Arc<dyn LockStore>,
    ttl: Duration,
}

impl LockManager {
    pub fn new(store: Arc<dyn LockStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Try to take the named lock. `false` means another holder is live and
    /// the caller must skip its run.
    pub async fn acquire(&self, name: &str) -> Result<bool> {
        let now = Utc::now();
        let record = LockRecord {
            name: name.to_string(),
            holder: Uuid::new_v4(),
            expires_at: now + self.ttl,
        };
        let held = self.store.try_acquire(&record, now).await?;
        debug!(name, held, holder = %record.holder, "Lock acquire attempt");
        Ok(held)
    }

    /// Drop the named lock unconditionally. Failures are logged, never
    /// propagated — release runs on every exit path and must not mask the
    /// job's own result.
    pub async fn release(&self, name: &str) {
        if let Err(e) = self.store.release(name).await {
            error!(name, error = %e, "Failed to release job lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heirloom_store::MemoryLockStore;

    fn manager(ttl_secs: i64) -> LockManager {
        LockManager::new(Arc::new(MemoryLockStore::new()), Duration::seconds(ttl_secs))
    }

    #[tokio::test]
    async fn second_acquire_fails_while_first_is_live() {
        let locks = manager(600);
        assert!(locks.acquire("classify").await.unwrap());
        assert!(!locks.acquire("classify").await.unwrap());
    }

    #[tokio::test]
    async fn release_makes_the_name_available_again() {
        let locks = manager(600);
        assert!(locks.acquire("classify").await.unwrap());
        locks.release("classify").await;
        assert!(locks.acquire("classify").await.unwrap());
    }

    #[tokio::test]
    async fn distinct_names_do_not_contend() {
        let locks = manager(600);
        assert!(locks.acquire("classify").await.unwrap());
        assert!(locks.acquire("rate").await.unwrap());
    }

    #[tokio::test]
    async fn expired_records_are_reclaimed() {
        // Zero TTL: the record is expired the moment it is written.
        let locks = manager(0);
        assert!(locks.acquire("classify").await.unwrap());
        assert!(locks.acquire("classify").await.unwrap());
    }
}

use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use heirloom_common::{
    AuditEvent, CanonicalPost, Classification, LockRecord, QualityRating, StoreCounts,
};

use crate::{LockStore, PostStore};

/// In-memory `PostStore`. Suitable for tests and single-instance deployments;
/// multi-instance deployments swap in a shared-store implementation behind
/// the same trait.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    posts: HashMap<String, CanonicalPost>,
    fingerprints: HashMap<String, String>,
    classifications: HashMap<String, Classification>,
    ratings: HashMap<String, QualityRating>,
    audits: Vec<AuditEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Audit events recorded so far, oldest first.
    pub async fn audit_events(&self) -> Vec<AuditEvent> {
        self.inner.lock().await.audits.clone()
    }
}

fn backlog_order(a: &CanonicalPost, b: &CanonicalPost) -> std::cmp::Ordering {
    a.scraped_at
        .cmp(&b.scraped_at)
        .then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn create_post(&self, post: &CanonicalPost) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.posts.contains_key(&post.id) {
            bail!("post {} already exists", post.id);
        }
        inner
            .fingerprints
            .insert(post.fingerprint.clone(), post.id.clone());
        inner.posts.insert(post.id.clone(), post.clone());
        Ok(())
    }

    async fn post_exists(&self, id: &str, fingerprint: &str) -> Result<bool> {
        let inner = self.inner.lock().await;
        Ok(inner.posts.contains_key(id) || inner.fingerprints.contains_key(fingerprint))
    }

    async fn fetch_unclassified(&self, limit: usize) -> Result<Vec<CanonicalPost>> {
        let inner = self.inner.lock().await;
        let mut backlog: Vec<CanonicalPost> = inner
            .posts
            .values()
            .filter(|p| !inner.classifications.contains_key(&p.id))
            .cloned()
            .collect();
        backlog.sort_by(backlog_order);
        backlog.truncate(limit);
        Ok(backlog)
    }

    async fn fetch_rating_candidates(
        &self,
        min_confidence: u8,
        limit: usize,
    ) -> Result<Vec<(CanonicalPost, Classification)>> {
        let inner = self.inner.lock().await;
        let mut candidates: Vec<(CanonicalPost, Classification)> = inner
            .classifications
            .values()
            .filter(|c| c.is_historic && c.confidence >= min_confidence)
            .filter(|c| !inner.ratings.contains_key(&c.post_id))
            .filter_map(|c| inner.posts.get(&c.post_id).map(|p| (p.clone(), c.clone())))
            .collect();
        candidates.sort_by(|a, b| backlog_order(&a.0, &b.0));
        candidates.truncate(limit);
        Ok(candidates)
    }

    async fn create_classification(&self, classification: &Classification) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.classifications.contains_key(&classification.post_id) {
            bail!("post {} is already classified", classification.post_id);
        }
        inner
            .classifications
            .insert(classification.post_id.clone(), classification.clone());
        Ok(())
    }

    async fn create_rating(&self, rating: &QualityRating) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.ratings.contains_key(&rating.post_id) {
            bail!("post {} is already rated", rating.post_id);
        }
        inner.ratings.insert(rating.post_id.clone(), rating.clone());
        Ok(())
    }

    async fn record_audit(&self, event: &AuditEvent) -> Result<()> {
        self.inner.lock().await.audits.push(event.clone());
        Ok(())
    }

    async fn recent_posts(&self, limit: usize) -> Result<Vec<CanonicalPost>> {
        let inner = self.inner.lock().await;
        let mut posts: Vec<CanonicalPost> = inner.posts.values().cloned().collect();
        posts.sort_by(|a, b| backlog_order(b, a));
        posts.truncate(limit);
        Ok(posts)
    }

    async fn counts(&self) -> Result<StoreCounts> {
        let inner = self.inner.lock().await;
        Ok(StoreCounts {
            posts: inner.posts.len() as u64,
            classified: inner.classifications.len() as u64,
            historic: inner
                .classifications
                .values()
                .filter(|c| c.is_historic)
                .count() as u64,
            rated: inner.ratings.len() as u64,
        })
    }
}

/// In-memory `LockStore` with the same compare-and-set contract a shared
/// store would honor.
#[derive(Default)]
pub struct MemoryLockStore {
    locks: Mutex<HashMap<String, LockRecord>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn try_acquire(&self, record: &LockRecord, now: DateTime<Utc>) -> Result<bool> {
        let mut locks = self.locks.lock().await;
        if let Some(existing) = locks.get(&record.name) {
            if !existing.is_expired(now) {
                return Ok(false);
            }
        }
        locks.insert(record.name.clone(), record.clone());
        Ok(true)
    }

    async fn release(&self, name: &str) -> Result<()> {
        self.locks.lock().await.remove(name);
        Ok(())
    }
}

// Persistence seams for the pipeline.
//
// PostStore is the external CRUD collaborator: the pipeline only depends on
// these call shapes, never on storage mechanics. LockStore backs the
// single-flight job locks with compare-and-set semantics.
//
// The in-memory implementations make every pipeline test deterministic:
// no network, no database.

mod memory;

pub use memory::{MemoryLockStore, MemoryStore};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use heirloom_common::{
    AuditEvent, CanonicalPost, Classification, LockRecord, QualityRating, StoreCounts,
};

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Persist a canonical post. Posts are immutable once stored.
    async fn create_post(&self, post: &CanonicalPost) -> Result<()>;

    /// Dedup check: does a post with this id or fingerprint already exist?
    async fn post_exists(&self, id: &str, fingerprint: &str) -> Result<bool>;

    /// Posts with no classification yet, oldest `scraped_at` first, ties
    /// broken by id. Deterministic ordering guarantees backlog coverage
    /// without starvation.
    async fn fetch_unclassified(&self, limit: usize) -> Result<Vec<CanonicalPost>>;

    /// Posts classified historic with confidence ≥ `min_confidence` and no
    /// rating yet. Same ordering contract as `fetch_unclassified`.
    async fn fetch_rating_candidates(
        &self,
        min_confidence: u8,
        limit: usize,
    ) -> Result<Vec<(CanonicalPost, Classification)>>;

    /// Attach a classification. At most one per post; created once, never
    /// overwritten.
    async fn create_classification(&self, classification: &Classification) -> Result<()>;

    /// Attach a quality rating. At most one per post.
    async fn create_rating(&self, rating: &QualityRating) -> Result<()>;

    /// Record a batch summary audit event.
    async fn record_audit(&self, event: &AuditEvent) -> Result<()>;

    /// Most recently scraped posts, newest first.
    async fn recent_posts(&self, limit: usize) -> Result<Vec<CanonicalPost>>;

    async fn counts(&self) -> Result<StoreCounts>;
}

#[async_trait]
pub trait LockStore: Send + Sync {
    /// Write `record` iff no unexpired record exists for its name; an expired
    /// record is replaced. Returns whether the write happened.
    async fn try_acquire(&self, record: &LockRecord, now: DateTime<Utc>) -> Result<bool>;

    /// Remove the record for `name` unconditionally.
    async fn release(&self, name: &str) -> Result<()>;
}

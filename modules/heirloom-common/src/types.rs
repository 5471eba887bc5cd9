use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scraped post before normalization, tagged by the source that produced it.
/// Transient: exists only between extraction and the normalization boundary.
/// Each variant has exactly one normalization path; nothing downstream of
/// `CanonicalPost` branches on the source again.
#[derive(Debug, Clone)]
pub enum RawPost {
    /// Captured from the live group feed through a browser session.
    LiveDom(LiveCapture),
    /// Returned by the batch scraping API (Apify dataset item).
    BatchApi(BatchRecord),
}

/// Raw fields pulled out of the live DOM for a single feed post.
#[derive(Debug, Clone, Default)]
pub struct LiveCapture {
    /// The post's `data-ft` attribute, a JSON blob that usually embeds the
    /// platform's own post identifiers.
    pub structured_id: Option<String>,
    /// An id recovered from the post's permalink, if one was found.
    pub fallback_id: Option<String>,
    /// The author link href exactly as it appeared in the DOM.
    pub author_href: Option<String>,
    /// Post body text, possibly still carrying interface chrome.
    pub text: String,
}

/// One dataset item from the batch scraping API.
#[derive(Debug, Clone, Default)]
pub struct BatchRecord {
    /// Post id as reported by the scraper, when present.
    pub post_id: Option<String>,
    /// Permalink URL for the post.
    pub url: Option<String>,
    pub text: Option<String>,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
}

/// The canonical, deduplicated record every source converges on.
/// Immutable once persisted; classification and rating attach by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPost {
    /// Stable post identity. Structured id when the platform provided one,
    /// otherwise a URL-embedded id, otherwise `hash_<fingerprint>`.
    pub id: String,
    /// Content digest over (text, author_link). Doubles as a dedup key.
    pub fingerprint: String,
    /// Cleaned post body.
    pub text: String,
    /// Canonicalized author profile URL, when one could be derived.
    pub author_link: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

/// AI classification verdict for one post. At most one per post;
/// absence means "unclassified".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub post_id: String,
    pub is_historic: bool,
    /// Clamped to [0, 100] before persisting.
    pub confidence: u8,
    pub reason: String,
    pub classified_at: DateTime<Utc>,
}

/// Quality rating for a post already classified historic with sufficient
/// confidence. At most one per post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityRating {
    pub post_id: String,
    /// Overall rating, 1-5.
    pub rating: u8,
    pub factors: RatingFactors,
    pub rated_at: DateTime<Utc>,
}

/// Per-dimension sub-scores, each 1-5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingFactors {
    pub narrative: u8,
    pub emotional: u8,
    pub historical: u8,
    pub uniqueness: u8,
}

/// Single-flight lock record. At most one unexpired record per name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRecord {
    pub name: String,
    pub holder: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl LockRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Summary of one scheduled batch run. Recorded only for batches where at
/// least one item succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    /// Job name, e.g. "classify" or "rate".
    pub job: String,
    pub processed: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub finished_at: DateTime<Utc>,
}

/// Store-wide counters for the stats endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreCounts {
    pub posts: u64,
    pub classified: u64,
    pub historic: u64,
    pub rated: u64,
}

/// Stats from one ingest cycle.
#[derive(Debug, Default)]
pub struct IngestStats {
    pub received: u32,
    pub skipped_empty: u32,
    pub duplicates: u32,
    pub stored: u32,
    pub failed: u32,
}

impl std::fmt::Display for IngestStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Ingest Cycle Complete ===")?;
        writeln!(f, "Posts received:   {}", self.received)?;
        writeln!(f, "Skipped (empty):  {}", self.skipped_empty)?;
        writeln!(f, "Duplicates:       {}", self.duplicates)?;
        writeln!(f, "Stored:           {}", self.stored)?;
        writeln!(f, "Failed:           {}", self.failed)?;
        Ok(())
    }
}

/// Stats from one classification or rating run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct JobStats {
    pub processed: u32,
    pub succeeded: u32,
    pub failed: u32,
    /// Items left untouched because the outbound quota refused further calls.
    pub deferred: u32,
}

impl std::fmt::Display for JobStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "processed={} succeeded={} failed={} deferred={}",
            self.processed, self.succeeded, self.failed, self.deferred
        )
    }
}

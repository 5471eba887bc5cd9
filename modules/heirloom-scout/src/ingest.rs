// Normalization boundary: every RawPost converges on CanonicalPost here.
//
// One function per source tag. Downstream code never sees the source again —
// the tagged variant ends at this module.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use heirloom_common::{
    canonical_author_link, clean_text, fingerprint, id_from_permalink, resolve_post_id,
    BatchRecord, CanonicalPost, IngestStats, LiveCapture, RawPost,
};
use heirloom_store::PostStore;

/// Reduce a raw post to its canonical record. `None` when nothing survives
/// cleaning — chrome-only captures carry no content worth keeping.
pub fn normalize_post(raw: RawPost, now: DateTime<Utc>) -> Option<CanonicalPost> {
    match raw {
        RawPost::LiveDom(capture) => normalize_live(capture, now),
        RawPost::BatchApi(record) => normalize_batch(record, now),
    }
}

fn normalize_live(capture: LiveCapture, now: DateTime<Utc>) -> Option<CanonicalPost> {
    let text = clean_text(&capture.text);
    if text.is_empty() {
        return None;
    }
    let author_link = capture
        .author_href
        .as_deref()
        .and_then(canonical_author_link);
    let id = resolve_post_id(
        capture.structured_id.as_deref(),
        capture.fallback_id.as_deref(),
        &text,
        author_link.as_deref(),
    );
    Some(CanonicalPost {
        fingerprint: fingerprint(&text, author_link.as_deref()),
        id,
        text,
        author_link,
        scraped_at: now,
    })
}

fn normalize_batch(record: BatchRecord, now: DateTime<Utc>) -> Option<CanonicalPost> {
    let text = clean_text(record.text.as_deref().unwrap_or_default());
    if text.is_empty() {
        return None;
    }
    let author_link = record
        .author_url
        .as_deref()
        .and_then(canonical_author_link);
    // The batch API reports a plain post id; a permalink-embedded id backs
    // it up when the field is missing.
    let url_id = record.url.as_deref().and_then(id_from_permalink);
    let id = resolve_post_id(
        record.post_id.as_deref(),
        url_id.as_deref(),
        &text,
        author_link.as_deref(),
    );
    Some(CanonicalPost {
        fingerprint: fingerprint(&text, author_link.as_deref()),
        id,
        text,
        author_link,
        scraped_at: now,
    })
}

/// Normalize and persist a batch of raw posts, deduplicating against the
/// store by id and fingerprint. Per-item store failures are logged and
/// skipped; one bad item never aborts the cycle.
pub async fn ingest_posts(
    store: &dyn PostStore,
    raw_posts: Vec<RawPost>,
    now: DateTime<Utc>,
) -> Result<IngestStats> {
    let mut stats = IngestStats {
        received: raw_posts.len() as u32,
        ..Default::default()
    };

    for raw in raw_posts {
        let Some(post) = normalize_post(raw, now) else {
            stats.skipped_empty += 1;
            continue;
        };

        match store.post_exists(&post.id, &post.fingerprint).await {
            Ok(true) => {
                debug!(post_id = %post.id, "Duplicate post, skipping");
                stats.duplicates += 1;
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(post_id = %post.id, error = %e, "Dedup check failed, skipping item");
                stats.failed += 1;
                continue;
            }
        }

        match store.create_post(&post).await {
            Ok(()) => stats.stored += 1,
            Err(e) => {
                warn!(post_id = %post.id, error = %e, "Failed to store post");
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use heirloom_store::MemoryStore;

    fn live(structured_id: Option<&str>, author: Option<&str>, text: &str) -> RawPost {
        RawPost::LiveDom(LiveCapture {
            structured_id: structured_id.map(String::from),
            fallback_id: None,
            author_href: author.map(String::from),
            text: text.to_string(),
        })
    }

    fn batch(post_id: Option<&str>, url: Option<&str>, text: &str) -> RawPost {
        RawPost::BatchApi(BatchRecord {
            post_id: post_id.map(String::from),
            url: url.map(String::from),
            text: Some(text.to_string()),
            author_name: None,
            author_url: None,
            posted_at: None,
        })
    }

    #[test]
    fn live_posts_normalize_to_canonical() {
        let raw = live(
            Some(r#"{"top_level_post_id":"987654321"}"#),
            Some("/stories/1234567890/abc/?__cft__=x"),
            "See more\nThe flour mill before the fire.\nLike\nComment\n5 comments",
        );
        let post = normalize_post(raw, Utc::now()).unwrap();
        assert_eq!(post.id, "987654321");
        assert_eq!(post.text, "The flour mill before the fire.");
        assert_eq!(
            post.author_link.as_deref(),
            Some("https://www.facebook.com/profile.php?id=1234567890")
        );
        assert_eq!(post.fingerprint, fingerprint(&post.text, post.author_link.as_deref()));
    }

    #[test]
    fn batch_posts_normalize_to_canonical() {
        let raw = batch(
            Some("b-123"),
            Some("https://www.facebook.com/groups/9/posts/555/"),
            "Photo of Main Street, 1935.",
        );
        let post = normalize_post(raw, Utc::now()).unwrap();
        assert_eq!(post.id, "b-123");
        assert_eq!(post.text, "Photo of Main Street, 1935.");
    }

    #[test]
    fn batch_posts_fall_back_to_url_embedded_id() {
        let raw = batch(
            None,
            Some("https://www.facebook.com/groups/9/posts/555/"),
            "Photo of Main Street, 1935.",
        );
        let post = normalize_post(raw, Utc::now()).unwrap();
        assert_eq!(post.id, "555");
    }

    #[test]
    fn chrome_only_posts_normalize_to_none() {
        assert!(normalize_post(live(None, None, "Like\nComment\nShare"), Utc::now()).is_none());
        assert!(normalize_post(batch(None, None, ""), Utc::now()).is_none());
    }

    #[test]
    fn both_sources_converge_on_the_same_identity() {
        let now = Utc::now();
        let text = "The schoolhouse on County Road 7.";
        let a = normalize_post(live(None, None, text), now).unwrap();
        let b = normalize_post(batch(None, None, text), now).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.fingerprint, b.fingerprint);
    }

    #[tokio::test]
    async fn ingest_dedups_by_fingerprint() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let text = "The schoolhouse on County Road 7.";

        // Same content arriving from both sources: one record survives.
        let stats = ingest_posts(
            &store,
            vec![live(None, None, text), batch(None, None, text)],
            now,
        )
        .await
        .unwrap();

        assert_eq!(stats.received, 2);
        assert_eq!(stats.stored, 1);
        assert_eq!(stats.duplicates, 1);
    }

    #[tokio::test]
    async fn ingest_counts_skipped_empty_items() {
        let store = MemoryStore::new();
        let stats = ingest_posts(
            &store,
            vec![
                live(None, None, "Like\nShare"),
                live(None, None, "A real memory of the old arena."),
            ],
            Utc::now(),
        )
        .await
        .unwrap();
        assert_eq!(stats.skipped_empty, 1);
        assert_eq!(stats.stored, 1);
    }
}

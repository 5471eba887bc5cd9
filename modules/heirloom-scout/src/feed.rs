// Live-DOM extraction of the group feed.
//
// Walks the rendered feed through the selector chains and produces RawPost
// items. A post that loses every field lookup is skipped, never fatal to the
// cycle: graceful degradation on unseen markup is the contract here.

use std::time::Duration;

use tracing::{debug, info, warn};

use heirloom_common::{structured_id_value, HeirloomError, LiveCapture, RawPost};

use crate::capture::{capture_text, InterceptCache};
use crate::driver::{ElementRef, PageDriver};
use crate::selector::{query_all_first, query_within_first, wait_first};
use crate::selectors;

const FEED_WAIT: Duration = Duration::from_secs(15);

/// Scrape up to `limit` posts from the live group feed.
pub async fn scrape_feed(
    driver: &dyn PageDriver,
    cache: &InterceptCache,
    limit: usize,
) -> Result<Vec<RawPost>, HeirloomError> {
    let feed = wait_first(driver, selectors::FEED_ROOT, FEED_WAIT)
        .await
        .map_err(|e| HeirloomError::Scraping(format!("group feed never appeared: {e}")))?;
    debug!(matched = %feed.matched, "Feed container located");

    let posts = query_all_first(driver, selectors::POST)
        .await
        .map_err(|e| HeirloomError::Extraction(format!("no post containers in feed: {e}")))?;
    debug!(matched = %posts.matched, count = posts.value.len(), "Post containers located");

    let mut raw = Vec::new();
    for container in posts.value.iter().take(limit) {
        match extract_post(driver, container, cache).await {
            Some(capture) => raw.push(RawPost::LiveDom(capture)),
            None => debug!("Post skipped: no usable fields"),
        }
    }

    // Interception entries are only valid for the cycle that observed them.
    cache.clear();

    info!(scraped = raw.len(), "Live feed scrape complete");
    Ok(raw)
}

/// Pull one post's raw fields out of its container. Every field lookup
/// degrades independently; only a missing body kills the item.
async fn extract_post(
    driver: &dyn PageDriver,
    container: &ElementRef,
    cache: &InterceptCache,
) -> Option<LiveCapture> {
    let structured_id = match driver.attribute(container, "data-ft").await {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "data-ft read failed");
            None
        }
    };

    // The interception cache is keyed by the platform post id.
    let id_hint = structured_id.as_deref().and_then(structured_id_value);

    let body = match query_within_first(driver, container, selectors::POST_BODY).await {
        Ok(resolved) => resolved.value.into_iter().next(),
        Err(e) => {
            debug!(error = %e, "Post body chain exhausted, reading container text");
            None
        }
    };
    let text_root = body.as_ref().unwrap_or(container);

    let text = match capture_text(driver, text_root, id_hint.as_deref(), cache).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => return None,
        Err(e) => {
            warn!(error = %e, "Post text capture failed");
            return None;
        }
    };

    let author_href = match query_within_first(driver, container, selectors::AUTHOR_LINK).await {
        Ok(resolved) => first_href(driver, &resolved.value).await,
        Err(e) => {
            debug!(error = %e, "Author link chain exhausted");
            None
        }
    };

    let fallback_id = match query_within_first(driver, container, selectors::PERMALINK).await {
        Ok(resolved) => match first_href(driver, &resolved.value).await {
            Some(href) => heirloom_common::id_from_permalink(&href),
            None => None,
        },
        Err(_) => None,
    };

    Some(LiveCapture {
        structured_id,
        fallback_id,
        author_href,
        text,
    })
}

async fn first_href(driver: &dyn PageDriver, elements: &[ElementRef]) -> Option<String> {
    for element in elements {
        if let Ok(Some(href)) = driver.attribute(element, "href").await {
            if !href.is_empty() {
                return Some(href);
            }
        }
    }
    None
}

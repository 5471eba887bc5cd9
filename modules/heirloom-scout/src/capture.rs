// Full-text capture for truncated posts.
//
// Two paths to the full body: programmatically expanding every "see more"
// affordance and reading the DOM, or the interception cache — full text
// observed in network responses while the feed loaded. The network-observed
// text is authoritative over whatever the DOM currently renders.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use crate::driver::{DriverError, ElementRef, PageDriver};
use crate::selector::query_within_first;
use crate::selectors;

/// Clicking see-more can reveal nested truncation; bounded so a
/// misbehaving page can't loop us.
const MAX_EXPANSION_ROUNDS: usize = 3;

/// Full post text observed via passive network interception, keyed by post
/// id. Cleared explicitly between scrape cycles: entries must never leak
/// into the next cycle.
#[derive(Default)]
pub struct InterceptCache {
    entries: Mutex<HashMap<String, String>>,
}

impl InterceptCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record full text for a post id seen in intercepted traffic.
    pub fn record(&self, post_id: impl Into<String>, text: impl Into<String>) {
        self.entries.lock().unwrap().insert(post_id.into(), text.into());
    }

    pub fn get(&self, post_id: &str) -> Option<String> {
        self.entries.lock().unwrap().get(post_id).cloned()
    }

    /// Drop every entry. Called between scrape cycles.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

/// Expand every see-more affordance under `root`. Returns how many were
/// clicked. Failures to click individual affordances are skipped; partial
/// expansion still beats truncated text.
pub async fn expand_truncated(driver: &dyn PageDriver, root: &ElementRef) -> usize {
    let mut clicked = 0;
    for _ in 0..MAX_EXPANSION_ROUNDS {
        let Ok(found) = query_within_first(driver, root, selectors::SEE_MORE).await else {
            break;
        };
        let mut clicked_this_round = 0;
        for affordance in &found.value {
            if driver.click_element(affordance).await.is_ok() {
                clicked_this_round += 1;
            }
        }
        if clicked_this_round == 0 {
            break;
        }
        clicked += clicked_this_round;
    }
    if clicked > 0 {
        debug!(clicked, "Expanded truncated content");
    }
    clicked
}

/// Read the full text of a post: interception cache first, expanded DOM
/// text as the fallback.
pub async fn capture_text(
    driver: &dyn PageDriver,
    root: &ElementRef,
    post_id: Option<&str>,
    cache: &InterceptCache,
) -> Result<String, DriverError> {
    if let Some(id) = post_id {
        if let Some(full) = cache.get(id) {
            debug!(post_id = id, "Using intercepted full text");
            return Ok(full);
        }
    }
    expand_truncated(driver, root).await;
    driver.inner_text(root).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDriver;

    #[tokio::test]
    async fn prefers_intercepted_text_over_dom() {
        let driver = MockDriver::new();
        let post = driver.add_element_with_text("div.post", "p1", "truncated…");
        let cache = InterceptCache::new();
        cache.record("42", "the whole story, every word of it");

        let text = capture_text(&driver, &post, Some("42"), &cache)
            .await
            .unwrap();
        assert_eq!(text, "the whole story, every word of it");
    }

    #[tokio::test]
    async fn falls_back_to_expanded_dom_text() {
        let driver = MockDriver::new();
        let post = driver.add_element_with_text("div.post", "p1", "now the full text");
        driver.add_children(&post, "div.see_more_link_inner", &["sm1"]);
        let cache = InterceptCache::new();

        let text = capture_text(&driver, &post, Some("42"), &cache)
            .await
            .unwrap();
        assert_eq!(text, "now the full text");
        // The affordance was clicked before reading.
        assert!(driver.element_clicks().contains(&"sm1".to_string()));
    }

    #[tokio::test]
    async fn expansion_is_bounded() {
        let driver = MockDriver::new();
        let post = driver.add_element_with_text("div.post", "p1", "text");
        // An affordance that never disappears would loop forever unbounded.
        driver.add_children(&post, "div.see_more_link_inner", &["sticky"]);

        let clicked = expand_truncated(&driver, &post).await;
        assert_eq!(clicked, MAX_EXPANSION_ROUNDS);
    }

    #[test]
    fn cache_clears_between_cycles() {
        let cache = InterceptCache::new();
        cache.record("a", "x");
        cache.record("b", "y");
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }
}

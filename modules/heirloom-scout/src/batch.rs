// Batch-source adapter: Apify group-scraper dataset items → RawPost.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use apify_client::{ApifyClient, GroupPost};
use heirloom_common::{BatchRecord, RawPost};

/// Convert one dataset item into the tagged raw shape the normalizer takes.
pub fn into_raw(post: GroupPost) -> RawPost {
    let (author_name, author_url) = match post.user {
        Some(user) => (user.name, user.profile_url),
        None => (None, None),
    };
    RawPost::BatchApi(BatchRecord {
        post_id: post.post_id,
        url: post.url,
        text: post.text,
        author_name,
        author_url,
        posted_at: post
            .time
            .as_deref()
            .and_then(|t| t.parse::<DateTime<Utc>>().ok()),
    })
}

/// Pull one batch of group posts from the scraping API.
pub async fn fetch_group_posts(
    client: &ApifyClient,
    group_url: &str,
    limit: u32,
) -> Result<Vec<RawPost>> {
    let posts = client.scrape_group_posts(group_url, limit).await?;
    info!(count = posts.len(), "Batch source returned posts");
    Ok(posts.into_iter().map(into_raw).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use apify_client::GroupPostAuthor;

    #[test]
    fn dataset_items_map_to_batch_records() {
        let post = GroupPost {
            post_id: Some("123".to_string()),
            url: Some("https://www.facebook.com/groups/9/posts/123/".to_string()),
            text: Some("The ferry landing, summer of 1948.".to_string()),
            time: Some("2026-08-01T12:00:00Z".to_string()),
            user: Some(GroupPostAuthor {
                id: Some("777".to_string()),
                name: Some("Jane".to_string()),
                profile_url: Some("https://www.facebook.com/user/777/".to_string()),
            }),
            likes: Some(4),
            comments: Some(1),
            shares: None,
        };

        let RawPost::BatchApi(record) = into_raw(post) else {
            panic!("expected batch record");
        };
        assert_eq!(record.post_id.as_deref(), Some("123"));
        assert_eq!(
            record.author_url.as_deref(),
            Some("https://www.facebook.com/user/777/")
        );
        assert!(record.posted_at.is_some());
    }

    #[test]
    fn missing_fields_stay_absent() {
        let RawPost::BatchApi(record) = into_raw(GroupPost::default()) else {
            panic!("expected batch record");
        };
        assert!(record.post_id.is_none());
        assert!(record.text.is_none());
        assert!(record.author_url.is_none());
        assert!(record.posted_at.is_none());
    }
}

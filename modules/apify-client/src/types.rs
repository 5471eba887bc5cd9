use serde::{Deserialize, Serialize};

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Metadata for one actor run.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
}

/// Input for the apify/facebook-groups-scraper actor.
#[derive(Debug, Clone, Serialize)]
pub struct GroupScraperInput {
    #[serde(rename = "startUrls")]
    pub start_urls: Vec<StartUrl>,
    #[serde(rename = "resultsLimit")]
    pub results_limit: u32,
}

/// A start URL entry for scraper input.
#[derive(Debug, Clone, Serialize)]
pub struct StartUrl {
    pub url: String,
}

/// Author info nested inside a group post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupPostAuthor {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "profileUrl")]
    pub profile_url: Option<String>,
}

/// One group post from the scraper's dataset. Fields beyond these exist in
/// the dataset but are not consumed by this pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupPost {
    #[serde(rename = "postId")]
    pub post_id: Option<String>,
    pub url: Option<String>,
    pub text: Option<String>,
    pub time: Option<String>,
    pub user: Option<GroupPostAuthor>,
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub shares: Option<i64>,
}

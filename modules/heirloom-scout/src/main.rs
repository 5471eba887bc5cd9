use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use apify_client::ApifyClient;
use heirloom_common::Config;
use heirloom_scout::ingest_posts;
use heirloom_store::MemoryStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("heirloom=info".parse()?))
        .init();

    let config = Config::from_env();

    if config.apify_api_key.is_empty() {
        warn!("APIFY_API_KEY not set, nothing to ingest");
        return Ok(());
    }
    let apify = ApifyClient::new(config.apify_api_key.clone());

    info!(group_url = %config.group_url, "Starting ingest cycle");
    let raw = heirloom_scout::batch::fetch_group_posts(
        &apify,
        &config.group_url,
        config.batch_scrape_limit,
    )
    .await?;

    let store = MemoryStore::new();
    let stats = ingest_posts(&store, raw, Utc::now()).await?;
    info!("{stats}");

    Ok(())
}

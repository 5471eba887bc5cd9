use std::env;

/// Application configuration loaded from environment variables.
/// Every tunable has a default; only secrets are required.
#[derive(Debug, Clone)]
pub struct Config {
    // AI provider
    pub openai_api_key: String,
    pub ai_model: String,
    pub ai_timeout_secs: u64,
    pub ai_max_attempts: u32,
    pub ai_retry_base_ms: u64,

    // Batch scraping (optional; batch source disabled when empty)
    pub apify_api_key: String,
    pub group_url: String,
    pub batch_scrape_limit: u32,

    // Jobs
    pub classify_batch_size: usize,
    pub rating_batch_size: usize,
    pub min_rating_confidence: u8,
    pub lock_ttl_secs: i64,

    // Limiters
    pub api_rate_window_secs: i64,
    pub api_rate_max: u32,
    pub daily_quota_max: u32,
    pub trust_loopback: bool,

    // Web server
    pub api_host: String,
    pub api_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            openai_api_key: required_env("OPENAI_API_KEY"),
            ai_model: env_or("AI_MODEL", "gpt-4o-mini"),
            ai_timeout_secs: parse_env("AI_TIMEOUT_SECS", 30),
            ai_max_attempts: parse_env("AI_MAX_ATTEMPTS", 3),
            ai_retry_base_ms: parse_env("AI_RETRY_BASE_MS", 500),
            apify_api_key: env::var("APIFY_API_KEY").unwrap_or_default(),
            group_url: env_or("GROUP_URL", "https://www.facebook.com/groups/000000000000000"),
            batch_scrape_limit: parse_env("BATCH_SCRAPE_LIMIT", 50),
            classify_batch_size: parse_env("CLASSIFY_BATCH_SIZE", 10),
            rating_batch_size: parse_env("RATING_BATCH_SIZE", 5),
            min_rating_confidence: parse_env("MIN_RATING_CONFIDENCE", 70),
            lock_ttl_secs: parse_env("LOCK_TTL_SECS", 600),
            api_rate_window_secs: parse_env("API_RATE_WINDOW_SECS", 60),
            api_rate_max: parse_env("API_RATE_MAX", 30),
            daily_quota_max: parse_env("DAILY_QUOTA_MAX", 200),
            trust_loopback: parse_env("TRUST_LOOPBACK", true),
            api_host: env_or("API_HOST", "0.0.0.0"),
            api_port: parse_env("API_PORT", 3000),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid {}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}

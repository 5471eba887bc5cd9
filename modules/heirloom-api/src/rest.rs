use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use tracing::warn;

use heirloom_common::{Config, Decision, FixedWindowLimiter};
use heirloom_engine::JobOutcome;

use crate::AppState;

/// Inbound limiter for the API namespace. Loopback callers bypass it when
/// `TRUST_LOOPBACK` is set (the non-production default).
pub fn build_limiter(config: &Config) -> FixedWindowLimiter {
    let limiter = FixedWindowLimiter::new(
        "api",
        chrono::Duration::seconds(config.api_rate_window_secs),
        config.api_rate_max,
    );
    if config.trust_loopback {
        limiter.with_allow_list(vec!["127.0.0.1".to_string(), "::1".to_string()])
    } else {
        limiter
    }
}

/// Evaluate the limiter before handling. `Some(response)` is the finished
/// 429; `None` means proceed to the handler.
async fn check_rate_limit(state: &AppState, addr: SocketAddr) -> Option<Response> {
    let key = addr.ip().to_string();
    match state.limiter.lock().await.check(&key, Utc::now()) {
        Decision::Allowed => None,
        Decision::Refused {
            reason,
            retry_after,
        } => {
            let retry_secs = retry_after.num_seconds().max(1);
            Some(
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, retry_secs.to_string())],
                    Json(serde_json::json!({"success": false, "message": reason})),
                )
                    .into_response(),
            )
        }
    }
}

pub async fn health(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    if let Some(rejection) = check_rate_limit(&state, addr).await {
        return rejection;
    }
    Json(serde_json::json!({"status": "ok"})).into_response()
}

pub async fn recent_posts(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    if let Some(rejection) = check_rate_limit(&state, addr).await {
        return rejection;
    }
    match state.store.recent_posts(50).await {
        Ok(posts) => Json(serde_json::json!({"success": true, "posts": posts})).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to read recent posts");
            internal_error()
        }
    }
}

pub async fn stats(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    if let Some(rejection) = check_rate_limit(&state, addr).await {
        return rejection;
    }
    match state.store.counts().await {
        Ok(counts) => Json(serde_json::json!({"success": true, "counts": counts})).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to read store counts");
            internal_error()
        }
    }
}

pub async fn trigger_classify(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    if let Some(rejection) = check_rate_limit(&state, addr).await {
        return rejection;
    }
    job_response("classify", state.engine.run_classification().await)
}

pub async fn trigger_rate(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    if let Some(rejection) = check_rate_limit(&state, addr).await {
        return rejection;
    }
    job_response("rate", state.engine.run_rating().await)
}

fn job_response(job: &str, result: anyhow::Result<JobOutcome>) -> Response {
    match result {
        Ok(outcome) => {
            Json(serde_json::json!({"success": true, "job": job, "outcome": outcome}))
                .into_response()
        }
        Err(e) => {
            warn!(job, error = %e, "Job trigger failed");
            internal_error()
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"success": false, "message": "internal error"})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    use ai_client::AiClient;
    use heirloom_engine::{engine::EngineSettings, Engine, RetryPolicy};
    use heirloom_store::{MemoryLockStore, MemoryStore, PostStore};

    fn test_state(max: u32, trust_loopback: bool) -> Arc<AppState> {
        let store: Arc<dyn PostStore> = Arc::new(MemoryStore::new());
        let engine = Engine::new(
            store.clone(),
            Arc::new(MemoryLockStore::new()),
            Arc::new(AiClient::new("test-key")),
            EngineSettings {
                model: "test-model".to_string(),
                classify_batch_size: 10,
                rating_batch_size: 5,
                min_rating_confidence: 70,
                lock_ttl: chrono::Duration::seconds(600),
                ai_timeout: StdDuration::from_secs(5),
                retry: RetryPolicy::immediate(1),
                daily_quota_max: 100,
            },
        );
        let mut limiter =
            FixedWindowLimiter::new("api", chrono::Duration::seconds(60), max);
        if trust_loopback {
            limiter = limiter.with_allow_list(vec!["127.0.0.1".to_string()]);
        }
        Arc::new(AppState {
            store,
            engine,
            limiter: tokio::sync::Mutex::new(limiter),
        })
    }

    fn caller(ip: &str) -> SocketAddr {
        format!("{ip}:50000").parse().unwrap()
    }

    #[tokio::test]
    async fn requests_over_the_window_get_429_with_retry_after() {
        let state = test_state(2, false);
        let addr = caller("203.0.113.5");

        for _ in 0..2 {
            let response = recent_posts(State(state.clone()), ConnectInfo(addr)).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = recent_posts(State(state.clone()), ConnectInfo(addr)).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let retry_after: i64 = response
            .headers()
            .get(header::RETRY_AFTER)
            .expect("Retry-After header present")
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(retry_after > 0);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().unwrap().contains("rate limit"));
    }

    #[tokio::test]
    async fn loopback_bypasses_the_limiter_when_trusted() {
        let state = test_state(1, true);
        let addr = caller("127.0.0.1");

        for _ in 0..5 {
            let response = stats(State(state.clone()), ConnectInfo(addr)).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn distinct_callers_have_distinct_windows() {
        let state = test_state(1, false);

        let first = recent_posts(State(state.clone()), ConnectInfo(caller("198.51.100.1"))).await;
        assert_eq!(first.status(), StatusCode::OK);
        let second = recent_posts(State(state.clone()), ConnectInfo(caller("198.51.100.2"))).await;
        assert_eq!(second.status(), StatusCode::OK);
        let third = recent_posts(State(state.clone()), ConnectInfo(caller("198.51.100.1"))).await;
        assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}

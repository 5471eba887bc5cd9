use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

/// Prune the window map once it grows past this many caller keys.
const PRUNE_THRESHOLD: usize = 1024;

/// One counting window for a caller key.
#[derive(Debug, Clone)]
struct WindowRecord {
    window_start: DateTime<Utc>,
    count: u32,
}

/// Outcome of a limiter check. Refusal is policy, not a fault: callers
/// translate it into a 429 or a deferred batch, never an error path.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Allowed,
    Refused {
        reason: String,
        /// Time remaining in the caller's current window.
        retry_after: Duration,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Fixed-window request counter keyed by caller. One instance per namespace
/// (inbound API protection, outbound daily quota); state is process-local by
/// design — soft abuse protection, not billing-grade accounting.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    namespace: String,
    window: Duration,
    max: u32,
    allow_list: Vec<String>,
    windows: HashMap<String, WindowRecord>,
}

impl FixedWindowLimiter {
    pub fn new(namespace: impl Into<String>, window: Duration, max: u32) -> Self {
        Self {
            namespace: namespace.into(),
            window,
            max,
            allow_list: Vec::new(),
            windows: HashMap::new(),
        }
    }

    /// Caller keys that bypass the limiter entirely (e.g. loopback in
    /// non-production configuration).
    pub fn with_allow_list(mut self, keys: Vec<String>) -> Self {
        self.allow_list = keys;
        self
    }

    /// Count one request for `key`. Starts a fresh window when none exists or
    /// the current one has elapsed; otherwise increments and refuses once the
    /// count exceeds the maximum.
    pub fn check(&mut self, key: &str, now: DateTime<Utc>) -> Decision {
        if self.allow_list.iter().any(|k| k == key) {
            return Decision::Allowed;
        }

        if self.windows.len() > PRUNE_THRESHOLD {
            let window = self.window;
            self.windows.retain(|_, rec| now - rec.window_start < window);
        }

        if let Some(rec) = self.windows.get_mut(key) {
            if now - rec.window_start < self.window {
                rec.count += 1;
                if rec.count <= self.max {
                    return Decision::Allowed;
                }
                let retry_after = self.window - (now - rec.window_start);
                tracing::debug!(
                    namespace = %self.namespace,
                    key,
                    count = rec.count,
                    "Rate limit exceeded"
                );
                return Decision::Refused {
                    reason: format!(
                        "rate limit exceeded for {}: max {} requests per {}s",
                        self.namespace,
                        self.max,
                        self.window.num_seconds()
                    ),
                    retry_after,
                };
            }
        }

        // No record, or the window elapsed: this request opens a new window.
        self.windows.insert(
            key.to_string(),
            WindowRecord {
                window_start: now,
                count: 1,
            },
        );
        Decision::Allowed
    }
}

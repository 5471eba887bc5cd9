// Batch orchestration for the scheduled jobs.
//
// Each job: take its single-flight lock (skip the run on contention), pull a
// deterministic batch from the store, process items strictly sequentially
// through the AI collaborator, absorb per-item failures, and record one audit
// event when at least one item succeeded. The daily quota is consulted before
// every AI call; a refusal defers the remainder of the batch to the next run.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ai_client::CompletionClient;
use heirloom_common::{AuditEvent, Config, Decision, FixedWindowLimiter, JobStats};
use heirloom_store::{LockStore, PostStore};

use crate::classifier::Classifier;
use crate::lock::LockManager;
use crate::rater::Rater;
use crate::retry::RetryPolicy;

const CLASSIFY_LOCK: &str = "classify";
const RATE_LOCK: &str = "rate";
const QUOTA_NAMESPACE: &str = "ai-quota";
const QUOTA_KEY: &str = "engine";

/// Engine tunables, decoupled from env loading so tests can build them
/// directly.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub model: String,
    pub classify_batch_size: usize,
    pub rating_batch_size: usize,
    pub min_rating_confidence: u8,
    pub lock_ttl: chrono::Duration,
    pub ai_timeout: Duration,
    pub retry: RetryPolicy,
    pub daily_quota_max: u32,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.ai_model.clone(),
            classify_batch_size: config.classify_batch_size,
            rating_batch_size: config.rating_batch_size,
            min_rating_confidence: config.min_rating_confidence,
            lock_ttl: chrono::Duration::seconds(config.lock_ttl_secs),
            ai_timeout: Duration::from_secs(config.ai_timeout_secs),
            retry: RetryPolicy {
                max_attempts: config.ai_max_attempts,
                base_delay: Duration::from_millis(config.ai_retry_base_ms),
            },
            daily_quota_max: config.daily_quota_max,
        }
    }
}

/// How a scheduled run ended. Lock contention is a skip, not an error.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Completed { stats: JobStats },
    Skipped,
}

pub struct Engine {
    store: Arc<dyn PostStore>,
    locks: LockManager,
    classifier: Classifier,
    rater: Rater,
    quota: Mutex<FixedWindowLimiter>,
    classify_batch_size: usize,
    rating_batch_size: usize,
    min_rating_confidence: u8,
}

impl Engine {
    pub fn new(
        store: Arc<dyn PostStore>,
        lock_store: Arc<dyn LockStore>,
        ai: Arc<dyn CompletionClient>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            locks: LockManager::new(lock_store, settings.lock_ttl),
            classifier: Classifier::new(
                ai.clone(),
                settings.model.clone(),
                settings.retry.clone(),
                settings.ai_timeout,
            ),
            rater: Rater::new(ai, settings.model, settings.retry, settings.ai_timeout),
            quota: Mutex::new(FixedWindowLimiter::new(
                QUOTA_NAMESPACE,
                chrono::Duration::hours(24),
                settings.daily_quota_max,
            )),
            classify_batch_size: settings.classify_batch_size,
            rating_batch_size: settings.rating_batch_size,
            min_rating_confidence: settings.min_rating_confidence,
        }
    }

    /// Run one classification batch over the unclassified backlog.
    pub async fn run_classification(&self) -> Result<JobOutcome> {
        if !self.locks.acquire(CLASSIFY_LOCK).await? {
            info!("Another classification run is in progress, skipping");
            return Ok(JobOutcome::Skipped);
        }

        let result = self.classify_inner().await;

        // Always release, however the run exited.
        self.locks.release(CLASSIFY_LOCK).await;
        result
    }

    async fn classify_inner(&self) -> Result<JobOutcome> {
        let batch = self
            .store
            .fetch_unclassified(self.classify_batch_size)
            .await?;
        if batch.is_empty() {
            debug!("No unclassified posts, nothing to do");
            return Ok(JobOutcome::Completed {
                stats: JobStats::default(),
            });
        }

        let total = batch.len();
        let mut stats = JobStats::default();

        for (index, post) in batch.iter().enumerate() {
            if !self.quota_allows().await {
                stats.deferred = (total - index) as u32;
                break;
            }
            stats.processed += 1;

            match self.classifier.classify(post).await {
                Ok(classification) => {
                    match self.store.create_classification(&classification).await {
                        Ok(()) => {
                            debug!(
                                post_id = %post.id,
                                is_historic = classification.is_historic,
                                confidence = classification.confidence,
                                "Post classified"
                            );
                            stats.succeeded += 1;
                        }
                        Err(e) => {
                            warn!(post_id = %post.id, error = %e, "Failed to persist classification");
                            stats.failed += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!(post_id = %post.id, error = %e, "Classification failed, continuing batch");
                    stats.failed += 1;
                }
            }
        }

        self.finish_job("classify", &stats).await;
        Ok(JobOutcome::Completed { stats })
    }

    /// Run one rating batch over historic posts above the confidence
    /// threshold.
    pub async fn run_rating(&self) -> Result<JobOutcome> {
        if !self.locks.acquire(RATE_LOCK).await? {
            info!("Another rating run is in progress, skipping");
            return Ok(JobOutcome::Skipped);
        }

        let result = self.rate_inner().await;

        self.locks.release(RATE_LOCK).await;
        result
    }

    async fn rate_inner(&self) -> Result<JobOutcome> {
        let batch = self
            .store
            .fetch_rating_candidates(self.min_rating_confidence, self.rating_batch_size)
            .await?;
        if batch.is_empty() {
            debug!("No rating candidates, nothing to do");
            return Ok(JobOutcome::Completed {
                stats: JobStats::default(),
            });
        }

        let total = batch.len();
        let mut stats = JobStats::default();

        for (index, (post, classification)) in batch.iter().enumerate() {
            if !self.quota_allows().await {
                stats.deferred = (total - index) as u32;
                break;
            }
            stats.processed += 1;

            match self.rater.rate(post).await {
                Ok(rating) => match self.store.create_rating(&rating).await {
                    Ok(()) => {
                        debug!(
                            post_id = %post.id,
                            rating = rating.rating,
                            confidence = classification.confidence,
                            "Post rated"
                        );
                        stats.succeeded += 1;
                    }
                    Err(e) => {
                        warn!(post_id = %post.id, error = %e, "Failed to persist rating");
                        stats.failed += 1;
                    }
                },
                Err(e) => {
                    warn!(post_id = %post.id, error = %e, "Rating failed, continuing batch");
                    stats.failed += 1;
                }
            }
        }

        self.finish_job("rate", &stats).await;
        Ok(JobOutcome::Completed { stats })
    }

    async fn quota_allows(&self) -> bool {
        match self.quota.lock().await.check(QUOTA_KEY, Utc::now()) {
            Decision::Allowed => true,
            Decision::Refused {
                reason,
                retry_after,
            } => {
                warn!(
                    %reason,
                    retry_after_secs = retry_after.num_seconds(),
                    "Daily quota refused further AI calls, deferring rest of batch"
                );
                false
            }
        }
    }

    /// Emit the batch audit event — only when something actually succeeded.
    async fn finish_job(&self, job: &str, stats: &JobStats) {
        info!(job, %stats, "Batch run complete");
        if stats.succeeded == 0 {
            return;
        }
        let event = AuditEvent {
            id: Uuid::new_v4(),
            job: job.to_string(),
            processed: stats.processed,
            succeeded: stats.succeeded,
            failed: stats.failed,
            finished_at: Utc::now(),
        };
        if let Err(e) = self.store.record_audit(&event).await {
            warn!(job, error = %e, "Failed to record audit event");
        }
    }
}

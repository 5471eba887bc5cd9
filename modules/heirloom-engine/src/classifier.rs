use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use ai_client::{response_schema, AiError, CompletionClient, CompletionRequest};
use heirloom_common::{CanonicalPost, Classification};

use crate::retry::{with_retry, RetryPolicy};

/// How one item can fail inside a batch. Every variant is absorbed by the
/// engine: logged, counted, and the batch moves on.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("AI call failed: {0}")]
    Call(#[from] AiError),

    #[error("response is not valid JSON: {0}")]
    Parse(String),

    #[error("response failed validation: {0}")]
    Validation(String),
}

/// What the model must return for a classification.
#[derive(Debug, Deserialize, JsonSchema)]
#[allow(dead_code)]
pub struct ClassificationResponse {
    /// Whether the post shares local history (photos, memories, documents of
    /// the area's past) rather than current events or chatter.
    pub is_historic: bool,
    /// Confidence in the verdict, 0-100.
    pub confidence: i64,
    /// One or two sentences explaining the verdict.
    pub reason: String,
}

const CLASSIFY_SYSTEM_PROMPT: &str = r#"You are reviewing posts from a community group dedicated to a town's local history.

Decide whether each post is a HISTORIC post: it shares or asks about the area's past. Historic posts include:
- Old photographs, postcards, maps, newspaper clippings
- Personal memories of former businesses, buildings, schools, events
- Family histories and genealogy tied to the area
- Questions about what used to stand at a location

NOT historic:
- Current events, road closures, lost pets, items for sale
- Present-day photos with no historical angle
- Administrative posts, greetings, jokes

Return:
- is_historic: your verdict
- confidence: 0-100, how certain you are
- reason: one or two sentences, concrete, referencing the post"#;

pub struct Classifier {
    ai: Arc<dyn CompletionClient>,
    model: String,
    policy: RetryPolicy,
    timeout: Duration,
}

impl Classifier {
    pub fn new(
        ai: Arc<dyn CompletionClient>,
        model: impl Into<String>,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            ai,
            model: model.into(),
            policy,
            timeout,
        }
    }

    /// Classify one post. The AI call runs through the retry controller with
    /// a per-call timeout; the returned content is parsed and validated here
    /// because the service is not trusted to honor its schema.
    pub async fn classify(&self, post: &CanonicalPost) -> Result<Classification, ItemError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            temperature: Some(0.0),
            system_prompt: CLASSIFY_SYSTEM_PROMPT.to_string(),
            user_content: format!("Post:\n\n{}", post.text),
            response_schema: response_schema::<ClassificationResponse>(),
        };

        let timeout = self.timeout;
        let response = with_retry(&self.policy, AiError::is_retryable, || async {
            match tokio::time::timeout(timeout, self.ai.complete(&request)).await {
                Ok(result) => result,
                Err(_) => Err(AiError::Timeout(timeout.as_secs())),
            }
        })
        .await?;

        debug!(post_id = %post.id, "Classification response received");
        parse_classification(&response.content, &post.id)
    }
}

/// Parse and validate the model's content string.
pub(crate) fn parse_classification(
    content: &str,
    post_id: &str,
) -> Result<Classification, ItemError> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| ItemError::Parse(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| ItemError::Validation("expected a JSON object".to_string()))?;

    let is_historic = obj
        .get("is_historic")
        .and_then(Value::as_bool)
        .ok_or_else(|| ItemError::Validation("is_historic must be a boolean".to_string()))?;
    let reason = obj
        .get("reason")
        .and_then(Value::as_str)
        .ok_or_else(|| ItemError::Validation("reason must be a string".to_string()))?
        .to_string();
    let confidence = clamp_confidence(obj.get("confidence"));

    Ok(Classification {
        post_id: post_id.to_string(),
        is_historic,
        confidence,
        reason,
        classified_at: Utc::now(),
    })
}

/// Clamp law for confidence: round to the nearest integer within [0, 100];
/// anything non-numeric (or NaN) becomes 0.
pub fn clamp_confidence(value: Option<&Value>) -> u8 {
    let Some(n) = value.and_then(Value::as_f64) else {
        return 0;
    };
    if n.is_nan() {
        return 0;
    }
    n.round().clamp(0.0, 100.0) as u8
}

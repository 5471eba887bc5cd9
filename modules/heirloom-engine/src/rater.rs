use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use ai_client::{response_schema, AiError, CompletionClient, CompletionRequest};
use heirloom_common::{CanonicalPost, QualityRating, RatingFactors};

use crate::classifier::ItemError;
use crate::retry::{with_retry, RetryPolicy};

/// What the model must return for a quality rating.
#[derive(Debug, Deserialize, JsonSchema)]
#[allow(dead_code)]
pub struct RatingResponse {
    /// Overall quality, 1-5.
    pub rating: i64,
    pub factors: FactorScores,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[allow(dead_code)]
pub struct FactorScores {
    /// How well the post tells a story, 1-5.
    pub narrative: i64,
    /// Emotional resonance, 1-5.
    pub emotional: i64,
    /// Historical substance and specificity, 1-5.
    pub historical: i64,
    /// How rarely this kind of material surfaces, 1-5.
    pub uniqueness: i64,
}

const RATE_SYSTEM_PROMPT: &str = r#"You are rating the quality of a local-history post that has already been confirmed historic.

Score the post 1-5 overall, and 1-5 on each factor:
- narrative: does it tell a story, or just drop a fact?
- emotional: will longtime residents feel something reading it?
- historical: concrete dates, names, places, verifiable substance
- uniqueness: rare material (private photos, firsthand memories) scores high; recycled clippings score low

Anchors: 1 = bare mention of the past; 3 = solid post with some substance; 5 = exceptional material that belongs in an archive.

Return rating and all four factor scores as integers from 1 to 5."#;

pub struct Rater {
    ai: Arc<dyn CompletionClient>,
    model: String,
    policy: RetryPolicy,
    timeout: Duration,
}

impl Rater {
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

    /// Rate one historic post. Same retry/timeout/validation discipline as
    /// classification; scores outside 1-5 are a validation failure because
    /// no clamp policy is defined for ratings.
    pub async fn rate(&self, post: &CanonicalPost) -> Result<QualityRating, ItemError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            temperature: Some(0.0),
            system_prompt: RATE_SYSTEM_PROMPT.to_string(),
            user_content: format!("Post:\n\n{}", post.text),
            response_schema: response_schema::<RatingResponse>(),
        };

        let timeout = self.timeout;
        let response = with_retry(&self.policy, AiError::is_retryable, || async {
            match tokio::time::timeout(timeout, self.ai.complete(&request)).await {
                Ok(result) => result,
                Err(_) => Err(AiError::Timeout(timeout.as_secs())),
            }
        })
        .await?;

        debug!(post_id = %post.id, "Rating response received");
        parse_rating(&response.content, &post.id)
    }
}

pub(crate) fn parse_rating(content: &str, post_id: &str) -> Result<QualityRating, ItemError> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| ItemError::Parse(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| ItemError::Validation("expected a JSON object".to_string()))?;

    let rating = score_field(obj.get("rating"), "rating")?;
    let factors = obj
        .get("factors")
        .and_then(Value::as_object)
        .ok_or_else(|| ItemError::Validation("factors must be an object".to_string()))?;

    Ok(QualityRating {
        post_id: post_id.to_string(),
        rating,
        factors: RatingFactors {
            narrative: score_field(factors.get("narrative"), "narrative")?,
            emotional: score_field(factors.get("emotional"), "emotional")?,
            historical: score_field(factors.get("historical"), "historical")?,
            uniqueness: score_field(factors.get("uniqueness"), "uniqueness")?,
        },
        rated_at: Utc::now(),
    })
}

/// A score must be an integer in [1, 5]; anything else fails validation.
fn score_field(value: Option<&Value>, name: &str) -> Result<u8, ItemError> {
    let n = value
        .and_then(Value::as_i64)
        .ok_or_else(|| ItemError::Validation(format!("{name} must be an integer")))?;
    if !(1..=5).contains(&n) {
        return Err(ItemError::Validation(format!(
            "{name} must be between 1 and 5, got {n}"
        )));
    }
    Ok(n as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"{"rating": 4, "factors": {"narrative": 4, "emotional": 3, "historical": 5, "uniqueness": 4}}"#;

    #[test]
    fn valid_content_parses() {
        let r = parse_rating(GOOD, "p1").unwrap();
        assert_eq!(r.rating, 4);
        assert_eq!(r.factors.historical, 5);
    }

    #[test]
    fn out_of_range_scores_fail_validation() {
        for content in [
            r#"{"rating": 0, "factors": {"narrative": 4, "emotional": 3, "historical": 5, "uniqueness": 4}}"#,
            r#"{"rating": 6, "factors": {"narrative": 4, "emotional": 3, "historical": 5, "uniqueness": 4}}"#,
            r#"{"rating": 4, "factors": {"narrative": 9, "emotional": 3, "historical": 5, "uniqueness": 4}}"#,
        ] {
            assert!(matches!(
                parse_rating(content, "p1").unwrap_err(),
                ItemError::Validation(_)
            ));
        }
    }

    #[test]
    fn fractional_scores_fail_validation() {
        let content = r#"{"rating": 3.5, "factors": {"narrative": 4, "emotional": 3, "historical": 5, "uniqueness": 4}}"#;
        assert!(matches!(
            parse_rating(content, "p1").unwrap_err(),
            ItemError::Validation(_)
        ));
    }

    #[test]
    fn missing_factor_fails_validation() {
        let content = r#"{"rating": 4, "factors": {"narrative": 4, "emotional": 3, "historical": 5}}"#;
        assert!(matches!(
            parse_rating(content, "p1").unwrap_err(),
            ItemError::Validation(_)
        ));
    }

    #[test]
    fn non_json_fails_parse() {
        assert!(matches!(
            parse_rating("five stars", "p1").unwrap_err(),
            ItemError::Parse(_)
        ));
    }
}

// Scripted CompletionClient for engine tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use ai_client::{AiError, CompletionClient, CompletionRequest, CompletionResponse};

/// Returns scripted responses in order; falls back to a constant when the
/// script runs dry (if one was set), otherwise fails the call.
pub struct MockCompletion {
    script: Mutex<VecDeque<Result<String, AiError>>>,
    fallback: Option<String>,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: None,
        }
    }

    /// Every call returns `content`.
    pub fn constant(content: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(content.to_string()),
        }
    }

    pub fn push_content(&self, content: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(content.to_string()));
    }

    pub fn push_error(&self, error: AiError) {
        self.script.lock().unwrap().push_back(Err(error));
    }
}

#[async_trait]
impl CompletionClient for MockCompletion {
    async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse, AiError> {
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(content)) => Ok(CompletionResponse { content }),
            Some(Err(e)) => Err(e),
            None => match &self.fallback {
                Some(content) => Ok(CompletionResponse {
                    content: content.clone(),
                }),
                None => Err(AiError::Api {
                    status: 500,
                    message: "mock script exhausted".to_string(),
                }),
            },
        }
    }
}

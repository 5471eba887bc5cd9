use thiserror::Error;

pub type Result<T> = std::result::Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Empty completion: no content in response")]
    Empty,

    #[error("Request timed out after {0}s")]
    Timeout(u64),
}

impl AiError {
    /// Whether a retry could plausibly succeed. Network faults, timeouts,
    /// throttling and server-side errors are transient; client errors
    /// (validation, authentication) are terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            AiError::Network(_) | AiError::Timeout(_) | AiError::Empty => true,
            AiError::Api { status, .. } => *status == 408 || *status == 429 || *status >= 500,
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        AiError::Network(err.to_string())
    }
}

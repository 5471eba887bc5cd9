// The browser-session collaborator interface.
//
// Session and login management live outside this repository; the pipeline
// only needs these primitives. An implementation typically wraps a CDP or
// WebDriver connection. MockDriver (tests) implements the same trait for
// deterministic extraction tests.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Opaque handle to a DOM element, owned by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no element matched selector {selector:?}")]
    NotFound { selector: String },

    #[error("timed out after {waited_ms}ms waiting for selector {selector:?}")]
    Timeout { selector: String, waited_ms: u64 },

    #[error("driver backend error: {0}")]
    Backend(String),
}

impl DriverError {
    /// Timeout-shaped failures are the only kind a wait chain may fall
    /// through on; everything else propagates.
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout { .. })
    }
}

#[async_trait]
pub trait PageDriver: Send + Sync {
    /// All elements matching `selector` in the current document.
    /// An empty result is Ok — "no match" is data, not an error.
    async fn query(&self, selector: &str) -> Result<Vec<ElementRef>, DriverError>;

    /// All elements matching `selector` under `root`.
    async fn query_within(
        &self,
        root: &ElementRef,
        selector: &str,
    ) -> Result<Vec<ElementRef>, DriverError>;

    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<(), DriverError>;

    /// Click a previously resolved element.
    async fn click_element(&self, element: &ElementRef) -> Result<(), DriverError>;

    /// Clear and type into the first element matching `selector`.
    async fn fill(&self, selector: &str, value: &str) -> Result<(), DriverError>;

    /// Wait until `selector` matches, up to `timeout`.
    async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementRef, DriverError>;

    /// Rendered text content of an element.
    async fn inner_text(&self, element: &ElementRef) -> Result<String, DriverError>;

    /// Attribute value of an element, if present.
    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, DriverError>;
}

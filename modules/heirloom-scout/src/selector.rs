// Ordered-fallback selector resolution.
//
// The group feed's markup changes often; every lookup runs against a chain
// of candidate selectors (newest markup first, legacy shapes behind it) and
// the first candidate that produces something wins. A chain fails only when
// every candidate is exhausted, and the error then carries what each
// candidate reported.

use std::time::Duration;

use thiserror::Error;

use crate::driver::{DriverError, ElementRef, PageDriver};

/// A successful resolution plus which candidate produced it. The matched
/// candidate is logged by callers so selector rot shows up in the logs
/// before chains start exhausting.
#[derive(Debug)]
pub struct Resolved<T> {
    pub value: T,
    pub matched: String,
}

#[derive(Debug, Error)]
pub enum SelectorError {
    /// Every candidate in the chain failed.
    #[error("selector chain exhausted ({tried} candidates): {detail}")]
    Exhausted { tried: usize, detail: String },

    /// A non-timeout driver failure inside a wait chain. Propagated
    /// immediately instead of falling through to the next candidate.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

fn exhausted(attempts: Vec<(&str, String)>) -> SelectorError {
    let detail = attempts
        .iter()
        .map(|(candidate, err)| format!("{candidate:?}: {err}"))
        .collect::<Vec<_>>()
        .join("; ");
    SelectorError::Exhausted {
        tried: attempts.len(),
        detail,
    }
}

/// First candidate with at least one match; returns all of its elements.
pub async fn query_all_first(
    driver: &dyn PageDriver,
    candidates: &[&str],
) -> Result<Resolved<Vec<ElementRef>>, SelectorError> {
    let mut attempts = Vec::new();
    for candidate in candidates {
        match driver.query(candidate).await {
            Ok(elements) if !elements.is_empty() => {
                return Ok(Resolved {
                    value: elements,
                    matched: (*candidate).to_string(),
                });
            }
            Ok(_) => attempts.push((*candidate, "no match".to_string())),
            Err(e) => attempts.push((*candidate, e.to_string())),
        }
    }
    Err(exhausted(attempts))
}

/// First candidate with at least one match; returns its first element.
pub async fn query_first(
    driver: &dyn PageDriver,
    candidates: &[&str],
) -> Result<Resolved<ElementRef>, SelectorError> {
    let resolved = query_all_first(driver, candidates).await?;
    let element = resolved
        .value
        .into_iter()
        .next()
        .expect("query_all_first returns non-empty matches");
    Ok(Resolved {
        value: element,
        matched: resolved.matched,
    })
}

/// Scoped variant of `query_all_first`.
pub async fn query_within_first(
    driver: &dyn PageDriver,
    root: &ElementRef,
    candidates: &[&str],
) -> Result<Resolved<Vec<ElementRef>>, SelectorError> {
    let mut attempts = Vec::new();
    for candidate in candidates {
        match driver.query_within(root, candidate).await {
            Ok(elements) if !elements.is_empty() => {
                return Ok(Resolved {
                    value: elements,
                    matched: (*candidate).to_string(),
                });
            }
            Ok(_) => attempts.push((*candidate, "no match".to_string())),
            Err(e) => attempts.push((*candidate, e.to_string())),
        }
    }
    Err(exhausted(attempts))
}

/// Click through the chain: any per-candidate failure falls through.
pub async fn click_first(
    driver: &dyn PageDriver,
    candidates: &[&str],
) -> Result<Resolved<()>, SelectorError> {
    let mut attempts = Vec::new();
    for candidate in candidates {
        match driver.click(candidate).await {
            Ok(()) => {
                return Ok(Resolved {
                    value: (),
                    matched: (*candidate).to_string(),
                });
            }
            Err(e) => attempts.push((*candidate, e.to_string())),
        }
    }
    Err(exhausted(attempts))
}

/// Fill through the chain: any per-candidate failure falls through.
pub async fn fill_first(
    driver: &dyn PageDriver,
    candidates: &[&str],
    value: &str,
) -> Result<Resolved<()>, SelectorError> {
    let mut attempts = Vec::new();
    for candidate in candidates {
        match driver.fill(candidate, value).await {
            Ok(()) => {
                return Ok(Resolved {
                    value: (),
                    matched: (*candidate).to_string(),
                });
            }
            Err(e) => attempts.push((*candidate, e.to_string())),
        }
    }
    Err(exhausted(attempts))
}

/// Wait through the chain. A timeout on one candidate moves to the next;
/// any other driver failure propagates immediately.
pub async fn wait_first(
    driver: &dyn PageDriver,
    candidates: &[&str],
    timeout: Duration,
) -> Result<Resolved<ElementRef>, SelectorError> {
    let mut attempts = Vec::new();
    for candidate in candidates {
        match driver.wait_for(candidate, timeout).await {
            Ok(element) => {
                return Ok(Resolved {
                    value: element,
                    matched: (*candidate).to_string(),
                });
            }
            Err(e) if e.is_timeout() => attempts.push((*candidate, e.to_string())),
            Err(e) => return Err(SelectorError::Driver(e)),
        }
    }
    Err(exhausted(attempts))
}

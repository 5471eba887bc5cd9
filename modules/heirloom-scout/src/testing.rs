// Deterministic PageDriver for extraction tests: selectors resolve against
// registered elements, nothing touches a real browser.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::driver::{DriverError, ElementRef, PageDriver};

#[derive(Default)]
pub struct MockDriver {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    elements: HashMap<String, Vec<ElementRef>>,
    children: HashMap<(String, String), Vec<ElementRef>>,
    texts: HashMap<String, String>,
    attributes: HashMap<(String, String), String>,
    broken: HashSet<String>,
    clicks: Vec<String>,
    element_clicks: Vec<String>,
    fills: Vec<(String, String)>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_elements(&self, selector: &str, ids: &[&str]) {
        let mut state = self.state.lock().unwrap();
        let entry = state.elements.entry(selector.to_string()).or_default();
        entry.extend(ids.iter().map(|id| ElementRef(id.to_string())));
    }

    pub fn add_element_with_text(&self, selector: &str, id: &str, text: &str) -> ElementRef {
        let element = ElementRef(id.to_string());
        let mut state = self.state.lock().unwrap();
        state
            .elements
            .entry(selector.to_string())
            .or_default()
            .push(element.clone());
        state.texts.insert(id.to_string(), text.to_string());
        element
    }

    pub fn add_children(&self, parent: &ElementRef, selector: &str, ids: &[&str]) {
        let mut state = self.state.lock().unwrap();
        let entry = state
            .children
            .entry((parent.0.clone(), selector.to_string()))
            .or_default();
        entry.extend(ids.iter().map(|id| ElementRef(id.to_string())));
    }

    pub fn set_attribute(&self, element: &ElementRef, name: &str, value: &str) {
        self.state
            .lock()
            .unwrap()
            .attributes
            .insert((element.0.clone(), name.to_string()), value.to_string());
    }

    pub fn set_text(&self, element: &ElementRef, text: &str) {
        self.state
            .lock()
            .unwrap()
            .texts
            .insert(element.0.clone(), text.to_string());
    }

    /// Make a selector fail with a backend error on every operation.
    pub fn break_selector(&self, selector: &str) {
        self.state.lock().unwrap().broken.insert(selector.to_string());
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn element_clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().element_clicks.clone()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().fills.clone()
    }

    fn check_broken(&self, selector: &str) -> Result<(), DriverError> {
        if self.state.lock().unwrap().broken.contains(selector) {
            return Err(DriverError::Backend(format!(
                "synthetic failure for {selector}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn query(&self, selector: &str) -> Result<Vec<ElementRef>, DriverError> {
        self.check_broken(selector)?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .elements
            .get(selector)
            .cloned()
            .unwrap_or_default())
    }

    async fn query_within(
        &self,
        root: &ElementRef,
        selector: &str,
    ) -> Result<Vec<ElementRef>, DriverError> {
        self.check_broken(selector)?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .children
            .get(&(root.0.clone(), selector.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        self.check_broken(selector)?;
        let mut state = self.state.lock().unwrap();
        let has_match = state
            .elements
            .get(selector)
            .map(|e| !e.is_empty())
            .unwrap_or(false);
        if !has_match {
            return Err(DriverError::NotFound {
                selector: selector.to_string(),
            });
        }
        state.clicks.push(selector.to_string());
        Ok(())
    }

    async fn click_element(&self, element: &ElementRef) -> Result<(), DriverError> {
        self.state
            .lock()
            .unwrap()
            .element_clicks
            .push(element.0.clone());
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), DriverError> {
        self.check_broken(selector)?;
        let mut state = self.state.lock().unwrap();
        let has_match = state
            .elements
            .get(selector)
            .map(|e| !e.is_empty())
            .unwrap_or(false);
        if !has_match {
            return Err(DriverError::NotFound {
                selector: selector.to_string(),
            });
        }
        state.fills.push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementRef, DriverError> {
        self.check_broken(selector)?;
        let first = self
            .state
            .lock()
            .unwrap()
            .elements
            .get(selector)
            .and_then(|e| e.first().cloned());
        first.ok_or(DriverError::Timeout {
            selector: selector.to_string(),
            waited_ms: timeout.as_millis() as u64,
        })
    }

    async fn inner_text(&self, element: &ElementRef) -> Result<String, DriverError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .texts
            .get(&element.0)
            .cloned()
            .unwrap_or_default())
    }

    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .attributes
            .get(&(element.0.clone(), name.to_string()))
            .cloned())
    }
}

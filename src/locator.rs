use std::sync::Arc;
use std::time::Duration;

use tokio::task;
use tracing::debug;

use crate::element::UiElement;
use crate::engine::{self, UiBridge};
use crate::errors::AutomationError;
use crate::selector::Selector;

// Default timeout if none is specified on the locator itself
const DEFAULT_LOCATOR_TIMEOUT: Duration = Duration::from_secs(10);

/// A high-level API for finding and interacting with UI elements.
#[derive(Clone)]
pub struct Locator {
    bridge: Arc<dyn UiBridge>,
    selector: Selector,
    timeout: Duration,
    poll_interval: Duration,
}

impl Locator {
    pub(crate) fn new(
        bridge: Arc<dyn UiBridge>,
        selector: Selector,
        poll_interval: Duration,
    ) -> Self {
        Self {
            bridge,
            selector,
            timeout: DEFAULT_LOCATOR_TIMEOUT,
            poll_interval,
        }
    }

    /// Set a default timeout for waiting operations on this locator instance.
    /// This timeout is used if no specific timeout is passed to `wait`.
    pub fn set_default_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wait for an element matching the locator to appear, up to the
    /// specified timeout. If no timeout is provided, uses the locator's
    /// default timeout.
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<UiElement, AutomationError> {
        debug!(selector = %self.selector, "waiting for element");
        let effective_timeout = timeout.unwrap_or(self.timeout);

        // The engine's find_element is a blocking call that already handles
        // polling and the deadline, so it runs on a blocking task rather than
        // being wrapped in another async loop.
        let bridge = self.bridge.clone();
        let selector = self.selector.clone();
        let poll_interval = self.poll_interval;

        task::spawn_blocking(move || {
            engine::find_element(&bridge, &selector, effective_timeout, poll_interval)
        })
        .await
        .map_err(|e| AutomationError::Internal(format!("Task join error: {e}")))?
        .map_err(|e| {
            // The engine returns ElementNotFound once the deadline passes;
            // surface that as the timeout condition it is.
            if e.is_not_found() {
                AutomationError::Timeout(format!(
                    "Timed out after {effective_timeout:?} waiting for element {:?}",
                    self.selector
                ))
            } else {
                e
            }
        })
    }

    /// Wait for the element and click it.
    pub async fn click(&self, timeout: Option<Duration>) -> Result<UiElement, AutomationError> {
        let element = self.wait(timeout).await?;
        element.click()?;
        Ok(element)
    }

    /// Get all elements currently matching this locator, without waiting.
    pub async fn all(&self) -> Result<Vec<UiElement>, AutomationError> {
        let bridge = self.bridge.clone();
        let selector = self.selector.clone();
        task::spawn_blocking(move || engine::find_elements(&bridge, &selector))
            .await
            .map_err(|e| AutomationError::Internal(format!("Task join error: {e}")))?
    }

    pub fn selector_string(&self) -> String {
        format!("{:?}", self.selector)
    }
}

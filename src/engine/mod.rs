//! The bridge seam between element search and the device.
//!
//! `UiBridge` is deliberately blocking: every implementation talks to a slow
//! external surface (adb), and the async boundary lives in [`crate::Locator`]
//! which runs the polled search on a blocking task.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::element::UiElement;
use crate::errors::AutomationError;
use crate::selector::{PathExpr, Selector};

pub mod adb;
pub mod dump;

use dump::UiNode;

/// Device-automation bridge: hierarchy dumps plus the handful of actions the
/// upgrade flow needs.
pub trait UiBridge: Send + Sync + Debug {
    /// Capture and parse the current UI hierarchy.
    fn dump_hierarchy(&self) -> Result<Arc<UiNode>, AutomationError>;

    /// Tap at absolute screen coordinates.
    fn tap(&self, x: i32, y: i32) -> Result<(), AutomationError>;

    /// Navigate back.
    fn press_back(&self) -> Result<(), AutomationError>;

    /// Capture the screen as PNG bytes.
    fn screenshot_png(&self) -> Result<Vec<u8>, AutomationError>;

    /// Re-acquire the device connection, forcing the next dump to see a
    /// fresh UI.
    fn reconnect(&self) -> Result<(), AutomationError>;
}

fn node_matches(node: &UiNode, selector: &Selector) -> bool {
    match selector {
        Selector::ResourceId(id) => node.attrs.resource_id == *id,
        Selector::Text(text) => node.attrs.text == *text,
        Selector::ResourceIdText { resource_id, text } => {
            node.attrs.resource_id == *resource_id && node.attrs.text == *text
        }
        Selector::Path(_) | Selector::Invalid(_) => false,
    }
}

fn resolve_path(root: &Arc<UiNode>, expr: &PathExpr) -> Option<Arc<UiNode>> {
    let anchor = root
        .walk()
        .into_iter()
        .find(|node| node.attrs.resource_id == expr.anchor_resource_id)?;

    let mut current = anchor;
    for (class, index) in &expr.steps {
        let next = current
            .children
            .iter()
            .filter(|child| child.attrs.class == *class)
            .nth(index - 1)?
            .clone();
        current = next;
    }
    Some(current)
}

/// Search a single dump for every node matching `selector`, document order.
fn search_tree(root: &Arc<UiNode>, selector: &Selector) -> Result<Vec<Arc<UiNode>>, AutomationError> {
    match selector {
        Selector::Invalid(reason) => Err(AutomationError::InvalidArgument(reason.clone())),
        Selector::Path(raw) => {
            let expr = PathExpr::parse(raw).map_err(AutomationError::InvalidArgument)?;
            Ok(resolve_path(root, &expr).into_iter().collect())
        }
        _ => Ok(root
            .walk()
            .into_iter()
            .filter(|node| node_matches(node, selector))
            .collect()),
    }
}

/// Blocking polled lookup: re-dump the hierarchy at `poll_interval` until a
/// match exists or `timeout` elapses. Not-found after the deadline comes back
/// as `ElementNotFound`; the locator layer turns that into `Timeout`.
pub fn find_element(
    bridge: &Arc<dyn UiBridge>,
    selector: &Selector,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<UiElement, AutomationError> {
    let start = Instant::now();
    loop {
        let root = bridge.dump_hierarchy()?;
        if let Some(node) = search_tree(&root, selector)?.into_iter().next() {
            return Ok(UiElement::new(node, bridge.clone()));
        }
        if start.elapsed() >= timeout {
            return Err(AutomationError::ElementNotFound(format!(
                "no element matched {selector} within {timeout:?}"
            )));
        }
        trace!(%selector, "element not present yet, polling again");
        std::thread::sleep(poll_interval);
    }
}

/// Single-dump variant returning every current match. Used by the exhaustive
/// version scan; does not wait.
pub fn find_elements(
    bridge: &Arc<dyn UiBridge>,
    selector: &Selector,
) -> Result<Vec<UiElement>, AutomationError> {
    let root = bridge.dump_hierarchy()?;
    Ok(search_tree(&root, selector)?
        .into_iter()
        .map(|node| UiElement::new(node, bridge.clone()))
        .collect())
}

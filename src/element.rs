use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::dump::UiNode;
use crate::engine::UiBridge;
use crate::errors::AutomationError;

/// Pixel rectangle as reported by the dump's `bounds` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    /// Tap target for this element.
    pub fn center(&self) -> (i32, i32) {
        ((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }
}

fn is_empty_string(s: &str) -> bool {
    s.is_empty()
}

/// Attributes of one node in a uiautomator hierarchy dump.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiElementAttributes {
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub resource_id: String,
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub text: String,
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub class: String,
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub package: String,
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub content_desc: String,
    #[serde(default)]
    pub clickable: bool,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
}

impl fmt::Debug for UiElementAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug_struct = f.debug_struct("UiElementAttributes");
        if !self.class.is_empty() {
            debug_struct.field("class", &self.class);
        }
        if !self.resource_id.is_empty() {
            debug_struct.field("resource_id", &self.resource_id);
        }
        if !self.text.is_empty() {
            debug_struct.field("text", &self.text);
        }
        if !self.content_desc.is_empty() {
            debug_struct.field("content_desc", &self.content_desc);
        }
        if let Some(bounds) = &self.bounds {
            debug_struct.field("bounds", bounds);
        }
        debug_struct.finish()
    }
}

/// A live handle to one element of the last hierarchy dump: the parsed node
/// plus the bridge needed to act on it.
#[derive(Clone)]
pub struct UiElement {
    node: Arc<UiNode>,
    bridge: Arc<dyn UiBridge>,
}

impl fmt::Debug for UiElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiElement")
            .field("attrs", &self.node.attrs)
            .finish()
    }
}

impl UiElement {
    pub(crate) fn new(node: Arc<UiNode>, bridge: Arc<dyn UiBridge>) -> Self {
        Self { node, bridge }
    }

    pub fn attributes(&self) -> &UiElementAttributes {
        &self.node.attrs
    }

    /// The element's `text` attribute. Empty when the dump carries none,
    /// mirroring uiautomator semantics.
    pub fn text(&self) -> String {
        self.node.attrs.text.clone()
    }

    pub fn resource_id(&self) -> &str {
        &self.node.attrs.resource_id
    }

    pub fn class_name(&self) -> &str {
        &self.node.attrs.class
    }

    pub fn bounds(&self) -> Result<Bounds, AutomationError> {
        self.node.attrs.bounds.ok_or_else(|| {
            AutomationError::Internal(format!(
                "Element has no bounds in the dump: {:?}",
                self.node.attrs
            ))
        })
    }

    /// Tap the center of the element's bounds.
    pub fn click(&self) -> Result<(), AutomationError> {
        let (x, y) = self.bounds()?.center();
        debug!(x, y, resource_id = %self.node.attrs.resource_id, "tapping element");
        self.bridge.tap(x, y)
    }

    pub fn children(&self) -> Vec<UiElement> {
        self.node
            .children
            .iter()
            .map(|child| UiElement::new(child.clone(), self.bridge.clone()))
            .collect()
    }

    /// All descendants of the given class, in document order.
    pub fn descendants_of_class(&self, class: &str) -> Vec<UiElement> {
        let mut out = Vec::new();
        collect_by_class(&self.node, class, &mut out);
        out.into_iter()
            .map(|node| UiElement::new(node, self.bridge.clone()))
            .collect()
    }
}

fn collect_by_class(node: &Arc<UiNode>, class: &str, out: &mut Vec<Arc<UiNode>>) {
    for child in &node.children {
        if child.attrs.class == class {
            out.push(child.clone());
        }
        collect_by_class(child, class, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_rounds_down() {
        let bounds = Bounds {
            left: 0,
            top: 10,
            right: 101,
            bottom: 21,
        };
        assert_eq!(bounds.center(), (50, 15));
    }
}

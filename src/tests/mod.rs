//! Behavioral suites running the real locator/version/upgrade/soak code
//! against a scripted in-memory bridge.

mod soak_tests;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::element::{Bounds, UiElementAttributes};
use crate::engine::dump::UiNode;
use crate::engine::UiBridge;
use crate::errors::AutomationError;

/// Test node builder. Every node gets tappable bounds unless overridden.
pub(crate) fn el(class: &str, resource_id: &str, text: &str) -> UiNode {
    UiNode {
        attrs: UiElementAttributes {
            resource_id: resource_id.to_string(),
            text: text.to_string(),
            class: class.to_string(),
            package: "com.dialog.suota".to_string(),
            content_desc: String::new(),
            clickable: true,
            enabled: true,
            bounds: Some(Bounds {
                left: 0,
                top: 0,
                right: 100,
                bottom: 40,
            }),
        },
        children: Vec::new(),
    }
}

pub(crate) fn with_bounds(mut node: UiNode, bounds: Bounds) -> UiNode {
    node.attrs.bounds = Some(bounds);
    node
}

pub(crate) fn with_children(mut node: UiNode, children: Vec<UiNode>) -> UiNode {
    node.children = children.into_iter().map(Arc::new).collect();
    node
}

/// A screen frame: a root node wrapping the given children.
pub(crate) fn frame(children: Vec<UiNode>) -> Arc<UiNode> {
    Arc::new(with_children(el("android.widget.FrameLayout", "", ""), children))
}

/// How the scripted bridge moves between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Advance {
    /// Each hierarchy dump shows the next frame (elements appearing over
    /// time under a polling wait).
    PerDump,
    /// Frames change only when something is tapped (screen transitions).
    PerTap,
}

/// Scripted `UiBridge`: serves a fixed sequence of hierarchy frames and
/// records every action.
#[derive(Debug)]
pub(crate) struct FakeBridge {
    frames: Vec<Arc<UiNode>>,
    cursor: AtomicUsize,
    advance: Advance,
    fail_dumps: bool,
    pub taps: Mutex<Vec<(i32, i32)>>,
    pub back_presses: AtomicUsize,
    pub reconnects: AtomicUsize,
}

impl FakeBridge {
    pub fn new(frames: Vec<Arc<UiNode>>, advance: Advance) -> Arc<Self> {
        assert!(!frames.is_empty(), "bridge needs at least one frame");
        Arc::new(Self {
            frames,
            cursor: AtomicUsize::new(0),
            advance,
            fail_dumps: false,
            taps: Mutex::new(Vec::new()),
            back_presses: AtomicUsize::new(0),
            reconnects: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            frames: vec![frame(vec![])],
            cursor: AtomicUsize::new(0),
            advance: Advance::PerDump,
            fail_dumps: true,
            taps: Mutex::new(Vec::new()),
            back_presses: AtomicUsize::new(0),
            reconnects: AtomicUsize::new(0),
        })
    }

    fn bump(&self) {
        let last = self.frames.len() - 1;
        let _ = self
            .cursor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current < last).then_some(current + 1)
            });
    }

    pub fn tap_count(&self) -> usize {
        self.taps.lock().unwrap().len()
    }
}

impl UiBridge for FakeBridge {
    fn dump_hierarchy(&self) -> Result<Arc<UiNode>, AutomationError> {
        if self.fail_dumps {
            return Err(AutomationError::PlatformError(
                "scripted dump failure".to_string(),
            ));
        }
        let current = self.frames[self.cursor.load(Ordering::SeqCst)].clone();
        if self.advance == Advance::PerDump {
            self.bump();
        }
        Ok(current)
    }

    fn tap(&self, x: i32, y: i32) -> Result<(), AutomationError> {
        self.taps.lock().unwrap().push((x, y));
        if self.advance == Advance::PerTap {
            self.bump();
        }
        Ok(())
    }

    fn press_back(&self) -> Result<(), AutomationError> {
        self.back_presses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn screenshot_png(&self) -> Result<Vec<u8>, AutomationError> {
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.extend_from_slice(b"fake");
        Ok(bytes)
    }

    fn reconnect(&self) -> Result<(), AutomationError> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

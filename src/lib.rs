//! Android UI automation over adb for OTA firmware soak testing
//!
//! This crate drives the Dialog SUOTA app on a connected Android device:
//! it reads the installed firmware version from the UI, flashes the matching
//! upgrade image over the air, verifies the result, and ping-pongs between
//! two versions indefinitely. Element lookup follows Playwright's model:
//! selectors, locators with polled waits, and a bridge trait at the device
//! seam.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

pub mod config;
pub mod element;
pub mod engine;
pub mod errors;
pub mod locator;
pub mod selector;
pub mod suota;
#[cfg(test)]
mod tests;

pub use config::{SoakConfig, Timings, UpgradePlan};
pub use element::{Bounds, UiElement, UiElementAttributes};
pub use errors::AutomationError;
pub use locator::Locator;
pub use selector::Selector;

use engine::adb::AdbBridge;
use engine::UiBridge;

/// The main entry point for device automation: a connected Android device.
pub struct Device {
    bridge: Arc<dyn UiBridge>,
    poll_interval: Duration,
}

impl Device {
    /// Connect over adb. `serial` falls back to `ANDROID_SERIAL`, then to
    /// adb's single-device default.
    #[instrument(skip(serial))]
    pub fn connect(
        serial: Option<String>,
        poll_interval: Duration,
    ) -> Result<Self, AutomationError> {
        let bridge = AdbBridge::connect(serial)?;
        Ok(Self {
            bridge: Arc::new(bridge),
            poll_interval,
        })
    }

    /// Build a device on any bridge implementation. This is the seam test
    /// suites use to script the UI.
    pub fn with_bridge(bridge: Arc<dyn UiBridge>, poll_interval: Duration) -> Self {
        Self {
            bridge,
            poll_interval,
        }
    }

    pub fn locator(&self, selector: impl Into<Selector>) -> Locator {
        Locator::new(self.bridge.clone(), selector.into(), self.poll_interval)
    }

    /// Navigate back.
    pub fn press_back(&self) -> Result<(), AutomationError> {
        self.bridge.press_back()
    }

    /// Re-acquire the device connection so the next dump sees a fresh UI.
    pub fn reconnect(&self) -> Result<(), AutomationError> {
        self.bridge.reconnect()
    }

    /// Capture the screen and write it as a PNG file.
    pub fn screenshot_to_file(&self, path: &Path) -> Result<(), AutomationError> {
        let bytes = self.bridge.screenshot_png()?;
        std::fs::write(path, bytes).map_err(|err| {
            AutomationError::PlatformError(format!(
                "Failed to write screenshot {}: {err}",
                path.display()
            ))
        })
    }
}

impl Clone for Device {
    fn clone(&self) -> Self {
        Self {
            bridge: self.bridge.clone(),
            poll_interval: self.poll_interval,
        }
    }
}

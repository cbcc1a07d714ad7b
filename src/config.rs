//! Soak-run configuration: the upgrade table, version aliases, and timing
//! knobs. Defaults reproduce the M80P 1.0.20 ↔ 1.0.21 ping-pong setup; an
//! optional JSON file overrides them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::AutomationError;

/// What to flash when a given version is currently installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradePlan {
    pub target_version: String,
    pub update_file_name: String,
}

/// Every wait and settle duration in the flow. All waits are bounded by these
/// and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Granularity of element polling, milliseconds.
    pub poll_interval_ms: u64,
    /// Per-version probe during version detection, seconds.
    pub probe_timeout_secs: u64,
    /// Ordinary click/wait steps, seconds.
    pub step_timeout_secs: u64,
    /// Firmware upload completion, seconds.
    pub upload_timeout_secs: u64,
    /// Post-upload confirmation dialog, seconds.
    pub confirm_timeout_secs: u64,
    /// Device row during post-upgrade re-verification, seconds.
    pub reverify_timeout_secs: u64,
    /// Device row on initial connect, seconds.
    pub device_list_timeout_secs: u64,
    /// Settle after ordinary clicks, milliseconds.
    pub settle_short_ms: u64,
    /// Settle after entering the device screen at startup, milliseconds.
    pub settle_initial_ms: u64,
    /// Settle after dismissing the confirmation dialog, milliseconds.
    pub settle_after_confirm_ms: u64,
    /// Settle after pressing back, milliseconds.
    pub settle_after_back_ms: u64,
    /// Settle after re-entering the device screen, milliseconds.
    pub settle_after_reverify_ms: u64,
    /// Pause between soak attempts, milliseconds.
    pub attempt_pause_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            probe_timeout_secs: 3,
            step_timeout_secs: 10,
            upload_timeout_secs: 600,
            confirm_timeout_secs: 60,
            reverify_timeout_secs: 15,
            device_list_timeout_secs: 20,
            settle_short_ms: 1_000,
            settle_initial_ms: 3_000,
            settle_after_confirm_ms: 5_000,
            settle_after_back_ms: 2_000,
            settle_after_reverify_ms: 2_000,
            attempt_pause_ms: 5_000,
        }
    }
}

impl Timings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }
    pub fn reverify_timeout(&self) -> Duration {
        Duration::from_secs(self.reverify_timeout_secs)
    }
    pub fn device_list_timeout(&self) -> Duration {
        Duration::from_secs(self.device_list_timeout_secs)
    }
    pub fn settle_short(&self) -> Duration {
        Duration::from_millis(self.settle_short_ms)
    }
    pub fn settle_initial(&self) -> Duration {
        Duration::from_millis(self.settle_initial_ms)
    }
    pub fn settle_after_confirm(&self) -> Duration {
        Duration::from_millis(self.settle_after_confirm_ms)
    }
    pub fn settle_after_back(&self) -> Duration {
        Duration::from_millis(self.settle_after_back_ms)
    }
    pub fn settle_after_reverify(&self) -> Duration {
        Duration::from_millis(self.settle_after_reverify_ms)
    }
    pub fn attempt_pause(&self) -> Duration {
        Duration::from_millis(self.attempt_pause_ms)
    }

    /// Millisecond-scale timings for test suites.
    #[cfg(test)]
    pub fn fast() -> Self {
        Self {
            poll_interval_ms: 5,
            probe_timeout_secs: 0,
            step_timeout_secs: 1,
            upload_timeout_secs: 1,
            confirm_timeout_secs: 1,
            reverify_timeout_secs: 1,
            device_list_timeout_secs: 1,
            settle_short_ms: 1,
            settle_initial_ms: 1,
            settle_after_confirm_ms: 1,
            settle_after_back_ms: 1,
            settle_after_reverify_ms: 1,
            attempt_pause_ms: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoakConfig {
    /// adb serial; `None` defers to `ANDROID_SERIAL` or adb's single-device
    /// default.
    pub serial: Option<String>,
    /// Known version → what to flash next. Bidirectional for a two-version
    /// ping-pong.
    pub versions: BTreeMap<String, UpgradePlan>,
    /// Normalization for non-canonical initial versions, applied exactly once.
    pub aliases: BTreeMap<String, String>,
    /// Where failure screenshots are written.
    pub screenshot_dir: PathBuf,
    pub timings: Timings,
}

impl Default for SoakConfig {
    fn default() -> Self {
        let mut versions = BTreeMap::new();
        versions.insert(
            "1.0.21".to_string(),
            UpgradePlan {
                target_version: "1.0.20".to_string(),
                update_file_name: "Xiaomi_M80P_1.0.20.img".to_string(),
            },
        );
        versions.insert(
            "1.0.20".to_string(),
            UpgradePlan {
                target_version: "1.0.21".to_string(),
                update_file_name: "Xiaomi_M80P_1.0.21.img".to_string(),
            },
        );
        let mut aliases = BTreeMap::new();
        aliases.insert("SUNWINON".to_string(), "1.0.21".to_string());
        Self {
            serial: None,
            versions,
            aliases,
            screenshot_dir: PathBuf::from("."),
            timings: Timings::default(),
        }
    }
}

impl SoakConfig {
    /// Load from a JSON file if it exists, else the built-in defaults. A file
    /// that exists but fails to parse is an error rather than a silent
    /// fallback.
    pub fn load_or_default(path: &Path) -> Result<Self, AutomationError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|err| {
            AutomationError::PlatformError(format!("Failed to read {}: {err}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|err| {
            AutomationError::InvalidArgument(format!(
                "Failed to parse {}: {err}",
                path.display()
            ))
        })
    }

    pub fn plan_for(&self, version: &str) -> Option<&UpgradePlan> {
        self.versions.get(version)
    }

    /// Resolve a version through the alias table; unknown strings pass
    /// through unchanged.
    pub fn resolve_alias<'a>(&'a self, version: &'a str) -> &'a str {
        self.aliases.get(version).map(String::as_str).unwrap_or(version)
    }
}

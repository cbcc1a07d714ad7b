//! The soak loop: alternate between the two firmware versions until an
//! unsupported version shows up or the process is killed.

use chrono::Local;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::SoakConfig;
use crate::errors::AutomationError;
use crate::selector::Selector;
use crate::suota::{ids, perform_upgrade, read_current_version};
use crate::Device;

/// Running attempt/success counters for the soak run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SoakStats {
    pub attempts: u64,
    pub successes: u64,
}

impl SoakStats {
    /// Success rate in percent; 0 before the first attempt.
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f64 / self.attempts as f64 * 100.0
        }
    }
}

pub struct SoakRunner {
    device: Device,
    config: SoakConfig,
    stats: SoakStats,
}

impl SoakRunner {
    pub fn new(device: Device, config: SoakConfig) -> Self {
        Self {
            device,
            config,
            stats: SoakStats::default(),
        }
    }

    pub fn stats(&self) -> SoakStats {
        self.stats
    }

    /// Run the soak loop. Only an unsupported firmware version (or a fatal
    /// bridge error outside an upgrade attempt) ends it.
    pub async fn run(&mut self) -> Result<(), AutomationError> {
        info!("{:=<28} firmware soak run {:=<28}", "", "");
        let mut current_version = self.enter_device_screen().await?;

        // Alias normalization happens here and nowhere else: later versions
        // come from verified upgrade results and are already canonical.
        let canonical = self.config.resolve_alias(&current_version).to_string();
        if canonical != current_version {
            info!(raw = %current_version, mapped = %canonical, "normalized initial version");
            current_version = canonical;
        }

        loop {
            current_version = self.attempt(current_version).await?;
            sleep(self.config.timings.attempt_pause()).await;
        }
    }

    /// One soak iteration: check the version is supported, run the upgrade,
    /// update counters, screenshot on failure. Returns the version to start
    /// the next iteration from.
    pub(crate) async fn attempt(
        &mut self,
        current_version: String,
    ) -> Result<String, AutomationError> {
        self.stats.attempts += 1;
        info!(
            attempt = self.stats.attempts,
            version = %current_version,
            "starting upgrade attempt"
        );

        if self.config.plan_for(&current_version).is_none() {
            error!(version = %current_version, "version has no upgrade plan, stopping");
            return Err(AutomationError::UnsupportedVersion(current_version));
        }

        let outcome = perform_upgrade(&self.device, &self.config, &current_version).await;
        if outcome.success {
            self.stats.successes += 1;
            info!(
                from = %current_version,
                to = %outcome.observed_version,
                "upgrade succeeded"
            );
        } else {
            let screenshot = self.capture_failure_screenshot();
            error!(
                from = %current_version,
                observed = %outcome.observed_version,
                screenshot = %screenshot.as_deref().unwrap_or("<unavailable>"),
                "upgrade failed"
            );
        }

        info!(
            attempts = self.stats.attempts,
            successes = self.stats.successes,
            rate = format!("{:.2}%", self.stats.success_rate()),
            "running success rate"
        );
        Ok(outcome.observed_version)
    }

    /// Tap the first scanned device, wait for its detail screen, then read
    /// the initial version.
    async fn enter_device_screen(&self) -> Result<String, AutomationError> {
        self.device
            .locator(Selector::Path(ids::device_first_row_path()))
            .click(Some(self.config.timings.device_list_timeout()))
            .await?;
        sleep(self.config.timings.settle_initial()).await;
        read_current_version(&self.device, &self.config).await
    }

    fn capture_failure_screenshot(&self) -> Option<String> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self
            .config
            .screenshot_dir
            .join(format!("screenshot_failure_{timestamp}.png"));
        match self.device.screenshot_to_file(&path) {
            Ok(()) => Some(path.display().to_string()),
            Err(err) => {
                warn!(error = %err, "failed to capture failure screenshot");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_handles_zero_attempts() {
        assert_eq!(SoakStats::default().success_rate(), 0.0);
        let stats = SoakStats {
            attempts: 3,
            successes: 2,
        };
        assert!((stats.success_rate() - 66.666).abs() < 0.01);
    }
}

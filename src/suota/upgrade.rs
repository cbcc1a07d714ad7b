//! The upgrade sequence: clicking through the SUOTA screens, waiting out the
//! firmware upload, and re-verifying the version afterwards.

use tokio::time::sleep;
use tracing::{error, info};

use crate::config::SoakConfig;
use crate::errors::AutomationError;
use crate::selector::Selector;
use crate::suota::{ids, version};
use crate::Device;

/// Result of one upgrade attempt. `success` is strictly
/// `observed_version == expected target`; every error inside the attempt is
/// converted into a failed outcome carrying the pre-attempt version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeOutcome {
    pub success: bool,
    pub observed_version: String,
}

/// Run one complete upgrade attempt from `current_version`.
pub async fn perform_upgrade(
    device: &Device,
    config: &SoakConfig,
    current_version: &str,
) -> UpgradeOutcome {
    match run_steps(device, config, current_version).await {
        Ok(observed) => {
            let target = config
                .plan_for(current_version)
                .map(|plan| plan.target_version.as_str())
                .unwrap_or_default();
            UpgradeOutcome {
                success: observed == target,
                observed_version: observed,
            }
        }
        Err(AutomationError::Timeout(message)) => {
            error!(%message, "upgrade step timed out");
            UpgradeOutcome {
                success: false,
                observed_version: current_version.to_string(),
            }
        }
        Err(err) => {
            error!(error = %err, "upgrade attempt failed");
            UpgradeOutcome {
                success: false,
                observed_version: current_version.to_string(),
            }
        }
    }
}

async fn run_steps(
    device: &Device,
    config: &SoakConfig,
    current_version: &str,
) -> Result<String, AutomationError> {
    let timings = &config.timings;
    let plan = config.plan_for(current_version).ok_or_else(|| {
        AutomationError::UnsupportedVersion(current_version.to_string())
    })?;
    info!(
        current = current_version,
        target = %plan.target_version,
        file = %plan.update_file_name,
        "starting upgrade"
    );

    // 1. Open the update screen.
    device
        .locator(Selector::ResourceId(ids::UPDATE_BUTTON.to_string()))
        .click(Some(timings.step_timeout()))
        .await?;
    sleep(timings.settle_short()).await;

    // 2. Pick the upgrade image by exact file name.
    device
        .locator(Selector::ResourceId(ids::FILE_LIST.to_string()))
        .click(Some(timings.step_timeout()))
        .await?;
    sleep(timings.settle_short()).await;
    device
        .locator(Selector::ResourceIdText {
            resource_id: ids::FILE_ROW.to_string(),
            text: plan.update_file_name.clone(),
        })
        .click(Some(timings.step_timeout()))
        .await?;

    // 3. Send it to the device.
    device
        .locator(Selector::ResourceIdText {
            resource_id: ids::SEND_TO_DEVICE_BUTTON.to_string(),
            text: ids::SEND_TO_DEVICE_TEXT.to_string(),
        })
        .click(Some(timings.step_timeout()))
        .await?;

    // 4. Wait out the upload, then dismiss the confirmation dialog.
    info!(timeout = ?timings.upload_timeout(), "waiting for upload to complete");
    device
        .locator(Selector::Text(ids::UPLOAD_COMPLETED_TEXT.to_string()))
        .wait(Some(timings.upload_timeout()))
        .await?;
    device
        .locator(Selector::Text(ids::CONFIRM_TEXT.to_string()))
        .click(Some(timings.confirm_timeout()))
        .await?;
    sleep(timings.settle_after_confirm()).await;

    // 5. Back to the scan screen; reconnect so the next dump is fresh.
    device.press_back()?;
    sleep(timings.settle_after_back()).await;
    device.reconnect()?;

    // 6. Re-enter the device screen and read the version back.
    device
        .locator(Selector::Path(ids::device_first_row_path()))
        .click(Some(timings.reverify_timeout()))
        .await?;
    sleep(timings.settle_after_reverify()).await;
    version::read_current_version(device, config).await
}

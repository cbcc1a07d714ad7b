//! Firmware version detection.
//!
//! The version lives in an `itemValue` row of the SUOTA device screen, but
//! the text is not always exact across app builds, so detection is an ordered
//! chain of strategies from most precise to most permissive.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::config::SoakConfig;
use crate::errors::AutomationError;
use crate::selector::Selector;
use crate::suota::ids;
use crate::Device;

/// Minimum shape of a firmware version string.
static VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+").unwrap());

pub(crate) fn looks_like_version(text: &str) -> bool {
    VERSION_RE.is_match(text)
}

/// Read the firmware version currently shown on the device screen.
///
/// Strategies, in order:
/// 1. exact probe: `itemValue` with the text of each known version;
/// 2. bare `itemValue` lookup, accepted only if the text is dotted-numeric;
/// 3. structural fallback: fourth row of the main item list, second
///    `TextView` (fixed layout);
/// 4. exhaustive scan of every `itemValue` for a known version.
///
/// Fails with `ElementNotFound` once every strategy exhausts. Anything other
/// than a lookup timeout propagates immediately.
pub async fn read_current_version(
    device: &Device,
    config: &SoakConfig,
) -> Result<String, AutomationError> {
    let timings = &config.timings;
    info!("reading current firmware version");

    // 1. Exact probe per known version.
    for version in config.versions.keys() {
        let locator = device.locator(Selector::ResourceIdText {
            resource_id: ids::ITEM_VALUE.to_string(),
            text: version.clone(),
        });
        match locator.wait(Some(timings.probe_timeout())).await {
            Ok(element) => {
                let text = element.text().trim().to_string();
                debug!(%version, "exact probe matched");
                return Ok(text);
            }
            Err(AutomationError::Timeout(_)) => continue,
            Err(other) => return Err(other),
        }
    }

    // 2. Any itemValue whose text has a version shape.
    let locator = device.locator(Selector::ResourceId(ids::ITEM_VALUE.to_string()));
    match locator.wait(Some(timings.step_timeout())).await {
        Ok(element) => {
            let text = element.text().trim().to_string();
            if looks_like_version(&text) {
                debug!(version = %text, "generic itemValue lookup matched");
                return Ok(text);
            }
        }
        Err(AutomationError::Timeout(_)) => {}
        Err(other) => return Err(other),
    }

    // 3. Fixed-layout fallback: the version sits in the fourth main-list row,
    // second TextView.
    let locator = device.locator(Selector::Path(ids::version_row_path()));
    match locator.wait(Some(timings.step_timeout())).await {
        Ok(row) => {
            let values = row.descendants_of_class("android.widget.TextView");
            if let Some(value) = values.get(1) {
                let text = value.text().trim().to_string();
                if !text.is_empty() {
                    debug!(version = %text, "structural fallback matched");
                    return Ok(text);
                }
            }
        }
        Err(AutomationError::Timeout(_)) => {}
        Err(other) => return Err(other),
    }

    // 4. Exhaustive scan over every itemValue.
    let elements = device
        .locator(Selector::ResourceId(ids::ITEM_VALUE.to_string()))
        .all()
        .await?;
    for element in &elements {
        let text = element.text();
        if config.versions.contains_key(text.trim()) {
            debug!(version = %text, "exhaustive scan matched");
            return Ok(text.trim().to_string());
        }
    }

    Err(AutomationError::ElementNotFound(
        "could not determine the firmware version from any detection strategy".to_string(),
    ))
}

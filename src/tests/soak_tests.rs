use std::time::Duration;

use super::{el, frame, with_children, Advance, FakeBridge};
use crate::config::{SoakConfig, Timings};
use crate::errors::AutomationError;
use crate::suota::SoakRunner;
use crate::Device;

fn fast_config() -> SoakConfig {
    SoakConfig {
        timings: Timings::fast(),
        ..SoakConfig::default()
    }
}

fn device_list_screen() -> std::sync::Arc<crate::engine::dump::UiNode> {
    frame(vec![with_children(
        el("android.widget.ListView", "com.dialog.suota:id/device_list", ""),
        vec![el("android.widget.RelativeLayout", "", "M80P")],
    )])
}

/// Detail screen whose version only the structural fallback can read.
fn structural_version_screen(raw: &str) -> std::sync::Arc<crate::engine::dump::UiNode> {
    let row = |label: &str, value: &str| {
        with_children(
            el("android.widget.RelativeLayout", "", ""),
            vec![
                el("android.widget.TextView", "", label),
                el("android.widget.TextView", "", value),
            ],
        )
    };
    frame(vec![with_children(
        el("android.widget.ListView", "com.dialog.suota:id/mainItemsList", ""),
        vec![
            row("Name", "M80P"),
            row("Status", "Connected"),
            row("Battery", "97%"),
            row("Version", raw),
        ],
    )])
}

#[tokio::test]
async fn run_applies_alias_once_and_stops_on_unsupported_version() {
    let bridge = FakeBridge::new(
        vec![device_list_screen(), structural_version_screen("SUNWINON")],
        Advance::PerTap,
    );
    let device = Device::with_bridge(bridge, Duration::from_millis(5));

    let mut config = fast_config();
    // Alias the raw label to a version with no upgrade plan: the loop must
    // stop on the aliased value, proving the mapping ran exactly once.
    config.aliases.insert("SUNWINON".to_string(), "9.9.9".to_string());

    let mut runner = SoakRunner::new(device, config);
    let err = runner.run().await.expect_err("9.9.9 has no plan");
    match err {
        AutomationError::UnsupportedVersion(version) => assert_eq!(version, "9.9.9"),
        other => panic!("expected UnsupportedVersion, got {other:?}"),
    }
    assert_eq!(runner.stats().attempts, 1);
    assert_eq!(runner.stats().successes, 0);
}

#[tokio::test]
async fn successful_attempt_counts_and_does_not_realias() {
    // Frames for one full happy-path upgrade from 1.0.21.
    let frames = vec![
        frame(vec![el(
            "android.widget.Button",
            "com.dialog.suota:id/updateButton",
            "UPDATE DEVICE",
        )]),
        frame(vec![el(
            "android.widget.TextView",
            "com.dialog.suota:id/file_list",
            "Select file",
        )]),
        frame(vec![el(
            "android.widget.TextView",
            "android:id/text1",
            "Xiaomi_M80P_1.0.20.img",
        )]),
        frame(vec![el(
            "android.widget.Button",
            "com.dialog.suota:id/sendToDeviceButton",
            "SEND TO DEVICE",
        )]),
        frame(vec![
            el("android.widget.TextView", "", "Upload completed"),
            el("android.widget.Button", "", "确定"),
        ]),
        device_list_screen(),
        frame(vec![el(
            "android.widget.TextView",
            "com.dialog.suota:id/itemValue",
            "1.0.20",
        )]),
    ];
    let bridge = FakeBridge::new(frames, Advance::PerTap);
    let device = Device::with_bridge(bridge, Duration::from_millis(5));

    let mut config = fast_config();
    // A hostile alias on the upgrade result: it must NOT be applied, aliases
    // are for the initial read only.
    config.aliases.insert("1.0.20".to_string(), "tampered".to_string());

    let mut runner = SoakRunner::new(device, config);
    let next = runner
        .attempt("1.0.21".to_string())
        .await
        .expect("supported version");
    assert_eq!(next, "1.0.20");
    assert_eq!(runner.stats().attempts, 1);
    assert_eq!(runner.stats().successes, 1);
}

#[tokio::test]
async fn failed_attempt_writes_a_screenshot_and_keeps_the_old_version() {
    // The update button never shows up, so the attempt fails outright.
    let bridge = FakeBridge::new(vec![frame(vec![])], Advance::PerTap);
    let device = Device::with_bridge(bridge, Duration::from_millis(5));

    let shots = tempfile::tempdir().expect("temp dir");
    let mut config = fast_config();
    config.screenshot_dir = shots.path().to_path_buf();

    let mut runner = SoakRunner::new(device, config);
    let next = runner
        .attempt("1.0.21".to_string())
        .await
        .expect("failure is not fatal");
    assert_eq!(next, "1.0.21");
    assert_eq!(runner.stats().attempts, 1);
    assert_eq!(runner.stats().successes, 0);

    let written: Vec<_> = std::fs::read_dir(shots.path())
        .expect("read dir")
        .map(|entry| entry.expect("entry").file_name().into_string().unwrap())
        .collect();
    assert_eq!(written.len(), 1);
    assert!(
        written[0].starts_with("screenshot_failure_") && written[0].ends_with(".png"),
        "unexpected screenshot name: {}",
        written[0]
    );
}

//! The SUOTA upgrade flow: version detection, the upgrade sequence, and the
//! ping-pong soak loop.

pub mod soak;
pub mod upgrade;
pub mod version;

pub use soak::{SoakRunner, SoakStats};
pub use upgrade::{perform_upgrade, UpgradeOutcome};
pub use version::read_current_version;

/// Resource-ids and fixed texts of the SUOTA app's screens.
pub(crate) mod ids {
    pub const ITEM_VALUE: &str = "com.dialog.suota:id/itemValue";
    pub const MAIN_ITEMS_LIST: &str = "com.dialog.suota:id/mainItemsList";
    pub const DEVICE_LIST: &str = "com.dialog.suota:id/device_list";
    pub const UPDATE_BUTTON: &str = "com.dialog.suota:id/updateButton";
    pub const FILE_LIST: &str = "com.dialog.suota:id/file_list";
    pub const SEND_TO_DEVICE_BUTTON: &str = "com.dialog.suota:id/sendToDeviceButton";
    /// Rows of the system file picker list.
    pub const FILE_ROW: &str = "android:id/text1";

    pub const SEND_TO_DEVICE_TEXT: &str = "SEND TO DEVICE";
    pub const UPLOAD_COMPLETED_TEXT: &str = "Upload completed";
    /// The confirmation dialog button ("OK" on a Chinese-locale device).
    pub const CONFIRM_TEXT: &str = "确定";

    /// First row of the scan-result device list.
    pub fn device_first_row_path() -> String {
        format!("//*[@resource-id=\"{DEVICE_LIST}\"]/android.widget.RelativeLayout[1]")
    }

    /// The row of the main item list that carries the firmware version.
    pub fn version_row_path() -> String {
        format!("//*[@resource-id=\"{MAIN_ITEMS_LIST}\"]/android.widget.RelativeLayout[4]")
    }
}

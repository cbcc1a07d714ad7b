//! adb-backed bridge implementation.
//!
//! Every action shells out to adb; hierarchy dumps go through
//! `uiautomator dump` to a file on the device and are pulled back with
//! `exec-out cat` (dumping straight to a tty is unreliable across adb
//! versions).

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::engine::dump::{parse_hierarchy, UiNode};
use crate::engine::UiBridge;
use crate::errors::AutomationError;

const DUMP_REMOTE_PATH: &str = "/sdcard/window_dump.xml";
const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

const COMMAND_TIMEOUT: Duration = Duration::from_secs(15);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct RawOutput {
    stdout: Vec<u8>,
    stderr: String,
    exit_code: Option<i32>,
}

/// Run a command with piped, drained stdio and a hard timeout. Draining on
/// separate threads keeps a chatty child from blocking on a full pipe buffer
/// and then falsely hitting the timeout.
fn run_command(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<RawOutput, AutomationError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| {
            AutomationError::PlatformError(format!("Failed to spawn {program}: {err}"))
        })?;

    let stdout = child.stdout.take().ok_or_else(|| {
        AutomationError::PlatformError("Failed to capture stdout".to_string())
    })?;
    let stderr = child.stderr.take().ok_or_else(|| {
        AutomationError::PlatformError("Failed to capture stderr".to_string())
    })?;

    let drain = |mut reader: Box<dyn Read + Send>| {
        std::thread::spawn(move || {
            let mut buffer = Vec::<u8>::new();
            let mut temp = [0u8; 4096];
            loop {
                match reader.read(&mut temp) {
                    Ok(0) => break,
                    Ok(count) => buffer.extend_from_slice(&temp[..count]),
                    Err(_) => break,
                }
            }
            buffer
        })
    };
    let stdout_handle = drain(Box::new(stdout));
    let stderr_handle = drain(Box::new(stderr));

    let start = Instant::now();
    let exit_code = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status.code(),
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = stdout_handle.join();
                    let _ = stderr_handle.join();
                    return Err(AutomationError::PlatformError(format!(
                        "{program} {} timed out after {timeout:?}",
                        args.join(" ")
                    )));
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(err) => {
                let _ = stdout_handle.join();
                let _ = stderr_handle.join();
                return Err(AutomationError::PlatformError(format!(
                    "Failed to poll {program}: {err}"
                )));
            }
        }
    };

    let stdout_bytes = stdout_handle.join().unwrap_or_default();
    let stderr_bytes = stderr_handle.join().unwrap_or_default();
    Ok(RawOutput {
        stdout: stdout_bytes,
        stderr: String::from_utf8_lossy(&stderr_bytes).to_string(),
        exit_code,
    })
}

/// Bridge to a single Android device through adb.
#[derive(Debug, Clone)]
pub struct AdbBridge {
    program: String,
    serial: Option<String>,
}

impl AdbBridge {
    /// Resolve adb, start the server, and wait for the device to come
    /// online. `serial` falls back to `ANDROID_SERIAL`, then to adb's own
    /// single-device default.
    pub fn connect(serial: Option<String>) -> Result<Self, AutomationError> {
        let program = std::env::var("ADB").unwrap_or_else(|_| "adb".to_string());
        let serial = serial.or_else(|| {
            std::env::var("ANDROID_SERIAL")
                .ok()
                .filter(|s| !s.trim().is_empty())
        });
        let bridge = Self { program, serial };

        let started = run_command(&bridge.program, &["start-server"], COMMAND_TIMEOUT)?;
        if started.exit_code != Some(0) {
            warn!(stderr = %started.stderr.trim(), "adb start-server reported a problem");
        }
        bridge.wait_for_device()?;
        debug!(serial = bridge.serial.as_deref().unwrap_or("<default>"), "device online");
        Ok(bridge)
    }

    fn wait_for_device(&self) -> Result<(), AutomationError> {
        let out = self.run(&["wait-for-device"], CONNECT_TIMEOUT)?;
        if out.exit_code != Some(0) {
            return Err(AutomationError::PlatformError(format!(
                "adb wait-for-device failed: {}",
                out.stderr.trim()
            )));
        }
        Ok(())
    }

    fn run(&self, args: &[&str], timeout: Duration) -> Result<RawOutput, AutomationError> {
        let mut full: Vec<&str> = Vec::with_capacity(args.len() + 2);
        if let Some(serial) = &self.serial {
            full.push("-s");
            full.push(serial);
        }
        full.extend_from_slice(args);
        run_command(&self.program, &full, timeout)
    }

    fn run_checked(&self, args: &[&str], timeout: Duration) -> Result<Vec<u8>, AutomationError> {
        let out = self.run(args, timeout)?;
        if out.exit_code != Some(0) {
            return Err(AutomationError::PlatformError(format!(
                "adb {} failed (exit {:?}): {}",
                args.join(" "),
                out.exit_code,
                out.stderr.trim()
            )));
        }
        Ok(out.stdout)
    }
}

impl UiBridge for AdbBridge {
    fn dump_hierarchy(&self) -> Result<Arc<UiNode>, AutomationError> {
        self.run_checked(
            &["shell", "uiautomator", "dump", DUMP_REMOTE_PATH],
            COMMAND_TIMEOUT,
        )?;
        let raw = self.run_checked(&["exec-out", "cat", DUMP_REMOTE_PATH], COMMAND_TIMEOUT)?;
        let xml = String::from_utf8_lossy(&raw);
        parse_hierarchy(&xml)
    }

    fn tap(&self, x: i32, y: i32) -> Result<(), AutomationError> {
        let x = x.to_string();
        let y = y.to_string();
        self.run_checked(&["shell", "input", "tap", &x, &y], COMMAND_TIMEOUT)?;
        Ok(())
    }

    fn press_back(&self) -> Result<(), AutomationError> {
        self.run_checked(
            &["shell", "input", "keyevent", "KEYCODE_BACK"],
            COMMAND_TIMEOUT,
        )?;
        Ok(())
    }

    fn screenshot_png(&self) -> Result<Vec<u8>, AutomationError> {
        let bytes = self.run_checked(&["exec-out", "screencap", "-p"], COMMAND_TIMEOUT)?;
        if !bytes.starts_with(PNG_SIGNATURE) {
            return Err(AutomationError::PlatformError(
                "screencap output is not a PNG".to_string(),
            ));
        }
        Ok(bytes)
    }

    fn reconnect(&self) -> Result<(), AutomationError> {
        self.wait_for_device()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_command_reports_exit_code_and_output() {
        let out = run_command("sh", &["-c", "echo hi; echo oops >&2"], COMMAND_TIMEOUT)
            .expect("command should run");
        assert_eq!(out.exit_code, Some(0));
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "hi");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[test]
    fn run_command_kills_on_timeout() {
        let err = run_command("sh", &["-c", "sleep 5"], Duration::from_millis(200))
            .expect_err("command should time out");
        assert!(matches!(err, AutomationError::PlatformError(_)));
    }

    #[test]
    fn run_command_does_not_deadlock_on_large_stdout() {
        let out = run_command(
            "sh",
            &[
                "-c",
                "i=0; while [ $i -lt 100000 ]; do echo 1234567890; i=$((i+1)); done",
            ],
            Duration::from_secs(10),
        )
        .expect("large-output command should complete without timing out");
        assert_eq!(out.exit_code, Some(0));
        assert!(out.stdout.len() >= 1_000_000);
    }
}

//! Microphone permission checking and requesting.

use cpal::traits::{DeviceTrait, HostTrait};
#[cfg(not(target_os = "windows"))]
use tracing::debug;

/// Check whether microphone access appears to be granted.
///
/// Probing the default input device's configuration is the closest
/// capability check the audio backend offers; it fails when the OS denies
/// capture access or no input device exists.
pub fn microphone_access_granted() -> bool {
    cpal::default_host()
        .default_input_device()
        .map(|d| d.default_input_config().is_ok())
        .unwrap_or(false)
}

/// Request microphone access from the user.
pub fn request_microphone_access() {
    open_microphone_settings();
}

/// Open the OS microphone privacy settings page.
#[cfg(target_os = "windows")]
pub fn open_microphone_settings() {
    let _ = std::process::Command::new("cmd")
        .args(["/C", "start", "ms-settings:privacy-microphone"])
        .spawn();
}

/// No settings deep-link on this platform.
#[cfg(not(target_os = "windows"))]
pub fn open_microphone_settings() {
    debug!("Microphone settings page is only available on Windows");
}

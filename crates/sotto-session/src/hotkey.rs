//! Global hotkey registration for push-to-talk.
//!
//! Registers a system-wide hotkey and forwards its press/release edges to a
//! [`SessionHandle`]. The handler runs in the hotkey manager's callback
//! context and therefore only touches the handle's pending flags.

use std::str::FromStr;

use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use tracing::info;

use sotto_core::{Result, SottoError};

use crate::controller::SessionHandle;

/// Configuration for the push-to-talk hotkey.
#[derive(Debug, Clone)]
pub struct HotkeyConfig {
    /// Key code string (e.g., "F9", "Ctrl+Shift+D").
    pub key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            key: "F9".to_string(),
        }
    }
}

/// Owns the registered push-to-talk hotkey for the application lifetime.
pub struct HotkeyService {
    manager: GlobalHotKeyManager,
    hotkey: Option<HotKey>,
    key: String,
}

impl HotkeyService {
    /// Register the hotkey and wire its edges into the session handle.
    ///
    /// Holding the key records; releasing it stops and transcribes.
    pub fn new(config: &HotkeyConfig, handle: SessionHandle) -> Result<Self> {
        let manager = GlobalHotKeyManager::new().map_err(|e| {
            SottoError::Hotkey(format!("Failed to create hotkey manager: {}", e))
        })?;

        let hotkey = HotKey::from_str(&config.key).map_err(|e| {
            SottoError::Hotkey(format!("Failed to parse hotkey '{}': {}", config.key, e))
        })?;

        manager.register(hotkey).map_err(|e| {
            SottoError::Hotkey(format!("Failed to register hotkey '{}': {}", config.key, e))
        })?;

        let id = hotkey.id();
        GlobalHotKeyEvent::set_event_handler(Some(move |event: GlobalHotKeyEvent| {
            if event.id() != id {
                return;
            }
            match event.state() {
                HotKeyState::Pressed => handle.press(),
                HotKeyState::Released => handle.release(),
            }
        }));

        info!(key = %config.key, "Global hotkey registered");

        Ok(Self {
            manager,
            hotkey: Some(hotkey),
            key: config.key.clone(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Unregister the hotkey and detach the event handler.
    pub fn unregister(&mut self) {
        if let Some(hotkey) = self.hotkey.take() {
            let _ = self.manager.unregister(hotkey);
            GlobalHotKeyEvent::set_event_handler(None::<fn(GlobalHotKeyEvent)>);
            info!(key = %self.key, "Global hotkey unregistered");
        }
    }
}

impl Drop for HotkeyService {
    fn drop(&mut self) {
        self.unregister();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hotkey_config_default() {
        let config = HotkeyConfig::default();
        assert_eq!(config.key, "F9");
    }

    #[test]
    fn test_hotkey_config_custom() {
        let config = HotkeyConfig {
            key: "Ctrl+Shift+D".to_string(),
        };
        assert_eq!(config.key, "Ctrl+Shift+D");
    }
}

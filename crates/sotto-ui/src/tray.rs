//! System tray icon management.
//!
//! On Windows, creates a system tray icon with a context menu using the
//! `tray-icon` crate. The icon color reflects the session state:
//! - Grey: Idle
//! - Red: Recording
//! - Orange: Processing
//!
//! On non-Windows, provides a stub that logs state changes.

#[cfg(not(target_os = "windows"))]
use tracing::debug;
use tracing::{error, info, warn};

use sotto_core::SottoError;
use sotto_session::{Notice, Presenter, SessionState};

#[cfg(target_os = "windows")]
const ICON_SIZE: u32 = 16;

/// Manages the system tray icon and surfaces transient notices.
pub struct TrayService {
    #[cfg(target_os = "windows")]
    tray: tray_icon::TrayIcon,
}

impl TrayService {
    /// Create the tray service and show the icon.
    #[cfg(target_os = "windows")]
    pub fn new() -> Result<Self, SottoError> {
        use tray_icon::menu::{Menu, MenuItem};
        use tray_icon::TrayIconBuilder;

        let menu = Menu::new();
        let status = MenuItem::new("Status: Ready", false, None);
        let _ = menu.append(&status);
        let _ = menu.append(&MenuItem::new("Quit", true, None));

        let tray = TrayIconBuilder::new()
            .with_tooltip(tooltip_for(SessionState::Idle))
            .with_icon(state_icon(SessionState::Idle)?)
            .with_menu(Box::new(menu))
            .build()
            .map_err(|e| SottoError::Config(format!("Failed to create tray icon: {}", e)))?;

        info!("System tray icon created");
        Ok(Self { tray })
    }

    /// Stub constructor for non-Windows platforms.
    #[cfg(not(target_os = "windows"))]
    pub fn new() -> Result<Self, SottoError> {
        warn!("System tray is only available on Windows");
        Ok(Self {})
    }
}

fn tooltip_for(state: SessionState) -> &'static str {
    match state {
        SessionState::Idle => "Sotto - Ready",
        SessionState::Recording => "Sotto - Recording...",
        SessionState::Processing => "Sotto - Processing...",
    }
}

/// Build a solid-color RGBA icon for the given state.
#[cfg(target_os = "windows")]
fn state_icon(state: SessionState) -> Result<tray_icon::Icon, SottoError> {
    let (r, g, b) = match state {
        SessionState::Idle => (80u8, 80u8, 80u8),
        SessionState::Recording => (220, 50, 50),
        SessionState::Processing => (255, 153, 0),
    };

    let mut rgba = Vec::with_capacity((ICON_SIZE * ICON_SIZE * 4) as usize);
    for _ in 0..(ICON_SIZE * ICON_SIZE) {
        rgba.extend_from_slice(&[r, g, b, 255]);
    }

    tray_icon::Icon::from_rgba(rgba, ICON_SIZE, ICON_SIZE)
        .map_err(|e| SottoError::Config(format!("Failed to create tray icon: {}", e)))
}

impl Presenter for TrayService {
    #[cfg(target_os = "windows")]
    fn state_changed(&self, state: SessionState) {
        match state_icon(state) {
            Ok(icon) => {
                let _ = self.tray.set_icon(Some(icon));
            }
            Err(e) => error!(error = %e, "Failed to paint tray icon"),
        }
        let _ = self.tray.set_tooltip(Some(tooltip_for(state)));
    }

    #[cfg(not(target_os = "windows"))]
    fn state_changed(&self, state: SessionState) {
        debug!(tooltip = tooltip_for(state), "Session state (no tray on this platform)");
    }

    fn level_changed(&self, _level: f32) {
        // The tray icon has no level readout.
    }

    fn notify(&self, notice: Notice, message: &str) {
        match notice {
            Notice::Info => info!("{}", message),
            Notice::Warning => warn!("{}", message),
            Notice::Error => error!("{}", message),
        }

        #[cfg(target_os = "windows")]
        {
            let _ = self.tray.set_tooltip(Some(message));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tooltips_per_state() {
        assert_eq!(tooltip_for(SessionState::Idle), "Sotto - Ready");
        assert_eq!(tooltip_for(SessionState::Recording), "Sotto - Recording...");
        assert_eq!(tooltip_for(SessionState::Processing), "Sotto - Processing...");
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_stub_service_accepts_events() {
        let service = TrayService::new().unwrap();
        service.state_changed(SessionState::Recording);
        service.level_changed(0.5);
        service.notify(Notice::Info, "hello");
    }
}

//! Audible cues for recording start and stop.
//!
//! Best-effort: playback is asynchronous, failures are swallowed, and
//! rapid toggles are debounced so hardware key-repeat cannot queue a
//! burst of sounds.

use std::cell::Cell;
use std::time::{Duration, Instant};

#[cfg(not(target_os = "windows"))]
use tracing::debug;

use sotto_session::CuePlayer;

/// Minimum interval between two cue plays.
pub const CUE_DEBOUNCE: Duration = Duration::from_millis(100);

enum Cue {
    Start,
    Stop,
}

/// Debounced start/stop sound cues.
pub struct Cues {
    min_interval: Duration,
    last_play: Cell<Option<Instant>>,
}

impl Default for Cues {
    fn default() -> Self {
        Self::new()
    }
}

impl Cues {
    pub fn new() -> Self {
        Self::with_min_interval(CUE_DEBOUNCE)
    }

    pub fn with_min_interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_play: Cell::new(None),
        }
    }

    /// Claim a play slot, enforcing the debounce interval.
    fn try_claim(&self) -> bool {
        let now = Instant::now();
        if let Some(last) = self.last_play.get() {
            if now.duration_since(last) < self.min_interval {
                return false;
            }
        }
        self.last_play.set(Some(now));
        true
    }

    fn play(&self, cue: Cue) {
        if self.try_claim() {
            play_system_sound(cue);
        }
    }
}

impl CuePlayer for Cues {
    fn start_cue(&self) {
        self.play(Cue::Start);
    }

    fn stop_cue(&self) {
        self.play(Cue::Stop);
    }
}

/// Play a system sound asynchronously.
#[cfg(target_os = "windows")]
fn play_system_sound(cue: Cue) {
    use windows_sys::Win32::UI::WindowsAndMessaging::{MessageBeep, MB_ICONASTERISK, MB_OK};

    let kind = match cue {
        Cue::Start => MB_OK,
        Cue::Stop => MB_ICONASTERISK,
    };
    unsafe {
        MessageBeep(kind);
    }
}

/// No system sound on this platform.
#[cfg(not(target_os = "windows"))]
fn play_system_sound(cue: Cue) {
    let name = match cue {
        Cue::Start => "start",
        Cue::Stop => "stop",
    };
    debug!(cue = name, "Sound cues are only available on Windows");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

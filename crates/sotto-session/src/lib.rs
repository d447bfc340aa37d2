//! Sotto session crate - the recording/transcription/typing state machine.
//!
//! Hotkey edge events arrive asynchronously and only set pending flags
//! through a [`SessionHandle`]; a fixed-interval poll tick on the owning
//! thread drains those flags and performs every actual state transition.
//! Stopping hands the captured buffer to a one-shot worker thread whose
//! result crosses back through an mpsc channel drained by the next tick,
//! so the poll loop never blocks on transcription.

use sotto_core::Result;

pub mod adapters;
pub mod controller;
pub mod hotkey;
pub mod state;

pub use adapters::CpalMicrophoneGate;
pub use controller::{ControllerTuning, SessionController, SessionHandle, POLL_INTERVAL};
pub use hotkey::{HotkeyConfig, HotkeyService};
pub use state::SessionState;

// =============================================================================
// Collaborator traits
// =============================================================================

/// Severity of a user-visible transient notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Info,
    Warning,
    Error,
}

/// One streaming microphone capture session (start/stop cycled per
/// dictation cycle).
///
/// Lives on the controller's thread; only [`Transcriber`] crosses threads.
pub trait CaptureSession {
    /// Open the capture stream. Failure is recoverable: the controller
    /// surfaces it and returns to idle.
    fn start(&mut self) -> Result<()>;

    /// Close the capture stream and return the buffered samples (empty if
    /// nothing was captured). Must not block on device teardown.
    fn stop(&mut self) -> Vec<f32>;

    /// Current loudness level in 0.0..=1.0 for the live meter.
    fn level(&self) -> f32;

    /// Whether the configured maximum recording duration has elapsed.
    fn exceeded_max_duration(&self) -> bool;
}

/// Blocking samples-to-text call; runs on a worker thread, never on the
/// poll thread.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, samples: &[f32]) -> Result<String>;
}

/// Delivers text to the focused application.
pub trait Injector {
    fn type_text(&self, text: &str) -> Result<()>;
}

/// Presentation surface: tray icon / indicator state, live level, and
/// transient notifications.
pub trait Presenter {
    fn state_changed(&self, state: SessionState);
    fn level_changed(&self, level: f32);
    fn notify(&self, notice: Notice, message: &str);
}

/// Microphone permission probe and request capability.
pub trait MicrophoneGate {
    fn access_granted(&self) -> bool;
    fn request_access(&self);
}

/// Start/stop sound cues. Implementations are best-effort and must not
/// block the poll thread.
pub trait CuePlayer {
    fn start_cue(&self);
    fn stop_cue(&self);
}

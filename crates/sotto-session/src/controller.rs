//! The session controller: a poll-driven state machine coordinating the
//! capture session, the transcription worker, and text injection.
//!
//! Single-writer discipline: only `poll`, running on the owning thread,
//! mutates session state. The hotkey callback context goes through a
//! [`SessionHandle`] that touches nothing but atomics.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use sotto_core::{Result, SottoError};

use crate::state::SessionState;
use crate::{CaptureSession, CuePlayer, Injector, MicrophoneGate, Notice, Presenter, Transcriber};

/// Interval at which the owning thread should call [`SessionController::poll`].
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Sentinel for "no stop has happened yet" in the debounce stamp.
const NO_STOP: u64 = u64::MAX;

/// Timing constants for the controller.
#[derive(Debug, Clone)]
pub struct ControllerTuning {
    /// Presses within this window after a completed cycle are ignored.
    /// Guards against hardware key-repeat and accidental double-triggers.
    pub press_cooldown: Duration,
}

impl Default for ControllerTuning {
    fn default() -> Self {
        Self {
            press_cooldown: Duration::from_millis(150),
        }
    }
}

/// Flags shared between the hotkey callback context and the poll thread.
///
/// `recording`/`processing` mirror the poll thread's state so the callback
/// can cheaply answer "is a cycle in flight"; the pending flags are the
/// only way the callback influences state.
#[derive(Debug)]
struct SharedFlags {
    pending_start: AtomicBool,
    pending_stop: AtomicBool,
    recording: AtomicBool,
    processing: AtomicBool,
    /// Milliseconds since the controller epoch of the last completed cycle.
    last_stop_ms: AtomicU64,
}

impl SharedFlags {
    fn new() -> Self {
        Self {
            pending_start: AtomicBool::new(false),
            pending_stop: AtomicBool::new(false),
            recording: AtomicBool::new(false),
            processing: AtomicBool::new(false),
            last_stop_ms: AtomicU64::new(NO_STOP),
        }
    }
}

/// Cloneable handle for the hotkey callback context.
///
/// `press` and `release` do minimal, non-blocking work: they read the busy
/// mirror and set pending flags. They never touch the audio stream, the
/// model, or presentation state.
#[derive(Clone)]
pub struct SessionHandle {
    flags: Arc<SharedFlags>,
    epoch: Instant,
    cooldown: Duration,
}

impl SessionHandle {
    /// Hotkey press edge: request a recording start.
    pub fn press(&self) {
        if self.flags.recording.load(Ordering::Relaxed)
            || self.flags.processing.load(Ordering::Relaxed)
        {
            return;
        }

        let last_stop = self.flags.last_stop_ms.load(Ordering::Relaxed);
        if last_stop != NO_STOP {
            let now_ms = self.epoch.elapsed().as_millis() as u64;
            if now_ms.saturating_sub(last_stop) < self.cooldown.as_millis() as u64 {
                return;
            }
        }

        self.flags.pending_start.store(true, Ordering::Relaxed);
    }

    /// Hotkey release edge: request a recording stop.
    pub fn release(&self) {
        if self.flags.recording.load(Ordering::Relaxed)
            || self.flags.pending_start.load(Ordering::Relaxed)
        {
            self.flags.pending_stop.store(true, Ordering::Relaxed);
        }
    }
}

/// Orchestrates one dictation cycle at a time across idle, recording, and
/// processing.
pub struct SessionController {
    capture: Box<dyn CaptureSession>,
    transcriber: Arc<dyn Transcriber>,
    injector: Box<dyn Injector>,
    presenter: Box<dyn Presenter>,
    gate: Box<dyn MicrophoneGate>,
    cues: Option<Box<dyn CuePlayer>>,
    flags: Arc<SharedFlags>,
    epoch: Instant,
    tuning: ControllerTuning,
    state: SessionState,
    /// Result channel for the in-flight transcription worker, one per stop.
    result_rx: Option<Receiver<Result<String>>>,
    cycle_id: Option<Uuid>,
    cycle_started_at: Option<DateTime<Utc>>,
}

impl SessionController {
    pub fn new(
        capture: Box<dyn CaptureSession>,
        transcriber: Arc<dyn Transcriber>,
        injector: Box<dyn Injector>,
        presenter: Box<dyn Presenter>,
        gate: Box<dyn MicrophoneGate>,
    ) -> Self {
        Self::with_tuning(
            capture,
            transcriber,
            injector,
            presenter,
            gate,
            ControllerTuning::default(),
        )
    }

    pub fn with_tuning(
        capture: Box<dyn CaptureSession>,
        transcriber: Arc<dyn Transcriber>,
        injector: Box<dyn Injector>,
        presenter: Box<dyn Presenter>,
        gate: Box<dyn MicrophoneGate>,
        tuning: ControllerTuning,
    ) -> Self {
        Self {
            capture,
            transcriber,
            injector,
            presenter,
            gate,
            cues: None,
            flags: Arc::new(SharedFlags::new()),
            epoch: Instant::now(),
            tuning,
            state: SessionState::Idle,
            result_rx: None,
            cycle_id: None,
            cycle_started_at: None,
        }
    }

    /// Attach start/stop sound cues.
    pub fn with_cues(mut self, cues: Box<dyn CuePlayer>) -> Self {
        self.cues = Some(cues);
        self
    }

    /// Handle for the hotkey callback context.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            flags: Arc::clone(&self.flags),
            epoch: self.epoch,
            cooldown: self.tuning.press_cooldown,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// One poll tick. The only place session state is mutated.
    pub fn poll(&mut self) {
        if self.flags.pending_start.swap(false, Ordering::Relaxed) {
            self.start_recording();
        }

        if self.flags.pending_stop.swap(false, Ordering::Relaxed) {
            self.stop_recording();
        }

        if self.state == SessionState::Recording {
            self.presenter.level_changed(self.capture.level());
            if self.capture.exceeded_max_duration() {
                // Handled as a synthesized stop on the next tick.
                self.flags.pending_stop.store(true, Ordering::Relaxed);
                self.presenter
                    .notify(Notice::Warning, "Max recording duration reached");
            }
        }

        self.drain_result();
    }

    fn set_state(&mut self, target: SessionState) {
        debug_assert!(self.state.can_transition_to(&target));
        debug!("Session state: {} -> {}", self.state, target);
        self.state = target;
        self.flags
            .recording
            .store(target == SessionState::Recording, Ordering::Relaxed);
        self.flags
            .processing
            .store(target == SessionState::Processing, Ordering::Relaxed);
        self.presenter.state_changed(target);
    }

    fn start_recording(&mut self) {
        if self.state != SessionState::Idle {
            return;
        }

        if !self.gate.access_granted() {
            warn!("Microphone permission not granted");
            self.gate.request_access();
            self.presenter.notify(
                Notice::Warning,
                "Please grant microphone access in Settings and try again.",
            );
            return;
        }

        let cycle = Uuid::new_v4();
        self.cycle_id = Some(cycle);
        self.cycle_started_at = Some(Utc::now());
        info!(cycle = %cycle, "Starting recording");

        self.flags.last_stop_ms.store(NO_STOP, Ordering::Relaxed);
        self.set_state(SessionState::Recording);
        if let Some(cues) = &self.cues {
            cues.start_cue();
        }

        if let Err(e) = self.capture.start() {
            error!(error = %e, "Failed to start recording");
            self.set_state(SessionState::Idle);
            self.cycle_id = None;
            self.cycle_started_at = None;
            self.presenter
                .notify(Notice::Error, &format!("Could not start recording: {}", e));
        }
    }

    fn stop_recording(&mut self) {
        if self.state != SessionState::Recording {
            return;
        }

        if let Some(started) = self.cycle_started_at {
            let elapsed = (Utc::now() - started).num_milliseconds() as f32 / 1000.0;
            info!(cycle = ?self.cycle_id, elapsed_secs = elapsed, "Stopping recording");
        }

        self.set_state(SessionState::Processing);
        if let Some(cues) = &self.cues {
            cues.stop_cue();
        }

        let samples = self.capture.stop();
        debug!(samples = samples.len(), "Captured audio buffer");

        let (tx, rx) = mpsc::channel();
        self.result_rx = Some(rx);
        let transcriber = Arc::clone(&self.transcriber);
        std::thread::spawn(move || {
            let result = transcriber.transcribe(&samples);
            let _ = tx.send(result);
        });
    }

    fn drain_result(&mut self) {
        let delivered = match &self.result_rx {
            None => return,
            Some(rx) => match rx.try_recv() {
                Ok(result) => result,
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => Err(SottoError::Transcription(
                    "transcription worker terminated without a result".to_string(),
                )),
            },
        };

        self.result_rx = None;
        self.finish_cycle(delivered);
    }

    fn finish_cycle(&mut self, result: Result<String>) {
        if self.state != SessionState::Processing {
            return;
        }

        match result {
            Ok(text) if !text.is_empty() => {
                info!(chars = text.chars().count(), "Transcription complete");
                if let Err(e) = self.injector.type_text(&text) {
                    error!(error = %e, "Failed to inject text");
                    self.presenter.notify(
                        Notice::Error,
                        &format!("Could not insert transcribed text: {}", e),
                    );
                }
            }
            Ok(_) => debug!("Transcription returned no text"),
            Err(e) => {
                error!(error = %e, "Transcription failed");
                self.presenter.notify(Notice::Error, &e.to_string());
            }
        }

        self.set_state(SessionState::Idle);
        self.cycle_id = None;
        self.cycle_started_at = None;
        self.flags
            .last_stop_ms
            .store(self.epoch.elapsed().as_millis() as u64, Ordering::Relaxed);
    }
}

// =============================================================================
// Tests
// =============================================================================

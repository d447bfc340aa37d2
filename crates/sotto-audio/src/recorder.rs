//! Callback-driven microphone capture with safe stop/start cycling.
//!
//! One `Recorder` persists for the lifetime of the application and is
//! started and stopped once per dictation cycle. Stopping hands the stream
//! handle to a teardown thread; starting waits (bounded) for that teardown
//! to finish before opening the next stream, which is what prevents
//! device-busy errors from the OS audio layer.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, StreamTrait};
use tracing::{debug, error, info, warn};

use sotto_core::config::AudioConfig;
use sotto_core::{DeviceSelector, Result, SottoError};

use crate::devices::resolve_input_device;

/// Tuning constants for the capture lifecycle.
///
/// These values are empirical: they usually avoid device-busy errors in
/// practice, but none of them is a hard guarantee. Override per instance
/// if a particular driver needs more slack.
#[derive(Debug, Clone)]
pub struct RecorderTuning {
    /// Bounded wait for the previous stream's teardown before starting.
    pub cleanup_wait: Duration,
    /// Delay after teardown completes, letting the OS release the device.
    pub settle_delay: Duration,
    /// Requested frames per callback block. Small blocks keep the level
    /// meter responsive; throughput is irrelevant at speech rates.
    pub meter_block_frames: u32,
    /// Scale applied to per-block RMS to map it into the 0..1 meter range.
    pub rms_level_scale: f32,
}

impl Default for RecorderTuning {
    fn default() -> Self {
        Self {
            cleanup_wait: Duration::from_millis(500),
            settle_delay: Duration::from_millis(150),
            meter_block_frames: 512,
            rms_level_scale: 15.0,
        }
    }
}

/// Signals completion of an asynchronous stream teardown.
///
/// `begin` marks a teardown as pending, `finish` resolves it, and `wait`
/// blocks the caller up to a bound. Freshly created gates start resolved.
#[derive(Debug, Clone)]
pub struct CleanupGate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Default for CleanupGate {
    fn default() -> Self {
        Self::new()
    }
}

impl CleanupGate {
    pub fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(true), Condvar::new())),
        }
    }

    /// Mark a teardown as in progress.
    pub fn begin(&self) {
        let (lock, _) = &*self.inner;
        *lock.lock().expect("cleanup mutex poisoned") = false;
    }

    /// Mark the pending teardown as finished and wake any waiter.
    pub fn finish(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().expect("cleanup mutex poisoned") = true;
        cvar.notify_all();
    }

    /// Whether a teardown is still in progress.
    pub fn pending(&self) -> bool {
        let (lock, _) = &*self.inner;
        !*lock.lock().expect("cleanup mutex poisoned")
    }

    /// Wait up to `timeout` for the pending teardown to finish.
    ///
    /// Returns `true` if the teardown completed within the bound.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().expect("cleanup mutex poisoned");
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |complete| !*complete)
            .expect("cleanup mutex poisoned");
        *guard
    }
}

/// Sample sink shared between the stream callback and the owning recorder.
///
/// The callback runs on the audio subsystem's own thread; everything it
/// touches lives here behind thread-safe primitives. The level is stored
/// as f32 bits in an atomic so the poll thread reads it without locking.
#[derive(Debug, Clone)]
struct CaptureFeed {
    recording: Arc<AtomicBool>,
    blocks: Arc<Mutex<Vec<Vec<f32>>>>,
    level_bits: Arc<AtomicU32>,
    rms_level_scale: f32,
}

impl CaptureFeed {
    fn new(rms_level_scale: f32) -> Self {
        Self {
            recording: Arc::new(AtomicBool::new(false)),
            blocks: Arc::new(Mutex::new(Vec::new())),
            level_bits: Arc::new(AtomicU32::new(0.0f32.to_bits())),
            rms_level_scale,
        }
    }

    /// Append a copy of one callback block and update the meter level.
    fn ingest(&self, block: &[f32]) {
        if block.is_empty() || !self.recording.load(Ordering::Relaxed) {
            return;
        }

        self.blocks
            .lock()
            .expect("capture buffer mutex poisoned")
            .push(block.to_vec());

        let mean_square = block.iter().map(|s| s * s).sum::<f32>() / block.len() as f32;
        let level = (mean_square.sqrt() * self.rms_level_scale).min(1.0);
        self.level_bits.store(level.to_bits(), Ordering::Relaxed);
    }

    fn level(&self) -> f32 {
        f32::from_bits(self.level_bits.load(Ordering::Relaxed))
    }

    fn reset(&self) {
        self.blocks
            .lock()
            .expect("capture buffer mutex poisoned")
            .clear();
        self.level_bits.store(0.0f32.to_bits(), Ordering::Relaxed);
    }

    /// Drain all buffered blocks into one flat sample array.
    fn drain_flat(&self) -> Vec<f32> {
        let blocks = std::mem::take(
            &mut *self
                .blocks
                .lock()
                .expect("capture buffer mutex poisoned"),
        );
        blocks.concat()
    }
}

/// Wrapper to move a `cpal::Stream` across threads for teardown.
///
/// `cpal::Stream` carries a `*mut ()` marker that prevents auto
/// `Send`/`Sync`. The handle is only ever played once and then dropped on
/// the teardown thread; no data is shared through it.
struct SendStream(cpal::Stream);

// SAFETY: the stream handle is owned exclusively by the recorder until it
// moves to the teardown thread, which pauses and drops it. The audio
// callback runs on a thread cpal manages and communicates only through the
// thread-safe CaptureFeed.
unsafe impl Send for SendStream {}

/// Microphone capture session for one push-to-talk application run.
pub struct Recorder {
    sample_rate: u32,
    channels: u16,
    device: Option<DeviceSelector>,
    max_duration: Duration,
    tuning: RecorderTuning,
    feed: CaptureFeed,
    stream: Option<SendStream>,
    cleanup: CleanupGate,
    started_at: Option<Instant>,
}

impl Recorder {
    pub fn new(config: &AudioConfig) -> Self {
        Self::with_tuning(config, RecorderTuning::default())
    }

    pub fn with_tuning(config: &AudioConfig, tuning: RecorderTuning) -> Self {
        let feed = CaptureFeed::new(tuning.rms_level_scale);
        Self {
            sample_rate: config.sample_rate,
            channels: config.channels,
            device: config.input_device.clone(),
            max_duration: Duration::from_secs(config.max_duration_secs),
            tuning,
            feed,
            stream: None,
            cleanup: CleanupGate::new(),
            started_at: None,
        }
    }

    /// Start a new capture stream.
    ///
    /// Waits (bounded) for any pending teardown from the previous cycle,
    /// then opens a fresh stream after a short settle delay. On failure the
    /// recorder is left in a clean, non-recording state and the error is
    /// recoverable: the caller surfaces it and stays idle.
    pub fn start(&mut self) -> Result<()> {
        if !self.cleanup.wait(self.tuning.cleanup_wait) {
            warn!("Stream cleanup taking longer than expected");
        }
        std::thread::sleep(self.tuning.settle_delay);

        self.feed.reset();
        self.feed.recording.store(true, Ordering::Relaxed);
        self.started_at = Some(Instant::now());

        match self.open_stream() {
            Ok(stream) => {
                self.stream = Some(stream);
                debug!(
                    sample_rate = self.sample_rate,
                    channels = self.channels,
                    "Capture stream started"
                );
                Ok(())
            }
            Err(e) => {
                self.feed.recording.store(false, Ordering::Relaxed);
                self.started_at = None;
                Err(e)
            }
        }
    }

    fn open_stream(&self) -> Result<SendStream> {
        let device = resolve_input_device(self.device.as_ref())?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let stream_config = cpal::StreamConfig {
            channels: self.channels,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(self.tuning.meter_block_frames),
        };

        let feed = self.feed.clone();
        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| feed.ingest(data),
                |err| error!("Capture stream error: {}", err),
                None,
            )
            .map_err(|e| {
                SottoError::Audio(format!(
                    "Failed to open capture stream on '{}': {}",
                    device_name, e
                ))
            })?;

        stream
            .play()
            .map_err(|e| SottoError::Audio(format!("Failed to start capture stream: {}", e)))?;

        info!(device = %device_name, "Recording from input device");
        Ok(SendStream(stream))
    }

    /// Stop recording and return the captured samples as one flat array.
    ///
    /// Teardown of the stream handle happens on a worker thread so the
    /// caller is never blocked by device-driver latency; errors during
    /// teardown are swallowed. Returns an empty array if no blocks arrived.
    pub fn stop(&mut self) -> Vec<f32> {
        self.feed.recording.store(false, Ordering::Relaxed);
        self.started_at = None;

        if let Some(stream) = self.stream.take() {
            self.cleanup.begin();
            let gate = self.cleanup.clone();
            std::thread::spawn(move || {
                let _ = stream.0.pause();
                drop(stream);
                gate.finish();
            });
        }

        self.feed.drain_flat()
    }

    /// Current meter level in 0.0..=1.0.
    pub fn level(&self) -> f32 {
        self.feed.level()
    }

    pub fn is_recording(&self) -> bool {
        self.feed.recording.load(Ordering::Relaxed)
    }

    /// Whether a previous stream's teardown is still in progress.
    pub fn cleanup_pending(&self) -> bool {
        self.cleanup.pending()
    }

    /// True iff recording, a limit is configured, and the limit has elapsed.
    pub fn exceeded_max_duration(&self) -> bool {
        if !self.is_recording() || self.max_duration.is_zero() {
            return false;
        }
        match self.started_at {
            Some(started) => started.elapsed() >= self.max_duration,
            None => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

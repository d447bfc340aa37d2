//! Sotto transcribe crate - speech model gateway with lazy, fallback-capable
//! loading.
//!
//! The speech model itself is a black box behind the [`SpeechModel`] and
//! [`ModelFactory`] traits: samples in, segment texts out, with a load-time
//! cost and a device-selection capability. [`gateway::TranscriptionGateway`]
//! owns the load state machine; a real whisper.cpp factory lives behind the
//! `whisper` cargo feature, and mock implementations support testing without
//! any model.

use std::fmt;
use std::sync::{Arc, Mutex};

use sotto_core::{Result, SottoError};

pub mod gateway;
#[cfg(feature = "whisper")]
pub mod whisper_backend;

pub use gateway::TranscriptionGateway;

// =============================================================================
// Device and precision selection
// =============================================================================

/// Inference device requested by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePreference {
    /// Probe for an accelerator and commit to the probe result.
    Auto,
    Cpu,
    Accelerated,
}

impl DevicePreference {
    /// Parse the configuration string ("auto" | "cpu" | "gpu").
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "auto" => Ok(DevicePreference::Auto),
            "cpu" => Ok(DevicePreference::Cpu),
            "gpu" => Ok(DevicePreference::Accelerated),
            other => Err(SottoError::Config(format!(
                "Unknown inference device '{}' (expected auto, cpu, or gpu)",
                other
            ))),
        }
    }
}

/// Concrete device a model is constructed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelDevice {
    Cpu,
    Accelerated,
}

impl fmt::Display for ModelDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelDevice::Cpu => write!(f, "cpu"),
            ModelDevice::Accelerated => write!(f, "gpu"),
        }
    }
}

/// Compute precision a model is constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputePrecision {
    Int8,
    Float16,
}

impl ComputePrecision {
    /// Parse the configuration string ("int8" | "float16").
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "int8" => Ok(ComputePrecision::Int8),
            "float16" => Ok(ComputePrecision::Float16),
            other => Err(SottoError::Config(format!(
                "Unknown compute precision '{}' (expected int8 or float16)",
                other
            ))),
        }
    }
}

impl fmt::Display for ComputePrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputePrecision::Int8 => write!(f, "int8"),
            ComputePrecision::Float16 => write!(f, "float16"),
        }
    }
}

// =============================================================================
// Black-box model traits
// =============================================================================

/// Options passed to the model for one transcription call.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscribeOptions {
    /// Beam search width.
    pub beam_size: usize,
    /// Filter out non-speech regions before decoding.
    pub vad_filter: bool,
    /// Transcription language code.
    pub language: String,
    /// Conditioning prompt; `None` when no prompt is configured (the
    /// model's own "no prompt" convention, never an empty string).
    pub initial_prompt: Option<String>,
}

/// A constructed speech model: samples in, segment texts out.
pub trait SpeechModel: Send {
    /// Run inference over the samples, returning raw segment texts.
    fn transcribe(&mut self, samples: &[f32], options: &TranscribeOptions)
        -> Result<Vec<String>>;
}

/// Constructs speech models and probes device capabilities.
pub trait ModelFactory: Send + Sync {
    /// Whether an accelerated compute device is available to the runtime.
    fn accelerator_available(&self) -> bool;

    /// Construct a model of the given size on the given device.
    fn build(
        &self,
        size: &str,
        device: ModelDevice,
        precision: ComputePrecision,
    ) -> Result<Box<dyn SpeechModel>>;
}

// =============================================================================
// Mock implementations
// =============================================================================

/// Mock speech model returning fixed segments and recording the options of
/// the most recent call.
pub struct MockSpeechModel {
    segments: Vec<String>,
    last_options: Arc<Mutex<Option<TranscribeOptions>>>,
}

impl MockSpeechModel {
    pub fn returning(segments: &[&str]) -> Self {
        Self {
            segments: segments.iter().map(|s| s.to_string()).collect(),
            last_options: Arc::new(Mutex::new(None)),
        }
    }

    /// Shared handle to the options seen by the most recent call.
    pub fn options_probe(&self) -> Arc<Mutex<Option<TranscribeOptions>>> {
        Arc::clone(&self.last_options)
    }
}

impl SpeechModel for MockSpeechModel {
    fn transcribe(
        &mut self,
        _samples: &[f32],
        options: &TranscribeOptions,
    ) -> Result<Vec<String>> {
        *self.last_options.lock().expect("options mutex poisoned") = Some(options.clone());
        Ok(self.segments.clone())
    }
}

/// Mock model factory with a configurable accelerator probe, a scriptable
/// number of initial build failures, and a build-attempt counter.
pub struct MockModelFactory {
    accelerated: bool,
    failures_before_success: Mutex<usize>,
    attempts: Mutex<Vec<(ModelDevice, ComputePrecision)>>,
    segments: Vec<String>,
}

impl MockModelFactory {
    pub fn new(accelerated: bool) -> Self {
        Self {
            accelerated,
            failures_before_success: Mutex::new(0),
            attempts: Mutex::new(Vec::new()),
            segments: vec!["[mock transcription]".to_string()],
        }
    }

    /// Fail the first `n` build calls before succeeding.
    pub fn failing_first(mut self, n: usize) -> Self {
        self.failures_before_success = Mutex::new(n);
        self
    }

    /// Segments every built model will return.
    pub fn with_segments(mut self, segments: &[&str]) -> Self {
        self.segments = segments.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Every `(device, precision)` pair `build` was called with, in order.
    pub fn attempts(&self) -> Vec<(ModelDevice, ComputePrecision)> {
        self.attempts.lock().expect("attempts mutex poisoned").clone()
    }
}

impl ModelFactory for MockModelFactory {
    fn accelerator_available(&self) -> bool {
        self.accelerated
    }

    fn build(
        &self,
        _size: &str,
        device: ModelDevice,
        precision: ComputePrecision,
    ) -> Result<Box<dyn SpeechModel>> {
        self.attempts
            .lock()
            .expect("attempts mutex poisoned")
            .push((device, precision));

        let mut remaining = self
            .failures_before_success
            .lock()
            .expect("failures mutex poisoned");
        if *remaining > 0 {
            *remaining -= 1;
            return Err(SottoError::Transcription(format!(
                "mock build failure on {}",
                device
            )));
        }

        Ok(Box::new(MockSpeechModel::returning(
            &self.segments.iter().map(String::as_str).collect::<Vec<_>>(),
        )))
    }
}

// =============================================================================
// Tests
// =============================================================================

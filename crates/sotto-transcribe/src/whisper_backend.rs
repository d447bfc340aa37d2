//! Real Whisper model factory via whisper-rs (whisper.cpp bindings).
//!
//! Compiled only with the `whisper` feature. Model sizes resolve to GGML
//! files (`ggml-<size>.bin`) under a models directory. The `cuda` feature
//! enables accelerated inference and is what the capability probe reports.

use std::path::PathBuf;

use tracing::info;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use sotto_core::{Result, SottoError};

use crate::{ComputePrecision, ModelDevice, ModelFactory, SpeechModel, TranscribeOptions};

/// Builds whisper.cpp-backed speech models.
pub struct WhisperFactory {
    models_dir: PathBuf,
}

impl WhisperFactory {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    fn model_path(&self, size: &str) -> PathBuf {
        self.models_dir.join(format!("ggml-{}.bin", size))
    }
}

impl ModelFactory for WhisperFactory {
    fn accelerator_available(&self) -> bool {
        cfg!(feature = "cuda")
    }

    fn build(
        &self,
        size: &str,
        device: ModelDevice,
        _precision: ComputePrecision,
    ) -> Result<Box<dyn SpeechModel>> {
        let path = self.model_path(size);
        if !path.exists() {
            return Err(SottoError::ModelUnavailable(format!(
                "Whisper model file not found: {}",
                path.display()
            )));
        }

        info!(model = %path.display(), device = %device, "Loading Whisper model");

        let mut params = WhisperContextParameters::default();
        params.use_gpu(matches!(device, ModelDevice::Accelerated));

        let path_str = path.to_str().ok_or_else(|| {
            SottoError::ModelUnavailable(format!(
                "Whisper model path is not valid UTF-8: {}",
                path.display()
            ))
        })?;
        let ctx = WhisperContext::new_with_params(path_str, params).map_err(|e| {
            SottoError::ModelUnavailable(format!("Failed to load Whisper model: {}", e))
        })?;

        info!("Whisper model loaded");
        Ok(Box::new(WhisperSpeechModel { ctx }))
    }
}

struct WhisperSpeechModel {
    ctx: WhisperContext,
}

impl SpeechModel for WhisperSpeechModel {
    fn transcribe(
        &mut self,
        samples: &[f32],
        options: &TranscribeOptions,
    ) -> Result<Vec<String>> {
        let mut state = self.ctx.create_state().map_err(|e| {
            SottoError::Transcription(format!("Failed to create Whisper state: {}", e))
        })?;

        let mut params = FullParams::new(SamplingStrategy::BeamSearch {
            beam_size: options.beam_size as std::os::raw::c_int,
            patience: -1.0,
        });
        params.set_language(Some(options.language.as_str()));
        params.set_suppress_non_speech_tokens(options.vad_filter);
        if let Some(prompt) = options.initial_prompt.as_deref() {
            params.set_initial_prompt(prompt);
        }
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, samples)
            .map_err(|e| SottoError::Transcription(format!("Whisper inference failed: {}", e)))?;

        let n_segments = state.full_n_segments().map_err(|e| {
            SottoError::Transcription(format!("Failed to get segment count: {}", e))
        })?;

        let mut segments = Vec::with_capacity(n_segments as usize);
        for i in 0..n_segments {
            let text = state.full_get_segment_text(i).map_err(|e| {
                SottoError::Transcription(format!("Failed to get segment {} text: {}", i, e))
            })?;
            segments.push(text);
        }
        Ok(segments)
    }
}

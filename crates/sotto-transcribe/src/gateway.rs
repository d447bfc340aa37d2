//! Transcription gateway: lazy, memoized, fallback-capable model loading
//! plus the single blocking samples-to-text call.
//!
//! Load state is an explicit machine (`Unloaded` / `Loaded` / `Failed`)
//! guarded by one initialization routine, so the fallback-retry path is a
//! visible transition rather than a null check on every call. The device
//! probe for "auto" happens exactly once, at construction; model
//! construction itself is deferred to the first transcription (or an
//! explicit pre-warm) and memoized.

use std::sync::Mutex;

use tracing::{info, warn};

use sotto_core::config::ModelConfig;
use sotto_core::{Result, SottoError};

use crate::{
    ComputePrecision, DevicePreference, ModelDevice, ModelFactory, SpeechModel,
    TranscribeOptions,
};

/// Beam search width used for every transcription call.
pub const BEAM_WIDTH: usize = 5;

enum ModelState {
    Unloaded,
    Loaded(Box<dyn SpeechModel>),
    Failed,
}

struct GatewayState {
    model: ModelState,
    /// Device and precision the loaded model was actually built with.
    effective: Option<(ModelDevice, ComputePrecision)>,
}

/// Wraps the black-box speech model behind a blocking samples-to-text call.
///
/// The call is CPU/accelerator-bound; callers must not invoke it on a
/// latency-sensitive thread.
pub struct TranscriptionGateway {
    factory: Box<dyn ModelFactory>,
    model_size: String,
    language: String,
    initial_prompt: String,
    resolved_device: ModelDevice,
    resolved_precision: ComputePrecision,
    state: Mutex<GatewayState>,
}

impl TranscriptionGateway {
    /// Construct a gateway, resolving the configured device immediately.
    ///
    /// "auto" probes the factory's accelerator capability once and commits:
    /// {accelerated, float16} on success, {cpu, int8} otherwise. Explicit
    /// devices keep the configured precision.
    pub fn new(factory: Box<dyn ModelFactory>, config: &ModelConfig) -> Result<Self> {
        let preference = DevicePreference::parse(&config.device)?;
        let precision = ComputePrecision::parse(&config.precision)?;

        let (resolved_device, resolved_precision) = match preference {
            DevicePreference::Auto => {
                if factory.accelerator_available() {
                    info!("Accelerated compute device detected");
                    (ModelDevice::Accelerated, ComputePrecision::Float16)
                } else {
                    (ModelDevice::Cpu, ComputePrecision::Int8)
                }
            }
            DevicePreference::Cpu => (ModelDevice::Cpu, precision),
            DevicePreference::Accelerated => (ModelDevice::Accelerated, precision),
        };

        Ok(Self {
            factory,
            model_size: config.size.clone(),
            language: config.language.clone(),
            initial_prompt: config.initial_prompt.clone(),
            resolved_device,
            resolved_precision,
            state: Mutex::new(GatewayState {
                model: ModelState::Unloaded,
                effective: None,
            }),
        })
    }

    /// Load the model if it is not loaded yet. Idempotent.
    ///
    /// A failed accelerated load is retried once as {cpu, int8}; if that
    /// also fails the gateway enters the terminal `Failed` state and every
    /// call reports `ModelUnavailable`. Call at startup to pre-warm and
    /// fail fast.
    pub fn ensure_loaded(&self) -> Result<()> {
        let mut state = self.state.lock().expect("gateway state mutex poisoned");
        self.load_if_needed(&mut state)
    }

    /// Transcribe the samples to text.
    ///
    /// Empty input short-circuits to an empty string without touching the
    /// model. Segment texts are trimmed and joined with single spaces.
    pub fn transcribe(&self, samples: &[f32]) -> Result<String> {
        if samples.is_empty() {
            return Ok(String::new());
        }

        let mut state = self.state.lock().expect("gateway state mutex poisoned");
        self.load_if_needed(&mut state)?;

        let ModelState::Loaded(model) = &mut state.model else {
            return Err(SottoError::ModelUnavailable(
                "speech model is not loaded".to_string(),
            ));
        };

        let prompt = self.initial_prompt.trim();
        let options = TranscribeOptions {
            beam_size: BEAM_WIDTH,
            vad_filter: true,
            language: self.language.clone(),
            initial_prompt: if prompt.is_empty() {
                None
            } else {
                Some(prompt.to_string())
            },
        };

        let segments = model.transcribe(samples, &options).map_err(|e| match e {
            SottoError::Transcription(_) => e,
            other => SottoError::Transcription(format!("Transcription failed: {}", other)),
        })?;

        let text = segments
            .iter()
            .map(|s| s.trim())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(text.trim().to_string())
    }

    /// Device the loaded model was built on, if loaded.
    pub fn effective_device(&self) -> Option<ModelDevice> {
        self.state
            .lock()
            .expect("gateway state mutex poisoned")
            .effective
            .map(|(device, _)| device)
    }

    /// Precision the loaded model was built with, if loaded.
    pub fn effective_precision(&self) -> Option<ComputePrecision> {
        self.state
            .lock()
            .expect("gateway state mutex poisoned")
            .effective
            .map(|(_, precision)| precision)
    }

    fn load_if_needed(&self, state: &mut GatewayState) -> Result<()> {
        match state.model {
            ModelState::Loaded(_) => Ok(()),
            ModelState::Failed => Err(SottoError::ModelUnavailable(
                "speech model failed to load previously".to_string(),
            )),
            ModelState::Unloaded => {
                info!(
                    size = %self.model_size,
                    device = %self.resolved_device,
                    precision = %self.resolved_precision,
                    "Loading speech model"
                );

                match self.factory.build(
                    &self.model_size,
                    self.resolved_device,
                    self.resolved_precision,
                ) {
                    Ok(model) => {
                        state.model = ModelState::Loaded(model);
                        state.effective =
                            Some((self.resolved_device, self.resolved_precision));
                        info!("Speech model loaded");
                        Ok(())
                    }
                    Err(first) if self.resolved_device == ModelDevice::Accelerated => {
                        warn!(
                            error = %first,
                            "Accelerated model load failed, retrying on cpu"
                        );
                        match self.factory.build(
                            &self.model_size,
                            ModelDevice::Cpu,
                            ComputePrecision::Int8,
                        ) {
                            Ok(model) => {
                                state.model = ModelState::Loaded(model);
                                state.effective =
                                    Some((ModelDevice::Cpu, ComputePrecision::Int8));
                                info!("Fallback model load succeeded on cpu");
                                Ok(())
                            }
                            Err(second) => {
                                state.model = ModelState::Failed;
                                Err(SottoError::ModelUnavailable(format!(
                                    "accelerated load failed ({}); cpu fallback failed ({})",
                                    first, second
                                )))
                            }
                        }
                    }
                    Err(e) => {
                        state.model = ModelState::Failed;
                        Err(SottoError::ModelUnavailable(format!(
                            "model load failed: {}",
                            e
                        )))
                    }
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockModelFactory;

    fn model_config(device: &str, prompt: &str) -> ModelConfig {
        ModelConfig {
            size: "small".to_string(),
            language: "en".to_string(),
            precision: "int8".to_string(),
            device: device.to_string(),
            initial_prompt: prompt.to_string(),
        }
    }

    /// Build a gateway sharing an attempt counter with the caller.
    fn gateway_with(
        factory: MockModelFactory,
        config: &ModelConfig,
    ) -> (TranscriptionGateway, std::sync::Arc<MockModelFactory>) {
        let factory = std::sync::Arc::new(factory);
        let shared = std::sync::Arc::clone(&factory);

        struct SharedFactory(std::sync::Arc<MockModelFactory>);
        impl ModelFactory for SharedFactory {
            fn accelerator_available(&self) -> bool {
                self.0.accelerator_available()
            }
            fn build(
                &self,
                size: &str,
                device: ModelDevice,
                precision: ComputePrecision,
            ) -> Result<Box<dyn SpeechModel>> {
                self.0.build(size, device, precision)
            }
        }

        let gateway =
            TranscriptionGateway::new(Box::new(SharedFactory(factory)), config).unwrap();
        (gateway, shared)
    }

    #[test]
    fn test_empty_input_short_circuits_without_loading() {
        let (gateway, factory) =
            gateway_with(MockModelFactory::new(false), &model_config("cpu", ""));
        let text = gateway.transcribe(&[]).unwrap();
        assert_eq!(text, "");
        assert!(factory.attempts().is_empty());
    }

    #[test]
    fn test_segments_joined_with_single_spaces() {
        let (gateway, _) = gateway_with(
            MockModelFactory::new(false).with_segments(&[" Hello ", "world "]),
            &model_config("cpu", ""),
        );
        let text = gateway.transcribe(&[0.1; 160]).unwrap();
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn test_model_loaded_once_across_calls() {
        let (gateway, factory) =
            gateway_with(MockModelFactory::new(false), &model_config("cpu", ""));
        gateway.transcribe(&[0.1; 16]).unwrap();
        gateway.transcribe(&[0.2; 16]).unwrap();
        assert_eq!(factory.attempts().len(), 1);
    }

    #[test]
    fn test_prewarm_then_transcribe_loads_once() {
        let (gateway, factory) =
            gateway_with(MockModelFactory::new(false), &model_config("cpu", ""));
        gateway.ensure_loaded().unwrap();
        gateway.transcribe(&[0.1; 16]).unwrap();
        assert_eq!(factory.attempts().len(), 1);
    }

    #[test]
    fn test_auto_without_accelerator_resolves_cpu_int8() {
        let (gateway, factory) =
            gateway_with(MockModelFactory::new(false), &model_config("auto", ""));
        gateway.ensure_loaded().unwrap();
        assert_eq!(gateway.effective_device(), Some(ModelDevice::Cpu));
        assert_eq!(gateway.effective_precision(), Some(ComputePrecision::Int8));
        assert_eq!(
            factory.attempts(),
            vec![(ModelDevice::Cpu, ComputePrecision::Int8)]
        );
    }

    #[test]
    fn test_auto_with_accelerator_resolves_accelerated_float16() {
        let (gateway, factory) =
            gateway_with(MockModelFactory::new(true), &model_config("auto", ""));
        gateway.ensure_loaded().unwrap();
        assert_eq!(gateway.effective_device(), Some(ModelDevice::Accelerated));
        assert_eq!(
            gateway.effective_precision(),
            Some(ComputePrecision::Float16)
        );
        assert_eq!(
            factory.attempts(),
            vec![(ModelDevice::Accelerated, ComputePrecision::Float16)]
        );
    }

    #[test]
    fn test_accelerated_failure_falls_back_to_cpu_int8() {
        let (gateway, factory) = gateway_with(
            MockModelFactory::new(true).failing_first(1),
            &model_config("gpu", ""),
        );
        gateway.ensure_loaded().unwrap();

        // Exactly two construction attempts: accelerated, then the cpu retry.
        assert_eq!(
            factory.attempts(),
            vec![
                (ModelDevice::Accelerated, ComputePrecision::Int8),
                (ModelDevice::Cpu, ComputePrecision::Int8),
            ]
        );
        assert_eq!(gateway.effective_device(), Some(ModelDevice::Cpu));
        assert_eq!(gateway.effective_precision(), Some(ComputePrecision::Int8));
    }

    #[test]
    fn test_accelerated_double_failure_is_unavailable_and_sticky() {
        let (gateway, factory) = gateway_with(
            MockModelFactory::new(true).failing_first(2),
            &model_config("gpu", ""),
        );

        let err = gateway.ensure_loaded().unwrap_err();
        assert!(matches!(err, SottoError::ModelUnavailable(_)));
        assert_eq!(factory.attempts().len(), 2);

        // Failed state is terminal: no further load attempts.
        let err = gateway.transcribe(&[0.1; 16]).unwrap_err();
        assert!(matches!(err, SottoError::ModelUnavailable(_)));
        assert_eq!(factory.attempts().len(), 2);
    }

    #[test]
    fn test_cpu_failure_has_no_fallback() {
        let (gateway, factory) = gateway_with(
            MockModelFactory::new(false).failing_first(1),
            &model_config("cpu", ""),
        );
        let err = gateway.ensure_loaded().unwrap_err();
        assert!(matches!(err, SottoError::ModelUnavailable(_)));
        assert_eq!(factory.attempts().len(), 1);
    }

    /// Factory whose built models record the options of each call.
    struct CapturingFactory {
        probe: std::sync::Arc<Mutex<Option<TranscribeOptions>>>,
    }

    impl CapturingFactory {
        fn new() -> (Self, std::sync::Arc<Mutex<Option<TranscribeOptions>>>) {
            let probe = std::sync::Arc::new(Mutex::new(None));
            (
                Self {
                    probe: std::sync::Arc::clone(&probe),
                },
                probe,
            )
        }
    }

    impl ModelFactory for CapturingFactory {
        fn accelerator_available(&self) -> bool {
            false
        }
        fn build(
            &self,
            _size: &str,
            _device: ModelDevice,
            _precision: ComputePrecision,
        ) -> Result<Box<dyn SpeechModel>> {
            struct CapturingModel {
                probe: std::sync::Arc<Mutex<Option<TranscribeOptions>>>,
            }
            impl SpeechModel for CapturingModel {
                fn transcribe(
                    &mut self,
                    _samples: &[f32],
                    options: &TranscribeOptions,
                ) -> Result<Vec<String>> {
                    *self.probe.lock().unwrap() = Some(options.clone());
                    Ok(vec!["ok".to_string()])
                }
            }
            Ok(Box::new(CapturingModel {
                probe: std::sync::Arc::clone(&self.probe),
            }))
        }
    }

    #[test]
    fn test_empty_prompt_becomes_none_sentinel() {
        let (factory, probe) = CapturingFactory::new();
        let gateway =
            TranscriptionGateway::new(Box::new(factory), &model_config("cpu", "   ")).unwrap();
        gateway.transcribe(&[0.1; 16]).unwrap();

        let options = probe.lock().unwrap().clone().unwrap();
        assert_eq!(options.initial_prompt, None);
    }

    #[test]
    fn test_model_options_beam_vad_language_prompt() {
        let (factory, probe) = CapturingFactory::new();
        let gateway = TranscriptionGateway::new(
            Box::new(factory),
            &model_config("cpu", " Medical terminology. "),
        )
        .unwrap();
        gateway.transcribe(&[0.1; 16]).unwrap();

        let options = probe.lock().unwrap().clone().unwrap();
        assert_eq!(options.beam_size, BEAM_WIDTH);
        assert!(options.vad_filter);
        assert_eq!(options.language, "en");
        assert_eq!(
            options.initial_prompt.as_deref(),
            Some("Medical terminology.")
        );
    }

    #[test]
    fn test_transcription_error_is_wrapped() {
        struct ErrFactory;
        impl ModelFactory for ErrFactory {
            fn accelerator_available(&self) -> bool {
                false
            }
            fn build(
                &self,
                _size: &str,
                _device: ModelDevice,
                _precision: ComputePrecision,
            ) -> Result<Box<dyn SpeechModel>> {
                struct ErrModel;
                impl SpeechModel for ErrModel {
                    fn transcribe(
                        &mut self,
                        _samples: &[f32],
                        _options: &TranscribeOptions,
                    ) -> Result<Vec<String>> {
                        Err(SottoError::Transcription("inference blew up".to_string()))
                    }
                }
                Ok(Box::new(ErrModel))
            }
        }

        let gateway =
            TranscriptionGateway::new(Box::new(ErrFactory), &model_config("cpu", "")).unwrap();
        let err = gateway.transcribe(&[0.1; 16]).unwrap_err();
        assert!(matches!(err, SottoError::Transcription(_)));
        assert!(err.to_string().contains("inference blew up"));
    }

    #[test]
    fn test_unknown_device_string_rejected_at_construction() {
        let factory = MockModelFactory::new(false);
        let result = TranscriptionGateway::new(Box::new(factory), &model_config("tpu", ""));
        assert!(matches!(result, Err(SottoError::Config(_))));
    }
}

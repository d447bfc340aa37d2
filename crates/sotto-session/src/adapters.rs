//! Adapters binding the concrete capture, transcription, and injection
//! types to the controller's collaborator traits.

use sotto_audio::permissions;
use sotto_audio::Recorder;
use sotto_core::Result;
use sotto_inject::TextInjector;
use sotto_transcribe::TranscriptionGateway;

use crate::{CaptureSession, Injector, MicrophoneGate, Transcriber};

impl CaptureSession for Recorder {
    fn start(&mut self) -> Result<()> {
        Recorder::start(self)
    }

    fn stop(&mut self) -> Vec<f32> {
        Recorder::stop(self)
    }

    fn level(&self) -> f32 {
        Recorder::level(self)
    }

    fn exceeded_max_duration(&self) -> bool {
        Recorder::exceeded_max_duration(self)
    }
}

impl Transcriber for TranscriptionGateway {
    fn transcribe(&self, samples: &[f32]) -> Result<String> {
        TranscriptionGateway::transcribe(self, samples)
    }
}

impl Injector for TextInjector {
    fn type_text(&self, text: &str) -> Result<()> {
        TextInjector::type_text(self, text)
    }
}

/// Microphone gate backed by the audio subsystem's permission probe.
pub struct CpalMicrophoneGate;

impl MicrophoneGate for CpalMicrophoneGate {
    fn access_granted(&self) -> bool {
        permissions::microphone_access_granted()
    }

    fn request_access(&self) {
        permissions::request_microphone_access();
    }
}

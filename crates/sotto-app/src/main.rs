//! Sotto application binary - composition root.
//!
//! Ties the crates together into a single push-to-talk dictation process:
//! 1. Parse CLI args, load configuration, initialize tracing
//! 2. Pre-warm the speech model (the one fail-fast path: a model that
//!    cannot load even after the cpu fallback aborts startup)
//! 3. Wire recorder, gateway, injector, tray, and cues into the controller
//! 4. Register the push-to-talk hotkey
//! 5. Run the poll tick until ctrl-c

mod cli;

use std::sync::Arc;

use clap::Parser;

use sotto_audio::Recorder;
use sotto_core::Config;
use sotto_inject::{InjectionMethod, TextInjector};
use sotto_session::{
    CpalMicrophoneGate, HotkeyConfig, HotkeyService, SessionController, POLL_INTERVAL,
};
use sotto_transcribe::{ModelFactory, TranscriptionGateway};
use sotto_ui::{Cues, TrayService};

use cli::CliArgs;

#[cfg(feature = "whisper")]
fn build_model_factory(models_dir: std::path::PathBuf) -> Box<dyn ModelFactory> {
    Box::new(sotto_transcribe::whisper_backend::WhisperFactory::new(
        models_dir,
    ))
}

#[cfg(not(feature = "whisper"))]
fn build_model_factory(_models_dir: std::path::PathBuf) -> Box<dyn ModelFactory> {
    tracing::warn!("Built without the `whisper` feature — transcription returns mock text");
    Box::new(sotto_transcribe::MockModelFactory::new(false))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_path = args.resolve_config_path();
    let config = Config::load_or_default(&config_path);

    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    tracing::info!("Starting Sotto v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_path.display(), "Configuration loaded");

    // Speech model, pre-warmed before any UI comes up.
    let gateway = Arc::new(TranscriptionGateway::new(
        build_model_factory(args.resolve_models_dir()),
        &config.model,
    )?);
    if let Err(e) = gateway.ensure_loaded() {
        tracing::error!(error = %e, "Speech model failed to load");
        return Err(e.into());
    }
    tracing::info!("Speech model ready");

    let recorder = Recorder::new(&config.audio);
    let method = InjectionMethod::parse(&config.injection.method)?;
    let injector = TextInjector::new(method);
    let tray = TrayService::new()?;

    let mut controller = SessionController::new(
        Box::new(recorder),
        gateway,
        Box::new(injector),
        Box::new(tray),
        Box::new(CpalMicrophoneGate),
    );
    if config.general.play_sounds {
        controller = controller.with_cues(Box::new(Cues::new()));
    }

    let hotkey_config = args
        .hotkey
        .clone()
        .map(|key| HotkeyConfig { key })
        .unwrap_or_default();
    let _hotkey = HotkeyService::new(&hotkey_config, controller.handle())?;
    tracing::info!(
        key = %hotkey_config.key,
        "Hold the hotkey to record, release to transcribe"
    );

    let mut interval = tokio::time::interval(POLL_INTERVAL);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => controller.poll(),
            _ = &mut shutdown => break,
        }
    }

    tracing::info!("Shutting down");
    Ok(())
}

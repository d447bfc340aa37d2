//! Sotto audio crate - microphone capture session, device enumeration,
//! and the microphone permission probe.
//!
//! The [`Recorder`] owns the lifecycle of one cpal input stream at a time:
//! `start` opens a callback-driven stream after waiting out any pending
//! teardown from the previous cycle, `stop` detaches the stream and tears
//! it down on a worker thread so a slow audio driver never blocks the
//! caller.

pub mod devices;
pub mod permissions;
pub mod recorder;

pub use devices::{list_input_devices, InputDevice};
pub use permissions::{
    microphone_access_granted, open_microphone_settings, request_microphone_access,
};
pub use recorder::{CleanupGate, Recorder, RecorderTuning};

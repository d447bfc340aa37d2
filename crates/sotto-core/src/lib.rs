//! Sotto core crate - shared error type and configuration.
//!
//! Every other `sotto-*` crate depends on this one for the common
//! `SottoError`/`Result` pair and the persisted TOML configuration.

pub mod config;
pub mod error;

pub use config::{
    AudioConfig, Config, DeviceSelector, GeneralConfig, InjectionConfig, ModelConfig,
};
pub use error::{Result, SottoError};

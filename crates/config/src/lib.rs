//! Configuration for the speech synthesis service
//!
//! Settings are layered: built-in defaults, then `config/default.*`, then an
//! optional environment-specific file, then `VOICE_TTS__*` environment
//! variables. The binary applies CLI overrides on top.

pub mod constants;
pub mod settings;
pub mod voices;

pub use settings::{
    load_settings, read_settings, AudioConfig, EngineConfig, EngineKind, ObservabilityConfig,
    PhonemizerConfig, SegmenterConfig, ServerConfig, Settings, TextConfig, VoiceConfig,
};
pub use voices::{Voice, VoiceCatalogue};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

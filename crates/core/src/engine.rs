//! Boundary of the external synthesis engine

use thiserror::Error;

use crate::audio::AudioFormat;
use crate::request::SpeakerId;

/// Failure reported by the engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Engine unavailable: {0}")]
    Unavailable(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    /// The engine returned something that is not PCM of the declared format
    #[error("Unexpected engine output: {0}")]
    UnexpectedOutput(String),
}

/// Neural synthesis engine
///
/// Calls are blocking and the engine is not safe for concurrent use; callers
/// must serialize every call through a single exclusive-access gate.
pub trait SynthesisEngine: Send + Sync {
    /// Turn normalized text into raw PCM bytes of [`SynthesisEngine::format`]
    fn synthesize(&self, text: &str, speaker: SpeakerId, rate: f32) -> Result<Vec<u8>, EngineError>;

    /// Fixed output format
    fn format(&self) -> AudioFormat;

    /// Model name, for health reporting
    fn model_name(&self) -> &str;
}

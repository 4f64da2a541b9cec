//! Error types shared across crates

use thiserror::Error;

use crate::request::SpeakerId;

/// Request validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Text was empty before normalization
    #[error("Text cannot be empty")]
    EmptyText,

    /// Speaker index not in the configured set
    #[error("Invalid speaker id: {speaker}. Available ids: {available:?}")]
    InvalidSpeaker {
        speaker: SpeakerId,
        available: Vec<SpeakerId>,
    },

    /// Rate outside the accepted range
    #[error("Invalid speech rate {rate}: must be within {min}..={max}")]
    InvalidRate { rate: f32, min: f32, max: f32 },
}

impl Error {
    /// Stable machine-readable code, used on the wire
    pub fn code(&self) -> &'static str {
        match self {
            Error::EmptyText => "empty-text",
            Error::InvalidSpeaker { .. } => "invalid-speaker",
            Error::InvalidRate { .. } => "invalid-rate",
        }
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

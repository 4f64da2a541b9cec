//! Text processing errors
//!
//! These never escape [`crate::TextNormalizer::normalize`]; they are reported
//! by the optional collaborators and recovered inside the pipeline.

use thiserror::Error;

/// Text processing errors
#[derive(Error, Debug)]
pub enum TextProcessingError {
    #[error("Phonemizer error: {0}")]
    Phonemizer(String),

    #[error("Stress annotation error: {0}")]
    Stress(String),

    #[error("Invalid lexicon entry at line {line}: {message}")]
    Lexicon { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TextProcessingError>;

//! Text normalization for Russian speech synthesis
//!
//! Turns free-form input into the restricted vocabulary the synthesis engine
//! can pronounce:
//! - Percentages and numerals expanded into Russian words with agreement
//! - Emoji and typographic punctuation normalized
//! - Latin words transliterated (exception tables, phonemic path, letter map)
//! - Optional stress marking
//! - Final restriction to Cyrillic letters, basic punctuation and `+`
//!
//! # Example
//!
//! ```ignore
//! use voice_tts_text_processing::TextNormalizer;
//!
//! let normalizer = TextNormalizer::new();
//! assert_eq!(normalizer.normalize("21%"), "двадцать один процент");
//! ```

pub mod error;
pub mod lexicon;
pub mod normalizer;
pub mod numerals;
pub mod phonemizer;
pub mod stress;
pub mod transliterate;

pub use error::{Result, TextProcessingError};
pub use normalizer::{Stage, TextNormalizer};
pub use phonemizer::{DisabledPhonemizer, EspeakPhonemizer, Phonemizer};
pub use stress::{LexiconStressAnnotator, StressAnnotator};
pub use transliterate::Transliterator;

/// Result of converting a single token
///
/// A miss is a value, not an error: the caller keeps the original token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenOutcome {
    Converted(String),
    Passthrough,
}

impl TokenOutcome {
    /// Converted text, or `original` on a miss
    pub fn or_original(self, original: &str) -> String {
        match self {
            TokenOutcome::Converted(text) => text,
            TokenOutcome::Passthrough => original.to_string(),
        }
    }
}

//! Latin word transliteration
//!
//! Tiers, first hit wins:
//! 1. exact-case exception table (acronyms)
//! 2. lowercase exception table (brands, loan and function words)
//! 3. phonemic transcription mapped through the phoneme table
//! 4. letter-by-letter fallback map
//!
//! [`Transliterator::transliterate`] always returns a string.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use crate::lexicon::{self, PHONEME_TABLE};
use crate::phonemizer::{DisabledPhonemizer, Phonemizer};
use crate::TokenOutcome;

/// Delimiters emitted by espeak that carry no sound
static IPA_MARKERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ˈˌ_',\s\x{0361}^]").unwrap());

/// Soft sign directly after a consonant that is never softened
static TRAILING_SOFT_SIGN: Lazy<Regex> = Lazy::new(|| Regex::new(r"([жшчщц])ь$").unwrap());

/// Transcription markers meaning the phonemizer did not know the word
const UNKNOWN_MARKERS: &[&str] = &["<unk>", "("];

/// Foreign-word transliterator
#[derive(Clone)]
pub struct Transliterator {
    phonemizer: Arc<dyn Phonemizer>,
}

impl Transliterator {
    /// Transliterator without a phonemic tier
    pub fn new() -> Self {
        Self::with_phonemizer(Arc::new(DisabledPhonemizer))
    }

    pub fn with_phonemizer(phonemizer: Arc<dyn Phonemizer>) -> Self {
        Self { phonemizer }
    }

    /// Transliterate one run of Latin letters
    pub fn transliterate(&self, word: &str) -> String {
        if let TokenOutcome::Converted(text) = Self::exception(word) {
            return text;
        }

        let lower = word.to_lowercase();
        match self.phonemic(&lower) {
            TokenOutcome::Converted(text) => text,
            TokenOutcome::Passthrough => Self::letter_by_letter(&lower),
        }
    }

    /// Tiers 1 and 2
    pub fn exception(word: &str) -> TokenOutcome {
        if let Some(hit) = lexicon::exact_exception(word) {
            return TokenOutcome::Converted(hit.to_string());
        }
        match lexicon::word_exception(&word.to_lowercase()) {
            Some(hit) => TokenOutcome::Converted(hit.to_string()),
            None => TokenOutcome::Passthrough,
        }
    }

    /// Tier 3; any phonemizer failure is a miss
    pub fn phonemic(&self, lower: &str) -> TokenOutcome {
        let ipa = match self.phonemizer.phonemize(lower) {
            Ok(ipa) => ipa,
            Err(e) => {
                tracing::trace!(
                    word = lower,
                    phonemizer = self.phonemizer.name(),
                    error = %e,
                    "Phonemizer miss"
                );
                return TokenOutcome::Passthrough;
            }
        };

        if UNKNOWN_MARKERS.iter().any(|marker| ipa.contains(marker)) {
            tracing::debug!(
                word = lower,
                phonemizer = self.phonemizer.name(),
                ipa = %ipa,
                "Phonemizer reported unknown word"
            );
            return TokenOutcome::Passthrough;
        }

        let ipa = IPA_MARKERS.replace_all(&ipa, "");
        let substituted = PHONEME_TABLE.substitute(&ipa);
        let cleaned = Self::cleanup(&substituted);

        if cleaned.is_empty() {
            TokenOutcome::Passthrough
        } else {
            TokenOutcome::Converted(cleaned)
        }
    }

    /// Collapse doubled glides and drop a soft sign after hard-only consonants
    fn cleanup(text: &str) -> String {
        let mut out = text.to_string();
        while out.contains("йй") {
            out = out.replace("йй", "й");
        }
        TRAILING_SOFT_SIGN.replace(&out, "$1").into_owned()
    }

    /// Tier 4; letters missing from the map pass through
    pub fn letter_by_letter(lower: &str) -> String {
        lower
            .chars()
            .map(|c| match lexicon::fallback_letter(c) {
                Some(mapped) => mapped.to_string(),
                None => c.to_string(),
            })
            .collect()
    }
}

impl Default for Transliterator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Transliterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transliterator")
            .field("phonemizer", &self.phonemizer.name())
            .finish()
    }
}

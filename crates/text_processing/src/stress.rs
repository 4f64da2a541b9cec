//! Stress marking
//!
//! A stress annotator places `+` before the stressed vowel of words it
//! knows. It is optional; the pipeline treats any failure as a no-op.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::Path;

use crate::{Result, TextProcessingError};

/// Marker placed before a stressed vowel
pub const STRESS_MARKER: char = '+';

static CYRILLIC_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[а-яА-ЯёЁ]+").unwrap());

/// Adds stress markers to Russian text
pub trait StressAnnotator: Send + Sync {
    fn annotate(&self, text: &str) -> Result<String>;
}

/// Dictionary-based annotator
///
/// Entries map a lowercase word to its stressed spelling, e.g.
/// `замок` → `з+амок`.
#[derive(Debug, Clone, Default)]
pub struct LexiconStressAnnotator {
    entries: HashMap<String, String>,
}

impl LexiconStressAnnotator {
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(word, stressed)| (word.as_ref().to_lowercase(), stressed.into()))
                .collect(),
        }
    }

    /// Parse `word<TAB>stressed` lines; blank lines and `#` comments are skipped
    pub fn parse(content: &str) -> Result<Self> {
        let mut entries = HashMap::new();

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (word, stressed) =
                line.split_once('\t').ok_or_else(|| TextProcessingError::Lexicon {
                    line: index + 1,
                    message: "expected word<TAB>stressed".to_string(),
                })?;
            let (word, stressed) = (word.trim(), stressed.trim());

            if stressed.replace(STRESS_MARKER, "").to_lowercase() != word.to_lowercase() {
                return Err(TextProcessingError::Lexicon {
                    line: index + 1,
                    message: format!("'{}' is not a stressed spelling of '{}'", stressed, word),
                });
            }

            entries.insert(word.to_lowercase(), stressed.to_lowercase());
        }

        Ok(Self { entries })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let annotator = Self::parse(&content)?;
        tracing::info!(
            path = %path.as_ref().display(),
            entries = annotator.len(),
            "Loaded stress lexicon"
        );
        Ok(annotator)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Uppercase the first letter of `stressed` if `original` started with one
fn match_case(original: &str, stressed: &str) -> String {
    if !original.chars().next().is_some_and(char::is_uppercase) {
        return stressed.to_string();
    }

    let mut done = false;
    stressed
        .chars()
        .map(|c| {
            if !done && c != STRESS_MARKER {
                done = true;
                c.to_uppercase().collect::<String>()
            } else {
                c.to_string()
            }
        })
        .collect()
}

impl StressAnnotator for LexiconStressAnnotator {
    fn annotate(&self, text: &str) -> Result<String> {
        let annotated = CYRILLIC_WORD.replace_all(text, |caps: &Captures| {
            let word = &caps[0];
            match self.entries.get(&word.to_lowercase()) {
                Some(stressed) => match_case(word, stressed),
                None => word.to_string(),
            }
        });
        Ok(annotated.into_owned())
    }
}

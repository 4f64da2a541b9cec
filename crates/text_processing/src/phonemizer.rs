//! Phonemic transcription of foreign words
//!
//! Used by the transliterator's phonemic tier. The default implementation
//! shells out to `espeak-ng`; results are cached per word, failures
//! included, and a program that cannot be started is not retried.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{Result, TextProcessingError};

/// Produces an IPA transcription for a single word
pub trait Phonemizer: Send + Sync {
    fn name(&self) -> &str;

    fn phonemize(&self, word: &str) -> Result<String>;
}

/// Phonemizer that always fails, so the transliterator falls back to the letter map
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledPhonemizer;

impl Phonemizer for DisabledPhonemizer {
    fn name(&self) -> &str {
        "disabled"
    }

    fn phonemize(&self, _word: &str) -> Result<String> {
        Err(TextProcessingError::Phonemizer("phonemizer disabled".to_string()))
    }
}

const CACHE_CAPACITY: usize = 4096;

/// `espeak-ng -q --ipa -v <voice> <word>`
pub struct EspeakPhonemizer {
    program: String,
    voice: String,
    /// `None` records a word the program rejected
    cache: Mutex<HashMap<String, Option<String>>>,
    unavailable: AtomicBool,
}

impl EspeakPhonemizer {
    pub fn new(program: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            voice: voice.into(),
            cache: Mutex::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// False once the program failed to start
    pub fn is_available(&self) -> bool {
        !self.unavailable.load(Ordering::Relaxed)
    }

    fn run(&self, word: &str) -> Result<String> {
        let output = Command::new(&self.program)
            .args(["-q", "--ipa", "-v", self.voice.as_str(), word])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                if !self.unavailable.swap(true, Ordering::Relaxed) {
                    tracing::warn!(
                        program = %self.program,
                        error = %e,
                        "Phonemizer cannot be started, foreign words fall back to letters"
                    );
                }
                TextProcessingError::Phonemizer(format!(
                    "failed to execute '{}': {}",
                    self.program, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TextProcessingError::Phonemizer(format!(
                "'{}' failed: {}",
                self.program,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| TextProcessingError::Phonemizer("non-utf8 output".to_string()))?
            .trim()
            .to_string();

        if stdout.is_empty() {
            return Err(TextProcessingError::Phonemizer(format!(
                "'{}' returned empty output",
                self.program
            )));
        }

        Ok(stdout)
    }
}

impl Default for EspeakPhonemizer {
    fn default() -> Self {
        Self::new("espeak-ng", "en-us")
    }
}

impl Phonemizer for EspeakPhonemizer {
    fn name(&self) -> &str {
        &self.program
    }

    fn phonemize(&self, word: &str) -> Result<String> {
        if !self.is_available() {
            return Err(TextProcessingError::Phonemizer(format!(
                "'{}' unavailable",
                self.program
            )));
        }

        if let Some(hit) = self.cache.lock().get(word) {
            return hit.clone().ok_or_else(|| {
                TextProcessingError::Phonemizer(format!("'{}' rejected '{}'", self.program, word))
            });
        }

        let result = self.run(word);
        if self.is_available() {
            let mut cache = self.cache.lock();
            if cache.len() >= CACHE_CAPACITY {
                cache.clear();
            }
            cache.insert(word.to_string(), result.as_ref().ok().cloned());
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_always_fails() {
        assert!(DisabledPhonemizer.phonemize("hello").is_err());
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let phonemizer = EspeakPhonemizer::new("definitely-not-a-real-phonemizer-binary", "en-us");
        let err = phonemizer.phonemize("hello").unwrap_err();
        assert!(matches!(err, TextProcessingError::Phonemizer(_)));
        assert!(!phonemizer.is_available());
        assert!(phonemizer.phonemize("world").is_err());
    }

    /// Script that logs each start to `counter` and exits with `status`
    #[cfg(unix)]
    fn counting_script(dir: &std::path::Path, counter: &std::path::Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-espeak");
        let script = format!("#!/bin/sh\necho run >> '{}'\n{}\n", counter.display(), body);
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    #[cfg(unix)]
    fn starts(counter: &std::path::Path) -> usize {
        std::fs::read_to_string(counter).map(|s| s.lines().count()).unwrap_or(0)
    }

    #[cfg(unix)]
    #[test]
    fn test_rejected_word_runs_program_once() {
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("starts");
        let program = counting_script(dir.path(), &counter, "exit 1");
        let phonemizer = EspeakPhonemizer::new(program, "en-us");

        for _ in 0..5 {
            assert!(phonemizer.phonemize("zorg").is_err());
        }
        assert_eq!(starts(&counter), 1);
        assert!(phonemizer.is_available());
    }

    #[cfg(unix)]
    #[test]
    fn test_transcription_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("starts");
        let program = counting_script(dir.path(), &counter, "echo 'zˈɔːɹɡ'");
        let phonemizer = EspeakPhonemizer::new(program, "en-us");

        for _ in 0..3 {
            assert_eq!(phonemizer.phonemize("zorg").unwrap(), "zˈɔːɹɡ");
        }
        assert!(phonemizer.phonemize("blip").is_ok());
        assert_eq!(starts(&counter), 2);
    }
}

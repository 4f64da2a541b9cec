//! Incremental sentence boundary detection
//!
//! Text arrives in arbitrary fragments; complete sentences are released as
//! soon as their end is determinable. A sentence end is a run of `.`, `!`,
//! `?` or `…` followed by whitespace and then an uppercase letter, a list
//! marker (`1. `) or the end of the buffered text.
//!
//! Short tokens before a period ("см.", "Mr.") are treated as abbreviations
//! and do not close a sentence.
//!
//! A segmenter belongs to one stream and is not meant to be shared; every
//! method takes `&mut self`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;

use crate::PipelineError;

use voice_tts_config::constants::segmenter::{
    ABBREVIATION_MAX_LETTERS as DEFAULT_ABBREVIATION_MAX_LETTERS,
    ABBREVIATION_WINDOW as DEFAULT_ABBREVIATION_WINDOW,
};

/// What must follow a terminal run for it to end a sentence
static BOUNDARY_FOLLOW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\s+[A-ZА-ЯЁ]|\s+[0-9]+\.\s+|\s+$)").unwrap());

static DEFAULT_ABBREVIATION: Lazy<Regex> =
    Lazy::new(|| abbreviation_pattern(DEFAULT_ABBREVIATION_MAX_LETTERS).unwrap());

fn abbreviation_pattern(max_letters: usize) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"\b[a-zA-Zа-яА-ЯёЁ]{{1,{}}}\.$", max_letters))
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…')
}

/// Byte offset just past the earliest sentence-ending terminal run
fn find_boundary(text: &str) -> Option<usize> {
    let mut in_run = false;
    for (i, c) in text.char_indices() {
        let terminal = is_terminal(c);
        if in_run && !terminal && BOUNDARY_FOLLOW.is_match(&text[i..]) {
            return Some(i);
        }
        in_run = terminal;
    }
    None
}

/// Incremental sentence segmenter
#[derive(Debug, Clone)]
pub struct SentenceSegmenter {
    pending: String,
    candidate: String,
    abbreviation: Regex,
    window: usize,
}

impl SentenceSegmenter {
    pub fn new() -> Self {
        Self {
            pending: String::new(),
            candidate: String::new(),
            abbreviation: DEFAULT_ABBREVIATION.clone(),
            window: DEFAULT_ABBREVIATION_WINDOW,
        }
    }

    /// Segmenter with a custom abbreviation heuristic
    ///
    /// `window` trailing characters are checked for a token of at most
    /// `max_letters` letters followed by a period.
    pub fn with_abbreviation(window: usize, max_letters: usize) -> Result<Self, PipelineError> {
        if max_letters == 0 || window < 2 {
            return Err(PipelineError::Config(format!(
                "abbreviation window {} / length {} cannot match anything",
                window, max_letters
            )));
        }
        let abbreviation =
            abbreviation_pattern(max_letters).map_err(|e| PipelineError::Config(e.to_string()))?;

        Ok(Self {
            abbreviation,
            window,
            ..Self::new()
        })
    }

    fn ends_with_abbreviation(&self, text: &str) -> bool {
        let count = text.chars().count();
        let tail: String = text.chars().skip(count.saturating_sub(self.window)).collect();
        self.abbreviation.is_match(&tail)
    }

    /// Consume one boundary from the buffer, queueing completed sentences
    fn step(&mut self, out: &mut VecDeque<String>) -> bool {
        let Some(end) = find_boundary(&self.pending) else {
            return false;
        };

        let matched: String = self.pending.drain(..end).collect();

        if self.candidate.is_empty() {
            self.candidate = matched;
        } else if self.ends_with_abbreviation(&self.candidate) {
            self.candidate.push_str(&matched);
        } else {
            out.push_back(self.candidate.trim().to_string());
            self.candidate = matched;
        }

        if !self.ends_with_abbreviation(&self.candidate) {
            out.push_back(self.candidate.trim().to_string());
            self.candidate.clear();
        }

        true
    }

    /// Append a fragment and iterate over the sentences it completes
    ///
    /// The iterator is lazy: boundaries are consumed as it is advanced.
    pub fn add_chunk(&mut self, chunk: &str) -> Sentences<'_> {
        self.pending.push_str(chunk);
        Sentences {
            segmenter: self,
            ready: VecDeque::new(),
        }
    }

    /// Flush whatever is left as one final unit and reset
    pub fn finish(&mut self) -> String {
        let text = format!("{}{}", self.candidate, self.pending).trim().to_string();
        self.candidate.clear();
        self.pending.clear();
        text
    }

    /// Whether no text is buffered
    pub fn is_empty(&self) -> bool {
        self.candidate.is_empty() && self.pending.is_empty()
    }
}

impl Default for SentenceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Sentences released by one [`SentenceSegmenter::add_chunk`] call
pub struct Sentences<'a> {
    segmenter: &'a mut SentenceSegmenter,
    ready: VecDeque<String>,
}

impl Iterator for Sentences<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(sentence) = self.ready.pop_front() {
                return Some(sentence);
            }
            if !self.segmenter.step(&mut self.ready) {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(segmenter: &mut SentenceSegmenter, chunk: &str) -> Vec<String> {
        segmenter.add_chunk(chunk).collect()
    }

    #[test]
    fn test_two_sentences_then_empty_finish() {
        let mut s = SentenceSegmenter::new();
        assert_eq!(
            feed(&mut s, "Hello world. Next sentence. "),
            vec!["Hello world.", "Next sentence."]
        );
        assert_eq!(s.finish(), "");
    }

    #[test]
    fn test_abbreviation_does_not_split() {
        let mut s = SentenceSegmenter::new();
        assert!(feed(&mut s, "см. далее.").is_empty());
        assert_eq!(s.finish(), "см. далее.");
    }

    #[test]
    fn test_abbreviation_joins_following_span() {
        let mut s = SentenceSegmenter::new();
        assert_eq!(feed(&mut s, "Mr. Smith went home. Then"), vec!["Mr. Smith went home."]);
        assert_eq!(s.finish(), "Then");
    }

    #[test]
    fn test_lowercase_continuation_waits() {
        let mut s = SentenceSegmenter::new();
        assert!(feed(&mut s, "Версия 2.0 вышла").is_empty());
        assert!(feed(&mut s, "! и").is_empty());
        assert_eq!(feed(&mut s, " всё сразу. Дальше"), vec!["Версия 2.0 вышла! и всё сразу."]);
        assert_eq!(s.finish(), "Дальше");
    }

    #[test]
    fn test_chunks_split_mid_sentence() {
        let mut s = SentenceSegmenter::new();
        let mut out = Vec::new();
        for chunk in ["Прив", "ет, мир", "! Как ", "дела? Хорошо"] {
            out.extend(feed(&mut s, chunk));
        }
        assert_eq!(out, vec!["Привет, мир!", "Как дела?"]);
        assert_eq!(s.finish(), "Хорошо");
        assert!(s.is_empty());
    }

    #[test]
    fn test_terminal_runs_and_list_markers() {
        let mut s = SentenceSegmenter::new();
        assert_eq!(
            feed(&mut s, "Что?! Правда… Пункты: 1. первый"),
            vec!["Что?!", "Правда…"]
        );
        assert_eq!(s.finish(), "Пункты: 1. первый");

        let mut s = SentenceSegmenter::new();
        assert_eq!(feed(&mut s, "Список готов. 2. второй"), vec!["Список готов."]);
    }

    #[test]
    fn test_partial_iteration_keeps_state() {
        let mut s = SentenceSegmenter::new();
        let first = s.add_chunk("Первое. Второе. Третье. ").next();
        assert_eq!(first.as_deref(), Some("Первое."));
        assert_eq!(feed(&mut s, ""), vec!["Второе.", "Третье."]);
    }

    #[test]
    fn test_custom_abbreviation_window() {
        let mut s = SentenceSegmenter::with_abbreviation(3, 1).unwrap();
        assert_eq!(feed(&mut s, "Кот спит. Пёс тоже. "), vec!["Кот спит.", "Пёс тоже."]);

        let mut s = SentenceSegmenter::with_abbreviation(3, 1).unwrap();
        assert!(feed(&mut s, "т. Иванов").is_empty());

        assert!(SentenceSegmenter::with_abbreviation(5, 0).is_err());
    }
}

//! Normalization pipeline
//!
//! Stages run in the fixed order of [`Stage::ORDER`]; each stage is total
//! and later stages rely on earlier ones having removed ambiguous
//! characters. The output only contains Cyrillic letters, space, basic
//! punctuation and the stress marker, and normalizing it again is a no-op.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::sync::Arc;

use crate::lexicon::{agree, PERCENT_FORMS};
use crate::numerals::expand_number;
use crate::phonemizer::Phonemizer;
use crate::stress::{StressAnnotator, STRESS_MARKER};
use crate::transliterate::Transliterator;
use crate::TokenOutcome;

static PERCENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+(?:[.,][0-9]+)?)\s*%").unwrap());

static EMOJI_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"[\x{1F000}-\x{1FAFF}\x{2600}-\x{27BF}\x{2300}-\x{23FF}\x{2B00}-\x{2BFF}",
        r"\x{FE00}-\x{FE0F}\x{200D}\x{20E3}\x{E0020}-\x{E007F}]"
    ))
    .unwrap()
});

static DASH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x{2010}-\x{2015}\x{2212}]").unwrap());

static QUOTE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[«»„“”"'‘’‚‹›`]"#).unwrap());

static NBSP_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x{00A0}\x{202F}\x{2007}]").unwrap());

static LETTER_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\p{L})([0-9])").unwrap());

static DIGIT_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"([0-9])(\p{L})").unwrap());

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+(?:[.,][0-9]+)?").unwrap());

static LATIN_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+").unwrap());

static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^а-яА-ЯёЁ .,!?:;+\-]").unwrap());

/// Whether `c` may appear in normalized text
pub fn is_allowed(c: char) -> bool {
    matches!(c, 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё' | ' ' | '.' | ',' | '!' | '?' | ':' | ';' | '-')
        || c == STRESS_MARKER
}

/// One text-to-text normalization step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Percentages,
    SpecialCharacters,
    Numerals,
    ForeignWords,
    Stress,
    Charset,
}

impl Stage {
    /// Execution order
    pub const ORDER: [Stage; 6] = [
        Stage::Percentages,
        Stage::SpecialCharacters,
        Stage::Numerals,
        Stage::ForeignWords,
        Stage::Stress,
        Stage::Charset,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Percentages => "percentages",
            Stage::SpecialCharacters => "special_characters",
            Stage::Numerals => "numerals",
            Stage::ForeignWords => "foreign_words",
            Stage::Stress => "stress",
            Stage::Charset => "charset",
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// `5%` → `пять процентов`; a bare `%` → `процентов`
pub fn expand_percentages(text: &str) -> String {
    let expanded = PERCENT_PATTERN.replace_all(text, |caps: &Captures| {
        let number = &caps[1];
        let words = match expand_number(number) {
            TokenOutcome::Converted(words) => words,
            TokenOutcome::Passthrough => return caps[0].to_string(),
        };

        let form = if number.contains(['.', ',']) {
            PERCENT_FORMS.1
        } else {
            number.parse::<u64>().map(|n| agree(n, PERCENT_FORMS)).unwrap_or(PERCENT_FORMS.2)
        };

        format!("{} {}", words, form)
    });

    expanded.replace('%', &format!(" {} ", PERCENT_FORMS.2))
}

/// Emoji, dashes, quotes, ellipsis, non-breaking spaces, letter/digit spacing
pub fn normalize_special_chars(text: &str) -> String {
    let text = EMOJI_PATTERN.replace_all(text, "");
    let text = DASH_PATTERN.replace_all(&text, "-");
    let text = QUOTE_PATTERN.replace_all(&text, "");
    let text = text.replace('…', "...");
    let text = NBSP_PATTERN.replace_all(&text, " ");
    let text = LETTER_DIGIT.replace_all(&text, "$1 $2");
    let text = DIGIT_LETTER.replace_all(&text, "$1 $2");
    collapse_whitespace(&text)
}

/// Integers and decimals to words; unparseable numbers are kept
pub fn expand_numerals(text: &str) -> String {
    NUMBER_PATTERN
        .replace_all(text, |caps: &Captures| expand_number(&caps[0]).or_original(&caps[0]))
        .into_owned()
}

/// Replace every disallowed character with a space and collapse whitespace
pub fn restrict_charset(text: &str) -> String {
    collapse_whitespace(&DISALLOWED.replace_all(text, " "))
}

/// Text normalizer
///
/// Cheap to share behind an `Arc`; all state is read-only.
#[derive(Clone, Default)]
pub struct TextNormalizer {
    transliterator: Transliterator,
    stress: Option<Arc<dyn StressAnnotator>>,
}

impl TextNormalizer {
    /// Normalizer with letter-map transliteration and no stress marking
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_phonemizer(mut self, phonemizer: Arc<dyn Phonemizer>) -> Self {
        self.transliterator = Transliterator::with_phonemizer(phonemizer);
        self
    }

    pub fn with_stress_annotator(mut self, annotator: Arc<dyn StressAnnotator>) -> Self {
        self.stress = Some(annotator);
        self
    }

    pub fn transliterator(&self) -> &Transliterator {
        &self.transliterator
    }

    pub fn has_stress_annotator(&self) -> bool {
        self.stress.is_some()
    }

    /// Run every stage in order
    pub fn normalize(&self, text: &str) -> String {
        let normalized = Stage::ORDER
            .iter()
            .fold(text.to_string(), |acc, &stage| {
                let out = self.apply(stage, &acc);
                tracing::trace!(stage = stage.name(), output = %out, "Normalization stage");
                out
            });

        tracing::debug!(
            input_chars = text.chars().count(),
            output_chars = normalized.chars().count(),
            "Normalized text"
        );
        normalized
    }

    /// Run a single stage
    pub fn apply(&self, stage: Stage, text: &str) -> String {
        match stage {
            Stage::Percentages => expand_percentages(text),
            Stage::SpecialCharacters => normalize_special_chars(text),
            Stage::Numerals => expand_numerals(text),
            Stage::ForeignWords => self.transliterate_foreign(text),
            Stage::Stress => self.annotate_stress(text),
            Stage::Charset => restrict_charset(text),
        }
    }

    fn transliterate_foreign(&self, text: &str) -> String {
        LATIN_WORD
            .replace_all(text, |caps: &Captures| self.transliterator.transliterate(&caps[0]))
            .into_owned()
    }

    /// Skipped for empty text or text that already carries stress marks
    fn annotate_stress(&self, text: &str) -> String {
        let Some(annotator) = &self.stress else {
            return text.to_string();
        };
        if text.trim().is_empty() || text.contains(STRESS_MARKER) {
            return text.to_string();
        }

        match annotator.annotate(text) {
            Ok(annotated) => annotated,
            Err(e) => {
                tracing::warn!(error = %e, "Stress annotation failed, keeping text unmarked");
                text.to_string()
            }
        }
    }
}

impl std::fmt::Debug for TextNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextNormalizer")
            .field("transliterator", &self.transliterator)
            .field("stress", &self.stress.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stress::LexiconStressAnnotator;
    use crate::{Result, TextProcessingError};

    fn normalize(text: &str) -> String {
        TextNormalizer::new().normalize(text)
    }

    #[test]
    fn test_percentages() {
        assert_eq!(normalize("5%"), "пять процентов");
        assert_eq!(normalize("21%"), "двадцать один процент");
        assert_eq!(normalize("12%"), "двенадцать процентов");
        assert_eq!(normalize("3 %"), "три процента");
        assert_eq!(normalize("2.5%"), "два и пять процента");
        assert_eq!(normalize("рост на %"), "рост на процентов");
    }

    #[test]
    fn test_decimals() {
        assert_eq!(normalize("12.5"), "двенадцать и пять");
        assert_eq!(normalize("12.55"), "двенадцать и пятьдесят пять сотых");
        assert_eq!(normalize("12.555"), "двенадцать и пятьсот пятьдесят пять тысячных");
        assert_eq!(normalize("12.5555"), "двенадцать точка пять тысяч пятьсот пятьдесят пять");
    }

    #[test]
    fn test_special_characters() {
        assert_eq!(normalize_special_chars("«Да» — нет…"), "Да - нет...");
        assert_eq!(normalize_special_chars("abc123def"), "abc 123 def");
        assert_eq!(normalize_special_chars("a\u{00A0}b\n\tc"), "a b c");
        assert_eq!(normalize_special_chars("привет 👋🏽!"), "привет !");
    }

    #[test]
    fn test_numbers_inside_text() {
        assert_eq!(normalize("Дом 15, кв2"), "Дом пятнадцать, кв два");
        assert_eq!(normalize("в 2000 году"), "в две тысячи году");
    }

    #[test]
    fn test_unparseable_number_is_dropped_by_charset() {
        assert_eq!(normalize("код 99999999999999999999 ок"), "код ок");
    }

    #[test]
    fn test_foreign_words() {
        assert_eq!(normalize("Скачай Google на USB"), "Скачай гугл на ю эс би");
        assert_eq!(normalize("hello world"), "хэллоу уорлд");
    }

    #[test]
    fn test_only_emoji_is_empty() {
        assert_eq!(normalize("😀🎉👍"), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_output_charset() {
        let inputs = [
            "Hello, мир! 42% of 1.5кг — «ok»… #tag @user $100 ©2024",
            "ΑΒΓ 中文 ١٢٣ naïve café",
            "line1\nline2\ttab",
        ];
        for input in inputs {
            let out = normalize(input);
            assert!(out.chars().all(is_allowed), "disallowed char in {:?}", out);
        }
    }

    fn with_castle_stress() -> TextNormalizer {
        let lexicon = LexiconStressAnnotator::from_entries([("замок", "з+амок")]);
        TextNormalizer::new().with_stress_annotator(Arc::new(lexicon))
    }

    #[test]
    fn test_idempotent() {
        let normalizer = with_castle_stress();
        let inputs = [
            "Привет, мир! 5% скидка на iPhone 15…",
            "Замок стоит 1000000 рублей.",
            "см. далее — стр. 12.5",
            "ΑΒΓ 中文 naïve café 😀",
            "C++ и + плюс",
            "",
        ];
        for input in inputs {
            let once = normalizer.normalize(input);
            assert_eq!(normalizer.normalize(&once), once, "not idempotent for {:?}", input);
        }
    }

    struct FailingAnnotator;

    impl StressAnnotator for FailingAnnotator {
        fn annotate(&self, _text: &str) -> Result<String> {
            Err(TextProcessingError::Stress("boom".to_string()))
        }
    }

    #[test]
    fn test_stress_stage() {
        let normalizer = with_castle_stress();
        assert_eq!(normalizer.normalize("Старый замок"), "Старый з+амок");
        // existing markers disable the annotator
        assert_eq!(normalizer.normalize("зам+ок и замок"), "зам+ок и замок");

        let failing = TextNormalizer::new().with_stress_annotator(Arc::new(FailingAnnotator));
        assert_eq!(failing.normalize("замок"), "замок");
    }

    #[test]
    fn test_stage_order() {
        assert_eq!(Stage::ORDER[0], Stage::Percentages);
        assert_eq!(Stage::ORDER[5], Stage::Charset);
    }
}

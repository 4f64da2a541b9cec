//! Russian numerals
//!
//! Cardinals up to 10^18 - 1 with thousand/million agreement, plus the
//! decimal forms used for spoken fractions ("двенадцать и пять сотых").

use crate::lexicon::{agree, Forms};
use crate::TokenOutcome;

/// Largest integer that can be spoken
pub const MAX_CARDINAL: u64 = 999_999_999_999_999_999;

/// Grammatical gender of the counted noun
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Masculine,
    Feminine,
}

const UNITS: [&str; 10] = [
    "", "один", "два", "три", "четыре", "пять", "шесть", "семь", "восемь", "девять",
];

const TEENS: [&str; 10] = [
    "десять",
    "одиннадцать",
    "двенадцать",
    "тринадцать",
    "четырнадцать",
    "пятнадцать",
    "шестнадцать",
    "семнадцать",
    "восемнадцать",
    "девятнадцать",
];

const TENS: [&str; 10] = [
    "",
    "",
    "двадцать",
    "тридцать",
    "сорок",
    "пятьдесят",
    "шестьдесят",
    "семьдесят",
    "восемьдесят",
    "девяносто",
];

const HUNDREDS: [&str; 10] = [
    "",
    "сто",
    "двести",
    "триста",
    "четыреста",
    "пятьсот",
    "шестьсот",
    "семьсот",
    "восемьсот",
    "девятьсот",
];

/// Scale words from 10^3 upwards, with the gender of each scale noun
const SCALES: [(Forms, Gender); 5] = [
    (("тысяча", "тысячи", "тысяч"), Gender::Feminine),
    (("миллион", "миллиона", "миллионов"), Gender::Masculine),
    (("миллиард", "миллиарда", "миллиардов"), Gender::Masculine),
    (("триллион", "триллиона", "триллионов"), Gender::Masculine),
    (("квадриллион", "квадриллиона", "квадриллионов"), Gender::Masculine),
];

fn push_triplet(words: &mut Vec<&'static str>, n: u64, gender: Gender) {
    let hundreds = (n / 100) as usize;
    let rest = n % 100;

    if hundreds > 0 {
        words.push(HUNDREDS[hundreds]);
    }
    if (10..20).contains(&rest) {
        words.push(TEENS[(rest - 10) as usize]);
        return;
    }
    let tens = (rest / 10) as usize;
    let units = (rest % 10) as usize;
    if tens > 0 {
        words.push(TENS[tens]);
    }
    if units > 0 {
        words.push(match (gender, units) {
            (Gender::Feminine, 1) => "одна",
            (Gender::Feminine, 2) => "две",
            _ => UNITS[units],
        });
    }
}

/// Spell out `n` in words, or `None` above [`MAX_CARDINAL`]
pub fn cardinal(n: u64, gender: Gender) -> Option<String> {
    if n > MAX_CARDINAL {
        return None;
    }
    if n == 0 {
        return Some("ноль".to_string());
    }

    let mut triplets = Vec::with_capacity(SCALES.len() + 1);
    let mut rest = n;
    while rest > 0 {
        triplets.push(rest % 1000);
        rest /= 1000;
    }

    let mut words = Vec::new();
    for (index, &triplet) in triplets.iter().enumerate().rev() {
        if triplet == 0 {
            continue;
        }
        if index == 0 {
            push_triplet(&mut words, triplet, gender);
        } else {
            let (forms, scale_gender) = SCALES[index - 1];
            push_triplet(&mut words, triplet, scale_gender);
            words.push(agree(triplet, forms));
        }
    }

    Some(words.join(" "))
}

/// Unit word appended to a fraction of the given digit count
fn fraction_unit(digits: usize) -> Option<&'static str> {
    match digits {
        2 => Some("сотых"),
        3 => Some("тысячных"),
        _ => None,
    }
}

fn spell(digits: &str) -> Option<String> {
    digits.parse::<u64>().ok().and_then(|n| cardinal(n, Gender::Masculine))
}

/// Rewrite a trailing masculine "один"/"два" into the feminine form
fn feminize_tail(words: &str) -> String {
    match words.rsplit_once(' ') {
        Some((head, "один")) => format!("{} одна", head),
        Some((head, "два")) => format!("{} две", head),
        None if words == "один" => "одна".to_string(),
        None if words == "два" => "две".to_string(),
        _ => words.to_string(),
    }
}

/// Spell out a numeric token (`123`, `12.5`, `12,55`)
///
/// An integer part that cannot be spoken is a miss. A fraction that cannot
/// be spoken is kept as digits after the spelled-out integer part.
pub fn expand_number(token: &str) -> TokenOutcome {
    let (integer, fraction) = match token.find(['.', ',']) {
        Some(pos) => (&token[..pos], Some((&token[pos..pos + 1], &token[pos + 1..]))),
        None => (token, None),
    };

    let Some(integer_words) = spell(integer) else {
        tracing::debug!(token, "Could not normalize number");
        return TokenOutcome::Passthrough;
    };

    let Some((separator, fraction)) = fraction else {
        return TokenOutcome::Converted(integer_words);
    };

    let Some(fraction_words) = spell(fraction) else {
        tracing::debug!(token, "Could not normalize fractional part");
        return TokenOutcome::Converted(format!("{}{}{}", integer_words, separator, fraction));
    };

    let digits = fraction.chars().count();
    let spoken = match digits {
        1 => format!("{} и {}", integer_words, feminize_tail(&fraction_words)),
        2 | 3 => format!(
            "{} и {} {}",
            integer_words,
            feminize_tail(&fraction_words),
            fraction_unit(digits).unwrap_or_default()
        ),
        _ => format!("{} точка {}", integer_words, fraction_words),
    };

    TokenOutcome::Converted(spoken)
}

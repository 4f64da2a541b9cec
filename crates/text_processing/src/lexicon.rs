//! Static lexical tables
//!
//! Built once per process and read-only afterwards.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Exact-case exceptions (acronyms whose casing carries meaning)
static EXACT_EXCEPTIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("AI", "эй ай"),
        ("API", "эй пи ай"),
        ("USB", "ю эс би"),
        ("IT", "ай ти"),
        ("OK", "окей"),
        ("USA", "ю эс эй"),
        ("UK", "ю кей"),
        ("EU", "и ю"),
        ("GPS", "джи пи эс"),
        ("CPU", "си пи ю"),
        ("GPU", "джи пи ю"),
        ("SMS", "эс эм эс"),
        ("PDF", "пи ди эф"),
        ("URL", "ю ар эл"),
        ("HTTP", "эйч ти ти пи"),
        ("HTML", "эйч ти эм эл"),
        ("CSS", "си эс эс"),
        ("SQL", "эс кью эл"),
        ("PC", "пи си"),
        ("TV", "ти ви"),
        ("DJ", "ди джей"),
        ("VPN", "ви пи эн"),
        ("IP", "ай пи"),
        ("ID", "ай ди"),
        ("CEO", "си и оу"),
        ("NASA", "наса"),
        ("BBC", "би би си"),
        ("CNN", "си эн эн"),
        ("BMW", "би эм дабл ю"),
        ("IBM", "ай би эм"),
    ]
    .into_iter()
    .collect()
});

/// Lowercase exceptions: brands, loan words and function words
static WORD_EXCEPTIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        // brands and products
        ("google", "гугл"),
        ("apple", "эпл"),
        ("microsoft", "майкрософт"),
        ("youtube", "ютуб"),
        ("iphone", "айфон"),
        ("ipad", "айпэд"),
        ("android", "андроид"),
        ("windows", "виндоус"),
        ("linux", "линукс"),
        ("telegram", "телеграм"),
        ("whatsapp", "вотсап"),
        ("facebook", "фейсбук"),
        ("instagram", "инстаграм"),
        ("twitter", "твиттер"),
        ("amazon", "амазон"),
        ("netflix", "нетфликс"),
        ("samsung", "самсунг"),
        ("yandex", "яндекс"),
        ("skype", "скайп"),
        ("zoom", "зум"),
        ("chatgpt", "чат джи пи ти"),
        ("openai", "оупен эй ай"),
        ("python", "пайтон"),
        ("java", "джава"),
        ("javascript", "джаваскрипт"),
        ("github", "гитхаб"),
        ("vosk", "воск"),
        // loan words
        ("wifi", "вай фай"),
        ("bluetooth", "блютус"),
        ("email", "имейл"),
        ("online", "онлайн"),
        ("offline", "офлайн"),
        ("smartphone", "смартфон"),
        ("laptop", "лэптоп"),
        ("computer", "компьютер"),
        ("internet", "интернет"),
        ("software", "софтвер"),
        ("hardware", "хардвер"),
        ("server", "сервер"),
        ("browser", "браузер"),
        ("startup", "стартап"),
        ("ok", "окей"),
        ("okay", "окей"),
        ("hello", "хэллоу"),
        ("bye", "бай"),
        ("yes", "йес"),
        ("no", "ноу"),
        ("please", "плиз"),
        ("thanks", "сэнкс"),
        ("sorry", "сорри"),
        ("home", "хоум"),
        ("world", "уорлд"),
        // function words
        ("the", "зе"),
        ("a", "э"),
        ("an", "эн"),
        ("and", "энд"),
        ("or", "ор"),
        ("of", "оф"),
        ("to", "ту"),
        ("in", "ин"),
        ("is", "из"),
        ("are", "ар"),
        ("for", "фор"),
        ("on", "он"),
        ("with", "уиз"),
        ("at", "эт"),
        ("by", "бай"),
        ("from", "фром"),
        ("it", "ит"),
        ("you", "ю"),
        ("we", "уи"),
        ("i", "ай"),
        ("my", "май"),
        ("this", "зис"),
        ("that", "зэт"),
    ]
    .into_iter()
    .collect()
});

/// Exact-case lookup
pub fn exact_exception(word: &str) -> Option<&'static str> {
    EXACT_EXCEPTIONS.get(word).copied()
}

/// Lookup by an already lowercased word
pub fn word_exception(lower: &str) -> Option<&'static str> {
    WORD_EXCEPTIONS.get(lower).copied()
}

/// IPA symbol sequences and their Cyrillic approximations
const PHONEME_ENTRIES: &[(&str, &str)] = &[
    // diphthongs and r-coloured vowels
    ("aɪɚ", "айер"),
    ("aɪə", "айе"),
    ("aʊɚ", "ауэр"),
    ("ɔːɹ", "ор"),
    ("ɑːɹ", "ар"),
    ("ɪɹ", "ир"),
    ("ɛɹ", "эр"),
    ("ʊɹ", "ур"),
    ("aɪ", "ай"),
    ("eɪ", "эй"),
    ("ɔɪ", "ой"),
    ("aʊ", "ау"),
    ("oʊ", "оу"),
    ("əʊ", "оу"),
    ("ɪə", "иа"),
    ("eə", "эа"),
    ("ʊə", "уа"),
    // glide + vowel
    ("juː", "ю"),
    ("jʊ", "ю"),
    ("ju", "ю"),
    ("jɑː", "я"),
    ("ja", "я"),
    ("jæ", "я"),
    ("jɛ", "е"),
    ("je", "е"),
    ("jɔ", "ё"),
    ("jo", "ё"),
    // affricates
    ("tʃ", "ч"),
    ("dʒ", "дж"),
    ("ts", "ц"),
    // long vowels
    ("iː", "и"),
    ("uː", "у"),
    ("ɑː", "а"),
    ("ɔː", "о"),
    ("ɜː", "ё"),
    ("ɝ", "ёр"),
    ("ɚ", "ер"),
    // short vowels
    ("ə", "э"),
    ("æ", "э"),
    ("ʌ", "а"),
    ("ɐ", "а"),
    ("ɪ", "и"),
    ("ᵻ", "и"),
    ("ʊ", "у"),
    ("ɛ", "э"),
    ("e", "э"),
    ("ɒ", "о"),
    ("ɔ", "о"),
    ("ɑ", "а"),
    ("ɜ", "ё"),
    ("a", "а"),
    ("i", "и"),
    ("o", "о"),
    ("u", "у"),
    // consonants
    ("θ", "с"),
    ("ð", "з"),
    ("ŋ", "нг"),
    ("ʃ", "ш"),
    ("ʒ", "ж"),
    ("j", "й"),
    ("w", "у"),
    ("h", "х"),
    ("ɹ", "р"),
    ("r", "р"),
    ("ɾ", "т"),
    ("ɫ", "ль"),
    ("ʲ", "ь"),
    ("b", "б"),
    ("d", "д"),
    ("f", "ф"),
    ("ɡ", "г"),
    ("g", "г"),
    ("k", "к"),
    ("l", "л"),
    ("m", "м"),
    ("n", "н"),
    ("p", "п"),
    ("s", "с"),
    ("t", "т"),
    ("v", "в"),
    ("z", "з"),
    ("x", "х"),
    ("ç", "х"),
];

/// Phoneme substitution table indexed for longest-prefix match
pub struct PhonemeTable {
    entries: HashMap<&'static str, &'static str>,
    max_key_chars: usize,
}

impl PhonemeTable {
    fn new(entries: &[(&'static str, &'static str)]) -> Self {
        let max_key_chars = entries
            .iter()
            .map(|(key, _)| key.chars().count())
            .max()
            .unwrap_or(0);
        Self {
            entries: entries.iter().copied().collect(),
            max_key_chars,
        }
    }

    /// Longest key that prefixes `input`, as `(replacement, consumed_bytes)`.
    ///
    /// Candidate lengths are tried longest first, so a shorter key never
    /// shadows a longer one.
    pub fn longest_prefix(&self, input: &str) -> Option<(&'static str, usize)> {
        let boundaries: Vec<usize> = input
            .char_indices()
            .map(|(i, _)| i)
            .skip(1)
            .chain(std::iter::once(input.len()))
            .take(self.max_key_chars)
            .collect();

        boundaries
            .iter()
            .rev()
            .find_map(|&end| self.entries.get(&input[..end]).map(|value| (*value, end)))
    }

    /// Greedy left-to-right substitution; symbols with no entry are dropped
    pub fn substitute(&self, ipa: &str) -> String {
        let mut out = String::with_capacity(ipa.len());
        let mut rest = ipa;

        while let Some(first) = rest.chars().next() {
            match self.longest_prefix(rest) {
                Some((replacement, consumed)) => {
                    out.push_str(replacement);
                    rest = &rest[consumed..];
                }
                None => {
                    rest = &rest[first.len_utf8()..];
                }
            }
        }

        out
    }
}

/// Process-wide phoneme table
pub static PHONEME_TABLE: Lazy<PhonemeTable> = Lazy::new(|| PhonemeTable::new(PHONEME_ENTRIES));

/// Letter-by-letter fallback map
pub fn fallback_letter(letter: char) -> Option<&'static str> {
    let mapped = match letter {
        'a' => "а",
        'b' => "б",
        'c' => "к",
        'd' => "д",
        'e' => "е",
        'f' => "ф",
        'g' => "г",
        'h' => "х",
        'i' => "и",
        'j' => "ж",
        'k' => "к",
        'l' => "л",
        'm' => "м",
        'n' => "н",
        'o' => "о",
        'p' => "п",
        'q' => "к",
        'r' => "р",
        's' => "с",
        't' => "т",
        'u' => "у",
        'v' => "в",
        'w' => "в",
        'x' => "х",
        'y' => "ай",
        'z' => "з",
        _ => return None,
    };
    Some(mapped)
}

/// Word forms selected by a preceding numeral: (one, few, many)
pub type Forms = (&'static str, &'static str, &'static str);

pub const PERCENT_FORMS: Forms = ("процент", "процента", "процентов");

/// Pick the agreeing form for an integer count
pub fn agree(count: u64, forms: Forms) -> &'static str {
    let (one, few, many) = forms;
    if (11..=19).contains(&(count % 100)) {
        return many;
    }
    match count % 10 {
        1 => one,
        2..=4 => few,
        _ => many,
    }
}

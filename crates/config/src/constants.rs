//! Centralized constants for the speech synthesis service
//!
//! Single source of truth for defaults that are referenced from more than
//! one crate (config defaults, HTTP validation, protocol `Info`).

/// Model and voice catalogue
pub mod model {
    /// Default model name passed to the engine
    pub const DEFAULT_MODEL_NAME: &str = "vosk-model-tts-ru-0.7-multi";

    /// Language tag advertised for every voice
    pub const LANGUAGE: &str = "ru";

    /// Speaker index → (human description, wire name suffix)
    pub const VOICE_MAP: &[(u32, &str, &str)] = &[
        (0, "Female 01", "female_01"),
        (1, "Female 02", "female_02"),
        (2, "Female 03", "female_03"),
        (3, "Male 01", "male_01"),
        (4, "Male 02", "male_02"),
    ];

    /// Prefix of every advertised voice name
    pub const VOICE_NAME_PREFIX: &str = "vosk_";

    pub const DEFAULT_SPEAKER_IDS: &[u32] = &[0, 1, 2, 3, 4];
    pub const DEFAULT_SPEAKER_ID: u32 = 3;
}

/// Program identity advertised by the streaming protocol
pub mod program {
    pub const NAME: &str = "vosk-tts-wyoming";
    pub const DESCRIPTION: &str = "Wyoming server for Vosk TTS";
    pub const VERSION: &str = "1.1";
    pub const VOICE_VERSION: &str = "1.1";
    pub const ATTRIBUTION_NAME: &str = "Vosk";
    pub const ATTRIBUTION_URL: &str = "https://alphacephei.com/vosk/";
}

/// Speech rate policy
pub mod rate {
    pub const DEFAULT: f32 = 1.0;
    pub const MIN: f32 = 0.2;
    pub const MAX: f32 = 2.0;
}

/// Audio defaults (engine output is 16-bit LE mono)
pub mod audio {
    pub const SAMPLE_RATE: u32 = 22050;
    pub const SAMPLE_WIDTH: u16 = 2;
    pub const CHANNELS: u16 = 1;
    pub const SAMPLES_PER_CHUNK: usize = 1024;
}

/// Sentence segmentation of streamed text
pub mod segmenter {
    /// Trailing characters inspected for an abbreviation
    pub const ABBREVIATION_WINDOW: usize = 5;
    /// Longest token treated as an abbreviation, in letters
    pub const ABBREVIATION_MAX_LETTERS: usize = 3;
}

/// Text limits for the HTTP surface
pub mod text {
    pub const MAX_TEXT_LENGTH: usize = 1200;
    pub const OVERFLOW_MESSAGE: &str = "Превышен лимит ввода";
}

/// Listener defaults
pub mod endpoints {
    pub const PROTOCOL_URI: &str = "tcp://0.0.0.0:10200";
    pub const HTTP_HOST: &str = "0.0.0.0";
    pub const HTTP_PORT: u16 = 5002;
}

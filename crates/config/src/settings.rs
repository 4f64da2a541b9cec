//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use voice_tts_core::{AudioFormat, RateRange, SpeakerId};

use crate::constants;
use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Synthesis engine
    #[serde(default)]
    pub engine: EngineConfig,

    /// Speakers and rate policy
    #[serde(default)]
    pub voices: VoiceConfig,

    /// Audio framing
    #[serde(default)]
    pub audio: AudioConfig,

    /// Text normalization collaborators and limits
    #[serde(default)]
    pub text: TextConfig,

    /// Sentence segmentation of streamed text
    #[serde(default)]
    pub segmenter: SegmenterConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings.
    ///
    /// A default speaker missing from `voices.speaker_ids` is replaced by the
    /// first configured id rather than rejected.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.voices.speaker_ids.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "voices.speaker_ids".to_string(),
                message: "No speaker ids provided".to_string(),
            });
        }

        if !self.voices.speaker_ids.contains(&self.voices.default_speaker) {
            let fallback = self.voices.speaker_ids[0];
            tracing::warn!(
                default_speaker = self.voices.default_speaker,
                speaker_ids = ?self.voices.speaker_ids,
                fallback,
                "Default speaker id is not in the provided list, using the first available id"
            );
            self.voices.default_speaker = fallback;
        }

        if !(self.voices.min_rate > 0.0 && self.voices.min_rate <= self.voices.max_rate) {
            return Err(ConfigError::InvalidValue {
                field: "voices.min_rate".to_string(),
                message: format!(
                    "Rate range {}..={} must be positive and non-empty",
                    self.voices.min_rate, self.voices.max_rate
                ),
            });
        }

        if self.voices.default_rate <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "voices.default_rate".to_string(),
                message: "Speech rate must be positive".to_string(),
            });
        }

        if !self.voices.rate_range().contains(self.voices.default_rate) {
            return Err(ConfigError::InvalidValue {
                field: "voices.default_rate".to_string(),
                message: format!(
                    "Default rate {} is outside {}..={}",
                    self.voices.default_rate, self.voices.min_rate, self.voices.max_rate
                ),
            });
        }

        if self.engine.sample_width == 0 || self.engine.channels == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.sample_width".to_string(),
                message: "Sample width and channel count must be non-zero".to_string(),
            });
        }

        if self.segmenter.abbreviation_max_letters == 0 || self.segmenter.abbreviation_window < 2 {
            return Err(ConfigError::InvalidValue {
                field: "segmenter.abbreviation_window".to_string(),
                message: format!(
                    "Abbreviation window {} with at most {} letters cannot match anything",
                    self.segmenter.abbreviation_window, self.segmenter.abbreviation_max_letters
                ),
            });
        }

        if self.engine.kind == EngineKind::Command && self.engine.program.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "engine.program".to_string(),
                message: "Command engine requires a program".to_string(),
            });
        }

        Ok(())
    }
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Serve the HTTP surface
    #[serde(default = "default_true")]
    pub http_enabled: bool,

    /// Framed protocol listen URI (`tcp://host:port` or `unix://path`)
    #[serde(default = "default_protocol_uri")]
    pub protocol_uri: String,

    /// Serve the framed protocol
    #[serde(default = "default_true")]
    pub protocol_enabled: bool,

    /// Enable permissive CORS on the HTTP surface
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

fn default_host() -> String {
    constants::endpoints::HTTP_HOST.to_string()
}
fn default_http_port() -> u16 {
    constants::endpoints::HTTP_PORT
}
fn default_protocol_uri() -> String {
    constants::endpoints::PROTOCOL_URI.to_string()
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            http_enabled: true,
            protocol_uri: default_protocol_uri(),
            protocol_enabled: true,
            cors_enabled: true,
        }
    }
}

/// Engine selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// External program writing raw PCM to stdout
    Command,
    /// Silence generator (development and tests)
    #[default]
    Silence,
}

/// Synthesis engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub kind: EngineKind,

    /// Model name or path
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Program for the command engine
    #[serde(default)]
    pub program: String,

    /// Arguments; `{model}`, `{speaker}`, `{rate}` and `{length_scale}` are substituted
    #[serde(default)]
    pub args: Vec<String>,

    /// Output sample rate (Hz)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Output sample width (bytes)
    #[serde(default = "default_sample_width")]
    pub sample_width: u16,

    /// Output channel count
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Per-call timeout in seconds (0 disables)
    #[serde(default = "default_engine_timeout")]
    pub timeout_seconds: u64,
}

fn default_model_name() -> String {
    constants::model::DEFAULT_MODEL_NAME.to_string()
}
fn default_sample_rate() -> u32 {
    constants::audio::SAMPLE_RATE
}
fn default_sample_width() -> u16 {
    constants::audio::SAMPLE_WIDTH
}
fn default_channels() -> u16 {
    constants::audio::CHANNELS
}
fn default_engine_timeout() -> u64 {
    60
}

impl EngineConfig {
    pub fn format(&self) -> AudioFormat {
        AudioFormat::new(self.sample_rate, self.sample_width, self.channels)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::default(),
            model_name: default_model_name(),
            program: String::new(),
            args: Vec::new(),
            sample_rate: default_sample_rate(),
            sample_width: default_sample_width(),
            channels: default_channels(),
            timeout_seconds: default_engine_timeout(),
        }
    }
}

/// Speaker and rate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Speaker ids available in the model
    #[serde(default = "default_speaker_ids")]
    pub speaker_ids: Vec<SpeakerId>,

    /// Speaker used when a request names none (or an unknown voice)
    #[serde(default = "default_speaker")]
    pub default_speaker: SpeakerId,

    /// Rate used when a request carries none
    #[serde(default = "default_rate")]
    pub default_rate: f32,

    #[serde(default = "default_min_rate")]
    pub min_rate: f32,

    #[serde(default = "default_max_rate")]
    pub max_rate: f32,
}

fn default_speaker_ids() -> Vec<SpeakerId> {
    constants::model::DEFAULT_SPEAKER_IDS.to_vec()
}
fn default_speaker() -> SpeakerId {
    constants::model::DEFAULT_SPEAKER_ID
}
fn default_rate() -> f32 {
    constants::rate::DEFAULT
}
fn default_min_rate() -> f32 {
    constants::rate::MIN
}
fn default_max_rate() -> f32 {
    constants::rate::MAX
}

impl VoiceConfig {
    pub fn rate_range(&self) -> RateRange {
        RateRange::new(self.min_rate, self.max_rate)
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            speaker_ids: default_speaker_ids(),
            default_speaker: default_speaker(),
            default_rate: default_rate(),
            min_rate: default_min_rate(),
            max_rate: default_max_rate(),
        }
    }
}

/// Audio framing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Samples per emitted audio chunk (0 sends each sentence as one chunk)
    #[serde(default = "default_samples_per_chunk")]
    pub samples_per_chunk: usize,
}

fn default_samples_per_chunk() -> usize {
    constants::audio::SAMPLES_PER_CHUNK
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            samples_per_chunk: default_samples_per_chunk(),
        }
    }
}

/// Sentence segmentation of streamed text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Trailing characters checked for an abbreviation before a period
    #[serde(default = "default_abbreviation_window")]
    pub abbreviation_window: usize,

    /// Longest token (in letters) treated as an abbreviation
    #[serde(default = "default_abbreviation_max_letters")]
    pub abbreviation_max_letters: usize,
}

fn default_abbreviation_window() -> usize {
    constants::segmenter::ABBREVIATION_WINDOW
}
fn default_abbreviation_max_letters() -> usize {
    constants::segmenter::ABBREVIATION_MAX_LETTERS
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            abbreviation_window: default_abbreviation_window(),
            abbreviation_max_letters: default_abbreviation_max_letters(),
        }
    }
}

/// Phonemizer used for foreign-word transliteration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhonemizerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_phonemizer_program")]
    pub program: String,

    /// Source-language voice passed to the phonemizer
    #[serde(default = "default_phonemizer_voice")]
    pub voice: String,
}

fn default_phonemizer_program() -> String {
    "espeak-ng".to_string()
}
fn default_phonemizer_voice() -> String {
    "en-us".to_string()
}

impl Default for PhonemizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: default_phonemizer_program(),
            voice: default_phonemizer_voice(),
        }
    }
}

/// Text processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextConfig {
    /// Longest normalized text accepted by the HTTP surface (characters)
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,

    /// Spoken instead of over-long input
    #[serde(default = "default_overflow_message")]
    pub overflow_message: String,

    #[serde(default)]
    pub phonemizer: PhonemizerConfig,

    /// Tab-separated `word<TAB>stressed` lexicon; stress marking is off when unset
    #[serde(default)]
    pub stress_lexicon: Option<String>,
}

fn default_max_text_length() -> usize {
    constants::text::MAX_TEXT_LENGTH
}
fn default_overflow_message() -> String {
    constants::text::OVERFLOW_MESSAGE.to_string()
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            max_text_length: default_max_text_length(),
            overflow_message: default_overflow_message(),
            phonemizer: PhonemizerConfig::default(),
            stress_lexicon: None,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Expose Prometheus metrics at /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load and validate settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (VOICE_TTS_ prefix, `__` separator)
/// 2. `path` (if given)
/// 3. config/{env} (if env specified)
/// 4. config/default
pub fn load_settings(path: Option<&Path>, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut settings = read_settings(path, env)?;
    settings.validate()?;
    Ok(settings)
}

/// Same layering as [`load_settings`], without validation.
///
/// For callers that apply further overrides and validate afterwards.
pub fn read_settings(path: Option<&Path>, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        let layer = File::with_name(&format!("config/{}", env_name)).required(false);
        builder = builder.add_source(layer);
    }

    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix("VOICE_TTS")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("voices.speaker_ids")
            .with_list_parse_key("engine.args"),
    );

    let config = builder.build()?;
    Ok(config.try_deserialize()?)
}

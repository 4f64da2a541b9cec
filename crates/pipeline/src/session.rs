//! Streaming synthesis session
//!
//! One session per connection. States:
//! - `Idle`: single-shot requests are served directly
//! - `Streaming`: text chunks feed a [`SentenceSegmenter`]; each completed
//!   sentence is normalized, synthesized and emitted before the next one
//!
//! Output goes to an `mpsc` channel drained by the connection writer. For
//! every synthesized sentence the order is `AudioStart`, `AudioChunk`*,
//! `AudioStop`. Sentences that normalize to nothing emit no events.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use voice_tts_config::constants::segmenter::{ABBREVIATION_MAX_LETTERS, ABBREVIATION_WINDOW};
use voice_tts_config::{Settings, VoiceCatalogue};
use voice_tts_core::{AudioFormat, AudioFrame, RateRange, SpeakerId};
use voice_tts_text_processing::TextNormalizer;

use crate::engine::EngineHandle;
use crate::frames::split_frames;
use crate::segmenter::SentenceSegmenter;
use crate::PipelineError;

/// Error code sent when the engine fails
pub const SYNTHESIS_FAILED: &str = "synthesis-failed";

/// Error code sent for a single-shot request without text
pub const EMPTY_TEXT: &str = "empty-text";

/// Events produced by a session, in emission order
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    AudioStart(AudioFormat),
    AudioChunk(AudioFrame),
    AudioStop,
    /// Acknowledges the end of a text stream
    StreamStopped,
    Error { text: String, code: String },
}

/// Result of one synthesis attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisOutcome {
    Synthesized {
        bytes: usize,
        frames: usize,
        elapsed: Duration,
    },
    /// Nothing sayable after normalization
    Skipped,
    /// Request refused before synthesis (invalid rate, empty text)
    Rejected { code: String },
    /// Engine failure, reported to the client
    Failed { reason: String },
}

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Streaming,
}

/// Per-session settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub samples_per_chunk: usize,
    pub default_speaker: SpeakerId,
    pub default_rate: f32,
    pub rates: RateRange,
    pub abbreviation_window: usize,
    pub abbreviation_max_letters: usize,
}

impl SessionConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            samples_per_chunk: settings.audio.samples_per_chunk,
            default_speaker: settings.voices.default_speaker,
            default_rate: settings.voices.default_rate,
            rates: settings.voices.rate_range(),
            abbreviation_window: settings.segmenter.abbreviation_window,
            abbreviation_max_letters: settings.segmenter.abbreviation_max_letters,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            samples_per_chunk: 1024,
            default_speaker: 0,
            default_rate: 1.0,
            rates: RateRange::default(),
            abbreviation_window: ABBREVIATION_WINDOW,
            abbreviation_max_letters: ABBREVIATION_MAX_LETTERS,
        }
    }
}

/// Normalize, synthesize and emit one unit of text
struct Synthesizer {
    engine: EngineHandle,
    normalizer: Arc<TextNormalizer>,
    events: mpsc::Sender<SessionEvent>,
    samples_per_chunk: usize,
}

impl Synthesizer {
    async fn send(&self, event: SessionEvent) -> Result<(), PipelineError> {
        self.events.send(event).await.map_err(|_| PipelineError::ChannelClosed)
    }

    async fn send_error(&self, text: String, code: &str) -> Result<(), PipelineError> {
        self.send(SessionEvent::Error {
            text,
            code: code.to_string(),
        })
        .await
    }

    async fn normalize(&self, text: &str) -> Result<String, PipelineError> {
        let normalizer = self.normalizer.clone();
        let text = text.to_string();
        // The phonemizer may spawn processes
        tokio::task::spawn_blocking(move || normalizer.normalize(&text))
            .await
            .map_err(|e| PipelineError::Worker(format!("Normalization task failed: {}", e)))
    }

    async fn emit(
        &self,
        text: &str,
        speaker: SpeakerId,
        rate: f32,
    ) -> Result<SynthesisOutcome, PipelineError> {
        let normalized = self.normalize(text).await?;
        if normalized.trim().is_empty() {
            tracing::debug!(text, "Nothing to synthesize after normalization");
            return Ok(SynthesisOutcome::Skipped);
        }

        let started = Instant::now();
        let pcm = match self.engine.synthesize(&normalized, speaker, rate).await {
            Ok(pcm) => pcm,
            Err(e) if e.is_synthesis_failure() => {
                tracing::error!(speaker, error = %e, "Synthesis failed");
                let message = format!("Synthesis failed for speaker {}", speaker);
                self.send_error(message, SYNTHESIS_FAILED).await?;
                return Ok(SynthesisOutcome::Failed { reason: e.to_string() });
            }
            Err(e) => return Err(e),
        };
        let elapsed = started.elapsed();

        let format = self.engine.format();
        let frames = split_frames(format, &pcm, self.samples_per_chunk);
        let frame_count = frames.len();

        self.send(SessionEvent::AudioStart(format)).await?;
        for frame in frames {
            self.send(SessionEvent::AudioChunk(frame)).await?;
        }
        self.send(SessionEvent::AudioStop).await?;

        tracing::info!(
            speaker,
            bytes = pcm.len(),
            frames = frame_count,
            elapsed_ms = elapsed.as_millis() as u64,
            "Synthesized: {}",
            preview(&normalized)
        );

        Ok(SynthesisOutcome::Synthesized {
            bytes: pcm.len(),
            frames: frame_count,
            elapsed,
        })
    }
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(50).collect();
    if text.chars().count() > 50 {
        out.push_str("...");
    }
    out
}

struct ActiveStream {
    segmenter: SentenceSegmenter,
    speaker: SpeakerId,
    rate: f32,
}

/// Per-connection synthesis session
pub struct SynthesisSession {
    synth: Synthesizer,
    voices: Arc<VoiceCatalogue>,
    config: SessionConfig,
    stream: Option<ActiveStream>,
}

impl SynthesisSession {
    pub fn new(
        engine: EngineHandle,
        normalizer: Arc<TextNormalizer>,
        voices: Arc<VoiceCatalogue>,
        config: SessionConfig,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        Self {
            synth: Synthesizer {
                engine,
                normalizer,
                events,
                samples_per_chunk: config.samples_per_chunk,
            },
            voices,
            config,
            stream: None,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.stream.is_some() {
            SessionState::Streaming
        } else {
            SessionState::Idle
        }
    }

    /// Speaker for a requested voice name; unknown names fall back to the default
    pub fn resolve_voice(&self, voice: Option<&str>) -> SpeakerId {
        match voice {
            None => self.config.default_speaker,
            Some(name) => match self.voices.speaker_for(name) {
                Some(speaker) => speaker,
                None => {
                    tracing::warn!(
                        voice = name,
                        default = self.config.default_speaker,
                        "Requested voice not found, using default speaker"
                    );
                    self.config.default_speaker
                }
            },
        }
    }

    /// Validate a requested rate; none means the default
    pub fn resolve_rate(&self, rate: Option<f32>) -> Result<f32, voice_tts_core::Error> {
        match rate {
            None => Ok(self.config.default_rate),
            Some(rate) => self.config.rates.check(rate),
        }
    }

    /// Resolve the rate, reporting an invalid one to the client
    async fn checked_rate(
        &self,
        rate: Option<f32>,
    ) -> Result<Result<f32, SynthesisOutcome>, PipelineError> {
        match self.resolve_rate(rate) {
            Ok(rate) => Ok(Ok(rate)),
            Err(e) => {
                tracing::warn!(error = %e, "Rejecting request");
                self.synth.send_error(e.to_string(), e.code()).await?;
                Ok(Err(SynthesisOutcome::Rejected {
                    code: e.code().to_string(),
                }))
            }
        }
    }

    /// Single-shot synthesis; ignored while a stream is active
    pub async fn synthesize(
        &mut self,
        text: &str,
        voice: Option<&str>,
        rate: Option<f32>,
    ) -> Result<Option<SynthesisOutcome>, PipelineError> {
        if self.stream.is_some() {
            tracing::warn!("Ignoring single-shot synthesize during an active stream");
            return Ok(None);
        }

        let joined = text
            .trim()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if joined.is_empty() {
            tracing::warn!("Received synthesize request with empty text");
            self.synth
                .send_error("Text cannot be empty".to_string(), EMPTY_TEXT)
                .await?;
            return Ok(Some(SynthesisOutcome::Rejected {
                code: EMPTY_TEXT.to_string(),
            }));
        }

        let rate = match self.checked_rate(rate).await? {
            Ok(rate) => rate,
            Err(outcome) => return Ok(Some(outcome)),
        };
        let speaker = self.resolve_voice(voice);

        self.synth.emit(&joined, speaker, rate).await.map(Some)
    }

    /// Begin a text stream
    pub async fn start_stream(
        &mut self,
        voice: Option<&str>,
        rate: Option<f32>,
    ) -> Result<(), PipelineError> {
        if self.stream.is_some() {
            tracing::warn!("Stream already active, ignoring synthesize-start");
            return Ok(());
        }

        let rate = match self.checked_rate(rate).await? {
            Ok(rate) => rate,
            Err(_) => return Ok(()),
        };
        let speaker = self.resolve_voice(voice);

        let segmenter = SentenceSegmenter::with_abbreviation(
            self.config.abbreviation_window,
            self.config.abbreviation_max_letters,
        )?;

        tracing::debug!(speaker, rate, "Stream started");
        self.stream = Some(ActiveStream {
            segmenter,
            speaker,
            rate,
        });
        Ok(())
    }

    /// Feed a text chunk; completed sentences are synthesized in order
    pub async fn push_chunk(&mut self, text: &str) -> Result<Vec<SynthesisOutcome>, PipelineError> {
        let Some(stream) = self.stream.as_mut() else {
            tracing::warn!("Ignoring synthesize-chunk without an active stream");
            return Ok(Vec::new());
        };

        let (speaker, rate) = (stream.speaker, stream.rate);
        let mut outcomes = Vec::new();
        for sentence in stream.segmenter.add_chunk(text) {
            tracing::debug!(sentence = %sentence, "Sentence complete");
            outcomes.push(self.synth.emit(&sentence, speaker, rate).await?);
        }

        Ok(outcomes)
    }

    /// Flush the stream and acknowledge its end
    pub async fn stop_stream(&mut self) -> Result<Option<SynthesisOutcome>, PipelineError> {
        let outcome = match self.stream.take() {
            Some(mut stream) => {
                let rest = stream.segmenter.finish();
                if rest.is_empty() {
                    None
                } else {
                    Some(self.synth.emit(&rest, stream.speaker, stream.rate).await?)
                }
            }
            None => {
                tracing::warn!("synthesize-stop without an active stream");
                None
            }
        };

        self.synth.send(SessionEvent::StreamStopped).await?;
        tracing::debug!("Stream stopped");
        Ok(outcome)
    }
}

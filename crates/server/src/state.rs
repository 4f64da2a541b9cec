//! Application State
//!
//! Shared state across HTTP handlers and protocol connections.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use voice_tts_config::{Settings, VoiceCatalogue};
use voice_tts_pipeline::{
    create_engine, EngineHandle, SessionConfig, SessionEvent, SynthesisSession,
};
use voice_tts_text_processing::{EspeakPhonemizer, LexiconStressAnnotator, TextNormalizer};

use crate::ServerError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<Settings>,
    /// Exclusive-access engine shared by every connection
    pub engine: EngineHandle,
    pub normalizer: Arc<TextNormalizer>,
    pub voices: Arc<VoiceCatalogue>,
}

impl AppState {
    pub fn new(config: Settings, engine: EngineHandle, normalizer: TextNormalizer) -> Self {
        let voices = VoiceCatalogue::from_speaker_ids(&config.voices.speaker_ids);
        Self {
            config: Arc::new(config),
            engine,
            normalizer: Arc::new(normalizer),
            voices: Arc::new(voices),
        }
    }

    /// Build the engine and normalizer described by `config`
    pub fn from_settings(config: Settings) -> Result<Self, ServerError> {
        let engine = create_engine(&config.engine)?;
        let mut handle = EngineHandle::new(engine);
        if config.engine.timeout_seconds > 0 {
            handle = handle.with_timeout(Duration::from_secs(config.engine.timeout_seconds));
        }

        let normalizer = build_normalizer(&config)?;
        Ok(Self::new(config, handle, normalizer))
    }

    /// A fresh per-connection session emitting into `events`
    pub fn session(&self, events: mpsc::Sender<SessionEvent>) -> SynthesisSession {
        SynthesisSession::new(
            self.engine.clone(),
            self.normalizer.clone(),
            self.voices.clone(),
            SessionConfig::from_settings(&self.config),
            events,
        )
    }
}

fn build_normalizer(config: &Settings) -> Result<TextNormalizer, ServerError> {
    let mut normalizer = TextNormalizer::new();

    let phonemizer = &config.text.phonemizer;
    if phonemizer.enabled {
        tracing::info!(
            program = %phonemizer.program,
            voice = %phonemizer.voice,
            "Phonemizer enabled"
        );
        normalizer = normalizer.with_phonemizer(Arc::new(EspeakPhonemizer::new(
            phonemizer.program.clone(),
            phonemizer.voice.clone(),
        )));
    }

    if let Some(path) = &config.text.stress_lexicon {
        let lexicon = LexiconStressAnnotator::from_file(path).map_err(|e| {
            ServerError::Internal(format!("Failed to load stress lexicon {}: {}", path, e))
        })?;
        tracing::info!(path = %path, entries = lexicon.len(), "Stress lexicon loaded");
        normalizer = normalizer.with_stress_annotator(Arc::new(lexicon));
    }

    Ok(normalizer)
}

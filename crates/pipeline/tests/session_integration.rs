//! End-to-end session behaviour against a scripted engine

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use voice_tts_config::VoiceCatalogue;
use voice_tts_core::{AudioFormat, EngineError, SpeakerId, SynthesisEngine};
use voice_tts_pipeline::session::SYNTHESIS_FAILED;
use voice_tts_pipeline::{
    EngineHandle, SessionConfig, SessionEvent, SynthesisOutcome, SynthesisSession,
};
use voice_tts_text_processing::TextNormalizer;

/// Returns a distinct byte pattern per call and records what it was asked
struct RecordingEngine {
    calls: Mutex<Vec<(String, SpeakerId, f32)>>,
    fail_on: Option<&'static str>,
}

impl RecordingEngine {
    fn new(fail_on: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_on,
        })
    }

    fn payload_for(text: &str) -> Vec<u8> {
        let seed = text.chars().count() as u8;
        (0..1001u32).map(|i| seed.wrapping_add(i as u8)).collect()
    }
}

impl SynthesisEngine for RecordingEngine {
    fn synthesize(
        &self,
        text: &str,
        speaker: SpeakerId,
        rate: f32,
    ) -> Result<Vec<u8>, EngineError> {
        self.calls.lock().push((text.to_string(), speaker, rate));
        if self.fail_on.is_some_and(|needle| text.contains(needle)) {
            return Err(EngineError::Synthesis("scripted failure".to_string()));
        }
        Ok(Self::payload_for(text))
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::new(22050, 2, 1)
    }

    fn model_name(&self) -> &str {
        "recording"
    }
}

fn session_with(engine: Arc<RecordingEngine>) -> (SynthesisSession, mpsc::Receiver<SessionEvent>) {
    let (tx, rx) = mpsc::channel(1024);
    let config = SessionConfig {
        samples_per_chunk: 100,
        default_speaker: 3,
        ..SessionConfig::default()
    };
    let session = SynthesisSession::new(
        EngineHandle::new(engine),
        Arc::new(TextNormalizer::new()),
        Arc::new(VoiceCatalogue::from_speaker_ids(&[0, 1, 2, 3, 4])),
        config,
        tx,
    );
    (session, rx)
}

fn drain(rx: &mut mpsc::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

/// Split an event log into per-sentence audio payloads
fn audio_segments(events: &[SessionEvent]) -> Vec<Vec<u8>> {
    let mut segments = Vec::new();
    let mut current: Option<Vec<u8>> = None;
    for event in events {
        match event {
            SessionEvent::AudioStart(_) => {
                assert!(current.is_none(), "nested AudioStart");
                current = Some(Vec::new());
            }
            SessionEvent::AudioChunk(frame) => {
                current
                    .as_mut()
                    .expect("AudioChunk before AudioStart")
                    .extend_from_slice(&frame.payload);
            }
            SessionEvent::AudioStop => {
                segments.push(current.take().expect("AudioStop before AudioStart"));
            }
            _ => {}
        }
    }
    assert!(current.is_none(), "missing AudioStop");
    segments
}

#[tokio::test]
async fn chunks_reassemble_engine_payload_in_sentence_order() {
    let engine = RecordingEngine::new(None);
    let (mut session, mut rx) = session_with(engine.clone());

    session.start_stream(Some("vosk_female_01"), Some(1.5)).await.unwrap();
    for chunk in ["Сегодня 5% ски", "дка. Завтра — 21%", "! Потом посмотрим"] {
        session.push_chunk(chunk).await.unwrap();
    }
    session.stop_stream().await.unwrap();

    let calls = engine.calls.lock().clone();
    let texts: Vec<&str> = calls.iter().map(|(t, _, _)| t.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Сегодня пять процентов скидка.",
            "Завтра - двадцать один процент!",
            "Потом посмотрим"
        ]
    );
    assert!(calls.iter().all(|(_, speaker, rate)| *speaker == 0 && *rate == 1.5));

    let events = drain(&mut rx);
    assert_eq!(events.last(), Some(&SessionEvent::StreamStopped));

    let segments = audio_segments(&events);
    let expected: Vec<Vec<u8>> = texts.iter().map(|t| RecordingEngine::payload_for(t)).collect();
    assert_eq!(segments, expected);

    // every frame but the last of a sentence is full-size
    for event in &events {
        if let SessionEvent::AudioChunk(frame) = event {
            assert!(frame.len() <= 200);
        }
    }
}

#[tokio::test]
async fn engine_failure_emits_error_without_audio_start() {
    let engine = RecordingEngine::new(Some("сломано"));
    let (mut session, mut rx) = session_with(engine);

    session.start_stream(None, None).await.unwrap();
    let outcomes = session.push_chunk("Тут сломано. Тут нормально. ").await.unwrap();
    session.stop_stream().await.unwrap();

    assert!(matches!(outcomes[0], SynthesisOutcome::Failed { .. }));
    assert!(matches!(outcomes[1], SynthesisOutcome::Synthesized { .. }));

    let events = drain(&mut rx);
    match &events[0] {
        SessionEvent::Error { code, .. } => assert_eq!(code, SYNTHESIS_FAILED),
        other => panic!("expected error first, got {:?}", other),
    }
    assert!(matches!(events[1], SessionEvent::AudioStart(_)));
    assert_eq!(audio_segments(&events).len(), 1);
}

#[tokio::test]
async fn unsayable_sentences_produce_no_events() {
    let engine = RecordingEngine::new(None);
    let (mut session, mut rx) = session_with(engine.clone());

    session.synthesize("🙂 🙂 🙂", Some("vosk_male_01"), None).await.unwrap();
    assert!(drain(&mut rx).is_empty());
    assert!(engine.calls.lock().is_empty());
}

#[tokio::test]
async fn single_shot_joins_lines_and_uses_default_speaker() {
    let engine = RecordingEngine::new(None);
    let (mut session, mut rx) = session_with(engine.clone());

    session
        .synthesize("  Первая строка\n\n  вторая строка  ", Some("unknown_voice"), None)
        .await
        .unwrap();

    let calls = engine.calls.lock().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "Первая строка вторая строка");
    assert_eq!(calls[0].1, 3);
    assert_eq!(audio_segments(&drain(&mut rx)).len(), 1);
}

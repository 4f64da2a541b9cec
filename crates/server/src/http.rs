//! HTTP Endpoints
//!
//! `GET /synthesize` returns a WAV file; `/health` and `/metrics` are for
//! operators.

use std::io::Cursor;
use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use voice_tts_core::{AudioFormat, SpeakerId, SynthesisRequest};

use crate::metrics::{metrics_handler, record_synthesis, record_synthesis_failure};
use crate::state::AppState;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/synthesize", get(synthesize))
        .route("/health", get(health_check));

    if state.config.observability.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    let mut router = router.layer(TraceLayer::new_for_http());
    if state.config.server.cors_enabled {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router.with_state(state)
}

/// Synthesis query parameters
#[derive(Debug, Deserialize)]
struct SynthesizeParams {
    text: Option<String>,
    speaker: Option<SpeakerId>,
    speech_rate: Option<f32>,
}

/// Synthesize text to a WAV file
async fn synthesize(
    State(state): State<AppState>,
    Query(params): Query<SynthesizeParams>,
) -> Result<impl IntoResponse, ServerError> {
    let voices = &state.config.voices;
    let request = SynthesisRequest::new(
        params.text.unwrap_or_default(),
        params.speaker.unwrap_or(voices.default_speaker),
        params.speech_rate.unwrap_or(voices.default_rate),
        &voices.speaker_ids,
        voices.rate_range(),
    )?;

    let mut normalized = normalize(&state, request.text.clone()).await?;
    let limit = state.config.text.max_text_length;
    if normalized.chars().count() > limit {
        tracing::warn!(
            length = normalized.chars().count(),
            limit,
            "Input too long, synthesizing overflow message"
        );
        normalized = normalize(&state, state.config.text.overflow_message.clone()).await?;
    }

    let format = state.engine.format();
    let pcm = if normalized.trim().is_empty() {
        tracing::debug!("Nothing to synthesize after normalization");
        Vec::new()
    } else {
        let started = Instant::now();
        match state.engine.synthesize(&normalized, request.speaker, request.rate).await {
            Ok(pcm) => {
                record_synthesis("http", started.elapsed().as_secs_f64());
                pcm
            }
            Err(e) if e.is_synthesis_failure() => {
                record_synthesis_failure("http");
                return Err(ServerError::Synthesis(e.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
    };

    let wav = encode_wav(format, &pcm)
        .map_err(|e| ServerError::Internal(format!("WAV encoding failed: {}", e)))?;

    tracing::info!(
        speaker = request.speaker,
        rate = request.rate,
        duration_ms = format.duration_ms(pcm.len()),
        "HTTP synthesis complete"
    );

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "audio/wav")], wav))
}

async fn normalize(state: &AppState, text: String) -> Result<String, ServerError> {
    let normalizer = state.normalizer.clone();
    tokio::task::spawn_blocking(move || normalizer.normalize(&text))
        .await
        .map_err(|e| ServerError::Internal(format!("Normalization task failed: {}", e)))
}

/// Wrap raw little-endian PCM in a WAV container
///
/// A trailing partial sample is dropped with a warning.
pub fn encode_wav(format: AudioFormat, pcm: &[u8]) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: format.sample_width * 8,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        match format.sample_width {
            1 => {
                // 8-bit WAV is unsigned; hound takes signed samples
                for &b in pcm {
                    writer.write_sample((b as i16 - 128) as i8)?;
                }
            }
            2 => {
                let samples = pcm.chunks_exact(2);
                warn_partial_sample(samples.remainder().len(), pcm.len());
                for s in samples {
                    writer.write_sample(i16::from_le_bytes([s[0], s[1]]))?;
                }
            }
            4 => {
                let samples = pcm.chunks_exact(4);
                warn_partial_sample(samples.remainder().len(), pcm.len());
                for s in samples {
                    writer.write_sample(i32::from_le_bytes([s[0], s[1], s[2], s[3]]))?;
                }
            }
            _ => return Err(hound::Error::Unsupported),
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

fn warn_partial_sample(dropped: usize, total: usize) {
    if dropped > 0 {
        tracing::warn!(dropped, total, "PCM length is not a whole number of samples");
    }
}

/// Health check
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "model_name": state.engine.model_name(),
        "model_loaded": true,
        "default_speaker_id": state.config.voices.default_speaker,
        "available_speaker_ids": state.config.voices.speaker_ids,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;
    use voice_tts_config::Settings;

    fn test_state() -> AppState {
        let mut settings = Settings::default();
        settings.text.phonemizer.enabled = false;
        settings.text.max_text_length = 40;
        AppState::from_settings(settings).unwrap()
    }

    async fn get(uri: &str) -> (StatusCode, Vec<u8>) {
        let response = create_router(test_state())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn wav_samples(bytes: &[u8]) -> (hound::WavSpec, usize) {
        let reader = hound::WavReader::new(Cursor::new(bytes.to_vec())).unwrap();
        (reader.spec(), reader.len() as usize)
    }

    #[tokio::test]
    async fn test_synthesize_returns_wav() {
        // "привет"
        let (status, body) =
            get("/synthesize?text=%D0%BF%D1%80%D0%B8%D0%B2%D0%B5%D1%82").await;
        assert_eq!(status, StatusCode::OK);
        let (spec, samples) = wav_samples(&body);
        assert_eq!(spec.sample_rate, 22050);
        assert_eq!(spec.bits_per_sample, 16);
        assert!(samples > 0);
    }

    #[tokio::test]
    async fn test_missing_text_is_bad_request() {
        let (status, body) = get("/synthesize").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "invalid-request");
    }

    #[tokio::test]
    async fn test_rate_and_speaker_validation() {
        let (status, _) = get("/synthesize?text=abc&speech_rate=2.5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get("/synthesize?text=abc&speaker=42").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unsayable_text_gives_empty_wav() {
        // three emoji
        let (status, body) = get("/synthesize?text=%F0%9F%99%82%F0%9F%99%82%F0%9F%99%82").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(wav_samples(&body).1, 0);
    }

    #[tokio::test]
    async fn test_overflow_message_replaces_long_text() {
        let long = "%D0%B0%20".repeat(100); // "а " x 100
        let (status, body) = get(&format!("/synthesize?text={}", long)).await;
        assert_eq!(status, StatusCode::OK);

        // silence engine: 50 ms per character; the message has 20
        assert_eq!("Превышен лимит ввода".chars().count(), 20);
        assert_eq!(wav_samples(&body).1, 22050);
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["model_name"], "silence");
        assert_eq!(json["default_speaker_id"], 3);
        assert_eq!(json["available_speaker_ids"], serde_json::json!([0, 1, 2, 3, 4]));
    }

    #[test]
    fn test_encode_wav_sample_count() {
        let wav = encode_wav(AudioFormat::new(16000, 2, 1), &[0, 0, 1, 0, 2, 0]).unwrap();
        let (spec, samples) = wav_samples(&wav);
        assert_eq!(spec.sample_rate, 16000);
        assert_eq!(samples, 3);
        assert!(encode_wav(AudioFormat::new(16000, 3, 1), &[0; 3]).is_err());
    }

    #[test]
    fn test_encode_wav_drops_partial_sample() {
        let wav = encode_wav(AudioFormat::new(16000, 2, 1), &[0, 0, 1, 0, 7]).unwrap();
        assert_eq!(wav_samples(&wav).1, 2);

        let wav = encode_wav(AudioFormat::new(16000, 4, 1), &[1, 0, 0, 0, 9, 9]).unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let samples: Vec<i32> = reader.samples::<i32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![1]);
    }
}

//! Framed Protocol Server
//!
//! One handler task per connection reads events and drives a
//! [`SynthesisSession`]. A single writer task owns the socket's write half
//! and drains two queues: session events (audio, errors, stream
//! acknowledgements) and control replies such as `info`. Session events
//! are always drained first, so a reply never overtakes audio produced
//! before it.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::Instrument;
use uuid::Uuid;

use voice_tts_config::constants::program;
use voice_tts_pipeline::{SessionEvent, SynthesisSession};
use voice_tts_transport::messages::{
    self, Attribution, AudioChunk, AudioStart, AudioStop, Describe, Info, Synthesize,
    SynthesizeChunk, SynthesizeStart, SynthesizeStop, SynthesizeStopped, TtsProgram, TtsVoice,
};
use voice_tts_transport::{read_event, write_event, Event, ListenUri, Message, TransportError};

use crate::metrics::{record_connection, record_outcome};
use crate::state::AppState;
use crate::ServerError;

/// Error code for failures that end the connection
pub const INTERNAL_ERROR: &str = "internal-error";

const SESSION_BUFFER: usize = 256;
const CONTROL_BUFFER: usize = 16;

/// Accept connections on `uri` until `shutdown` flips
pub async fn serve_protocol(
    uri: ListenUri,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    match &uri {
        ListenUri::Tcp(addr) => {
            let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
            tracing::info!(uri = %uri, "Protocol server listening");
            loop {
                tokio::select! {
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            if let Err(e) = stream.set_nodelay(true) {
                                tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
                            }
                            spawn_connection(stream, peer.to_string(), state.clone());
                        }
                        Err(e) => tracing::warn!(error = %e, "Accept failed"),
                    },
                    _ = shutdown.changed() => break,
                }
            }
        }
        #[cfg(unix)]
        ListenUri::Unix(path) => {
            if path.exists() {
                tracing::warn!(path = %path.display(), "Removing stale socket");
                std::fs::remove_file(path)?;
            }
            let listener = tokio::net::UnixListener::bind(path)?;
            tracing::info!(uri = %uri, "Protocol server listening");
            loop {
                tokio::select! {
                    accepted = listener.accept() => match accepted {
                        Ok((stream, _)) => {
                            spawn_connection(stream, path.display().to_string(), state.clone())
                        }
                        Err(e) => tracing::warn!(error = %e, "Accept failed"),
                    },
                    _ = shutdown.changed() => break,
                }
            }
            if let Err(e) = std::fs::remove_file(path) {
                tracing::debug!(error = %e, "Failed to remove socket");
            }
        }
        #[cfg(not(unix))]
        ListenUri::Unix(_) => {
            let reason = format!("{} (unix sockets unavailable)", uri);
            return Err(TransportError::UnsupportedUri(reason).into());
        }
    }

    tracing::info!("Protocol server stopped");
    Ok(())
}

fn spawn_connection<S>(stream: S, peer: String, state: AppState)
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    record_connection();
    let span = tracing::info_span!("connection", id = %Uuid::new_v4(), peer = %peer);
    tokio::spawn(
        async move {
            tracing::info!("Client connected");
            if let Err(e) = handle_connection(stream, state).await {
                tracing::warn!(error = %e, "Connection closed with error");
            }
        }
        .instrument(span),
    );
}

/// Serve one client until it disconnects or an unexpected error occurs.
///
/// Unexpected errors are reported to the client with an `error` event
/// before the connection is closed.
pub async fn handle_connection<S>(stream: S, state: AppState) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    let (session_tx, session_rx) = mpsc::channel(SESSION_BUFFER);
    let (control_tx, control_rx) = mpsc::channel(CONTROL_BUFFER);
    let writer = tokio::spawn(write_loop(write_half, session_rx, control_rx).in_current_span());

    let mut session = state.session(session_tx);
    let result = read_loop(&mut reader, &mut session, &control_tx, &state).await;

    if let Err(e) = &result {
        tracing::error!(error = %e, "Unexpected error handling event");
        if let Ok(event) = messages::Error::new(e.to_string(), INTERNAL_ERROR).to_event() {
            let _ = control_tx.send(event).await;
        }
    }

    // Closing both queues ends the writer once it has flushed them
    drop(session);
    drop(control_tx);
    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(error = %e, "Writer stopped"),
        Err(e) => tracing::warn!(error = %e, "Writer task failed"),
    }

    tracing::info!("Client disconnected");
    result
}

async fn read_loop<R>(
    reader: &mut R,
    session: &mut SynthesisSession,
    control: &mpsc::Sender<Event>,
    state: &AppState,
) -> Result<(), ServerError>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    while let Some(event) = read_event(reader).await? {
        handle_event(&event, session, control, state).await?;
    }
    Ok(())
}

async fn handle_event(
    event: &Event,
    session: &mut SynthesisSession,
    control: &mpsc::Sender<Event>,
    state: &AppState,
) -> Result<(), ServerError> {
    tracing::debug!(event_type = %event.event_type, "Received event");

    if Describe::is_type(event) {
        control
            .send(info(state).to_event()?)
            .await
            .map_err(|_| ServerError::Internal("writer closed".to_string()))?;
    } else if Synthesize::is_type(event) {
        let request = Synthesize::from_event(event)?;
        if let Some(outcome) = session
            .synthesize(&request.text, request.voice_name(), request.rate)
            .await?
        {
            record_outcome("protocol", &outcome);
        }
    } else if SynthesizeStart::is_type(event) {
        let start = SynthesizeStart::from_event(event)?;
        session.start_stream(start.voice_name(), start.rate).await?;
    } else if SynthesizeChunk::is_type(event) {
        let chunk = SynthesizeChunk::from_event(event)?;
        for outcome in session.push_chunk(&chunk.text).await? {
            record_outcome("protocol", &outcome);
        }
    } else if SynthesizeStop::is_type(event) {
        if let Some(outcome) = session.stop_stream().await? {
            record_outcome("protocol", &outcome);
        }
    } else {
        tracing::debug!(event_type = %event.event_type, "Ignoring unsupported event");
    }

    Ok(())
}

async fn write_loop<W>(
    mut writer: W,
    mut session_rx: mpsc::Receiver<SessionEvent>,
    mut control_rx: mpsc::Receiver<Event>,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let mut session_open = true;
    let mut control_open = true;

    while session_open || control_open {
        let event = tokio::select! {
            biased;
            received = session_rx.recv(), if session_open => match received {
                Some(event) => to_event(event)?,
                None => {
                    session_open = false;
                    continue;
                }
            },
            received = control_rx.recv(), if control_open => match received {
                Some(event) => event,
                None => {
                    control_open = false;
                    continue;
                }
            },
        };
        write_event(&mut writer, &event).await?;
    }

    writer.shutdown().await?;
    Ok(())
}

fn to_event(event: SessionEvent) -> Result<Event, TransportError> {
    match event {
        SessionEvent::AudioStart(format) => AudioStart::from(format).to_event(),
        SessionEvent::AudioChunk(frame) => AudioChunk::from(frame).to_event(),
        SessionEvent::AudioStop => AudioStop {}.to_event(),
        SessionEvent::StreamStopped => SynthesizeStopped {}.to_event(),
        SessionEvent::Error { text, code } => messages::Error::new(text, code).to_event(),
    }
}

/// Program and voice description sent in reply to `describe`
pub fn info(state: &AppState) -> Info {
    let attribution = Attribution {
        name: program::ATTRIBUTION_NAME.to_string(),
        url: program::ATTRIBUTION_URL.to_string(),
    };

    let voices = state
        .voices
        .iter()
        .map(|voice| TtsVoice {
            name: voice.name.clone(),
            description: Some(voice.description.clone()),
            attribution: attribution.clone(),
            installed: true,
            version: Some(program::VOICE_VERSION.to_string()),
            languages: vec![voice.language.clone()],
        })
        .collect();

    Info {
        tts: vec![TtsProgram {
            name: program::NAME.to_string(),
            description: Some(program::DESCRIPTION.to_string()),
            attribution,
            installed: true,
            version: Some(program::VERSION.to_string()),
            voices,
            supports_synthesize_streaming: true,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::io::{duplex, DuplexStream, ReadHalf, WriteHalf};
    use voice_tts_config::Settings;
    use voice_tts_core::{AudioFormat, EngineError, SpeakerId, SynthesisEngine};
    use voice_tts_pipeline::{EngineHandle, SilenceEngine};
    use voice_tts_text_processing::TextNormalizer;

    struct BrokenEngine;

    impl SynthesisEngine for BrokenEngine {
        fn synthesize(
            &self,
            _text: &str,
            _speaker: SpeakerId,
            _rate: f32,
        ) -> Result<Vec<u8>, EngineError> {
            Err(EngineError::Synthesis("model crashed".to_string()))
        }

        fn format(&self) -> AudioFormat {
            AudioFormat::default()
        }

        fn model_name(&self) -> &str {
            "broken"
        }
    }

    struct Client {
        reader: BufReader<ReadHalf<DuplexStream>>,
        writer: WriteHalf<DuplexStream>,
        server: tokio::task::JoinHandle<Result<(), ServerError>>,
    }

    impl Client {
        fn connect(engine: Arc<dyn SynthesisEngine>) -> Self {
            let mut settings = Settings::default();
            settings.text.phonemizer.enabled = false;
            let state = AppState::new(settings, EngineHandle::new(engine), TextNormalizer::new());

            let (client, server) = duplex(64 * 1024);
            let server = tokio::spawn(handle_connection(server, state));
            let (read_half, writer) = tokio::io::split(client);
            Self {
                reader: BufReader::new(read_half),
                writer,
                server,
            }
        }

        async fn send<M: Message>(&mut self, message: M) {
            write_event(&mut self.writer, &message.to_event().unwrap()).await.unwrap();
        }

        async fn recv(&mut self) -> Event {
            read_event(&mut self.reader).await.unwrap().expect("connection closed")
        }

        /// Read until an event of `event_type` arrives, returning everything read
        async fn recv_until(&mut self, event_type: &str) -> Vec<Event> {
            let mut events = Vec::new();
            loop {
                let event = self.recv().await;
                let done = event.is_type(event_type);
                events.push(event);
                if done {
                    return events;
                }
            }
        }
    }

    fn silence() -> Arc<dyn SynthesisEngine> {
        Arc::new(SilenceEngine::new(AudioFormat::default()))
    }

    fn audio_bytes(events: &[Event]) -> usize {
        events
            .iter()
            .filter(|e| e.is_type(AudioChunk::TYPE))
            .map(Event::payload_len)
            .sum()
    }

    #[tokio::test]
    async fn test_describe_lists_voices() {
        let mut client = Client::connect(silence());
        client.send(Describe {}).await;

        let info = Info::from_event(&client.recv().await).unwrap();
        let program = &info.tts[0];
        assert_eq!(program.name, "vosk-tts-wyoming");
        assert!(program.supports_synthesize_streaming);
        let names: Vec<&str> = program.voices.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "vosk_female_01",
                "vosk_female_02",
                "vosk_female_03",
                "vosk_male_01",
                "vosk_male_02"
            ]
        );
        assert!(program.voices.iter().all(|v| v.languages == vec!["ru".to_string()]));
    }

    #[tokio::test]
    async fn test_single_shot_audio() {
        let mut client = Client::connect(silence());
        client
            .send(Synthesize {
                text: "привет".into(),
                voice: Some(messages::SynthesizeVoice::named("vosk_female_01")),
                rate: None,
            })
            .await;

        let events = client.recv_until(AudioStop::TYPE).await;
        assert!(events[0].is_type(AudioStart::TYPE));
        assert_eq!(
            AudioStart::from_event(&events[0]).unwrap(),
            AudioStart::from(AudioFormat::default())
        );
        // 6 characters of 50 ms silence at 22050 Hz, 16-bit
        assert_eq!(audio_bytes(&events), 6615 * 2);
        assert!(events[1..events.len() - 1]
            .iter()
            .all(|e| e.is_type(AudioChunk::TYPE) && e.payload_len() <= 2048));
    }

    #[tokio::test]
    async fn test_streaming_sentences_then_stopped() {
        let mut client = Client::connect(silence());
        client.send(SynthesizeStart::default()).await;
        client.send(SynthesizeChunk { text: "Привет. Как".into() }).await;
        client.send(SynthesizeChunk { text: " дела".into() }).await;
        client.send(SynthesizeStop {}).await;

        let events = client.recv_until(SynthesizeStopped::TYPE).await;
        let starts = events.iter().filter(|e| e.is_type(AudioStart::TYPE)).count();
        let stops = events.iter().filter(|e| e.is_type(AudioStop::TYPE)).count();
        assert_eq!((starts, stops), (2, 2));
        assert!(events.last().unwrap().is_type(SynthesizeStopped::TYPE));
        assert!(events[events.len() - 2].is_type(AudioStop::TYPE));
    }

    #[tokio::test]
    async fn test_invalid_rate_keeps_connection() {
        let mut client = Client::connect(silence());
        client
            .send(Synthesize {
                text: "привет".into(),
                voice: None,
                rate: Some(9.0),
            })
            .await;

        let error = messages::Error::from_event(&client.recv().await).unwrap();
        assert_eq!(error.code.as_deref(), Some("invalid-rate"));

        client.send(Describe {}).await;
        assert!(client.recv().await.is_type(Info::TYPE));
    }

    #[tokio::test]
    async fn test_engine_failure_reported() {
        let mut client = Client::connect(Arc::new(BrokenEngine));
        client
            .send(Synthesize {
                text: "привет".into(),
                voice: None,
                rate: None,
            })
            .await;

        let error = messages::Error::from_event(&client.recv().await).unwrap();
        assert_eq!(error.code.as_deref(), Some("synthesis-failed"));

        client.send(Describe {}).await;
        assert!(client.recv().await.is_type(Info::TYPE));
    }

    #[tokio::test]
    async fn test_malformed_event_closes_connection() {
        let mut client = Client::connect(silence());
        let mut bad = Event::new(Synthesize::TYPE);
        bad.data.insert("voice".into(), serde_json::json!({"name": "vosk_male_01"}));
        write_event(&mut client.writer, &bad).await.unwrap();

        let error = messages::Error::from_event(&client.recv().await).unwrap();
        assert_eq!(error.code.as_deref(), Some(INTERNAL_ERROR));
        assert!(read_event(&mut client.reader).await.unwrap().is_none());
        assert!(client.server.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_chunk_without_stream_is_ignored() {
        let mut client = Client::connect(silence());
        client.send(SynthesizeChunk { text: "Привет. ".into() }).await;
        client.send(Describe {}).await;
        assert!(client.recv().await.is_type(Info::TYPE));
    }

    #[tokio::test]
    async fn test_client_hangup_ends_handler() {
        let client = Client::connect(silence());
        let Client { reader, writer, server } = client;
        drop(writer);
        drop(reader);
        assert!(server.await.unwrap().is_ok());
    }
}

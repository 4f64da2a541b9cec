//! Speech Synthesis Server Entry Point

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use voice_tts_config::{read_settings, Settings};
use voice_tts_core::SpeakerId;
use voice_tts_server::{create_router, init_metrics, serve_protocol, AppState, ServerError};
use voice_tts_transport::ListenUri;

#[derive(Parser, Debug)]
#[command(name = "voice-tts")]
#[command(version)]
#[command(about = "Russian speech synthesis over HTTP and a framed streaming protocol")]
#[command(after_help = "Settings are layered (highest priority first):
  1. command-line flags
  2. environment variables (VOICE_TTS__SECTION__KEY)
  3. --config <file>
  4. config/<env> when --env is given
  5. config/default")]
struct Args {
    /// Extra configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Configuration environment, loads config/<env>
    #[arg(long)]
    env: Option<String>,

    /// Protocol listen URI (tcp://host:port or unix://path)
    #[arg(long)]
    uri: Option<String>,

    /// HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Samples per audio chunk
    #[arg(long)]
    samples_per_chunk: Option<usize>,

    /// Speaker used when a request names none or an unknown voice
    #[arg(long)]
    default_speaker_id: Option<SpeakerId>,

    /// Available speaker ids, comma separated
    #[arg(long, value_delimiter = ',')]
    speaker_ids: Option<Vec<SpeakerId>>,

    /// Default speech rate
    #[arg(long)]
    speech_rate: Option<f32>,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(uri) = &self.uri {
            settings.server.protocol_uri = uri.clone();
        }
        if let Some(port) = self.http_port {
            settings.server.http_port = port;
        }
        if let Some(samples) = self.samples_per_chunk {
            settings.audio.samples_per_chunk = samples;
        }
        if let Some(speaker) = self.default_speaker_id {
            settings.voices.default_speaker = speaker;
        }
        if let Some(ids) = &self.speaker_ids {
            settings.voices.speaker_ids = ids.clone();
        }
        if let Some(rate) = self.speech_rate {
            settings.voices.default_rate = rate;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = read_settings(args.config.as_deref(), args.env.as_deref())
        .context("Failed to load configuration")?;
    args.apply(&mut settings);

    // validation logs its fallbacks, so it runs once the subscriber exists
    init_tracing(&settings);
    settings.validate().context("Invalid configuration")?;

    tracing::info!("Starting voice-tts v{}", env!("CARGO_PKG_VERSION"));

    if settings.observability.metrics_enabled {
        init_metrics()?;
        tracing::info!("Initialized Prometheus metrics at /metrics");
    }

    let state = AppState::from_settings(settings.clone())?;
    tracing::info!(
        model = %state.engine.model_name(),
        voices = state.voices.len(),
        default_speaker = settings.voices.default_speaker,
        "Initialized application state"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut listeners: JoinSet<Result<(), ServerError>> = JoinSet::new();

    if settings.server.protocol_enabled {
        let uri: ListenUri = settings.server.protocol_uri.parse()?;
        listeners.spawn(serve_protocol(uri, state.clone(), shutdown_rx.clone()));
    }

    if settings.server.http_enabled {
        let addr = format!("{}:{}", settings.server.host, settings.server.http_port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind HTTP listener on {}", addr))?;
        tracing::info!("HTTP listening on {}", addr);

        let app = create_router(state.clone());
        let mut stop = shutdown_rx.clone();
        listeners.spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop.changed().await;
                })
                .await?;
            Ok(())
        });
    }

    if listeners.is_empty() {
        anyhow::bail!("Both the HTTP and the protocol listener are disabled");
    }

    tokio::select! {
        _ = shutdown_signal() => {}
        Some(exited) = listeners.join_next() => {
            log_listener_exit(exited);
            tracing::warn!("A listener stopped, shutting down");
        }
    }

    let _ = shutdown_tx.send(true);
    while let Some(exited) = listeners.join_next().await {
        log_listener_exit(exited);
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn log_listener_exit(exited: Result<Result<(), ServerError>, tokio::task::JoinError>) {
    match exited {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Listener failed"),
        Err(e) => tracing::error!(error = %e, "Listener task panicked"),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("voice_tts={},tower_http=debug", level).into()
    });

    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let args = Args::parse_from([
            "voice-tts",
            "--uri",
            "unix:///tmp/tts.sock",
            "--speaker-ids",
            "0,4",
            "--default-speaker-id",
            "4",
            "--speech-rate",
            "1.5",
            "--samples-per-chunk",
            "512",
        ]);
        let mut settings = Settings::default();
        args.apply(&mut settings);

        assert_eq!(settings.server.protocol_uri, "unix:///tmp/tts.sock");
        assert_eq!(settings.voices.speaker_ids, vec![0, 4]);
        assert_eq!(settings.voices.default_speaker, 4);
        assert_eq!(settings.voices.default_rate, 1.5);
        assert_eq!(settings.audio.samples_per_chunk, 512);
        assert!(settings.validate().is_ok());
    }
}

//! Speech Synthesis Server
//!
//! Provides the HTTP endpoints and the framed streaming protocol listener.

pub mod http;
pub mod metrics;
pub mod protocol;
pub mod state;

pub use http::create_router;
pub use self::metrics::init_metrics;
pub use protocol::{handle_connection, serve_protocol};
pub use state::AppState;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use voice_tts_config::ConfigError;
use voice_tts_pipeline::PipelineError;
use voice_tts_transport::TransportError;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<voice_tts_core::Error> for ServerError {
    fn from(err: voice_tts_core::Error) -> Self {
        ServerError::InvalidRequest(err.to_string())
    }
}

impl ServerError {
    /// Machine-readable code for error bodies
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest(_) => "invalid-request",
            ServerError::Synthesis(_) => "synthesis-failed",
            _ => "internal-error",
        }
    }
}

impl From<&ServerError> for StatusCode {
    fn from(err: &ServerError) -> Self {
        match err {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        }));
        (status, body).into_response()
    }
}

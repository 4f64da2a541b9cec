//! Streaming synthesis pipeline
//!
//! Components:
//! - Sentence boundary segmenter for text arriving in arbitrary chunks
//! - Exclusive-access handle around the blocking synthesis engine
//! - Engine implementations (external command, silence)
//! - Audio framing and the per-connection synthesis session

pub mod engine;
pub mod frames;
pub mod segmenter;
pub mod session;

pub use engine::{create_engine, CommandEngine, EngineHandle, SilenceEngine};
pub use frames::{frame_size, split_frames};
pub use segmenter::SentenceSegmenter;
pub use session::{
    SessionConfig, SessionEvent, SessionState, SynthesisOutcome, SynthesisSession,
};

use std::time::Duration;
use thiserror::Error;
use voice_tts_core::EngineError;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Invalid request: {0}")]
    Request(#[from] voice_tts_core::Error),

    #[error("Engine call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("Event channel closed")]
    ChannelClosed,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    /// The engine call failed, as opposed to a bad request or a closed channel
    pub fn is_synthesis_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::Engine(_) | PipelineError::Timeout(_) | PipelineError::Worker(_)
        )
    }
}

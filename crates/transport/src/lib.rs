//! Framed event protocol
//!
//! Every event is one JSON header line, optionally followed by a JSON data
//! section and a binary payload whose lengths the header announces:
//!
//! ```text
//! {"type":"audio-chunk","version":"1.5.4","data_length":42,"payload_length":2048}\n
//! {"rate":22050,"width":2,"channels":1}<2048 bytes of PCM>
//! ```
//!
//! Modules:
//! - [`event`]: the untyped [`Event`] envelope
//! - [`messages`]: typed messages (describe, synthesize, audio, error, ...)
//! - [`codec`]: async reader and writer
//! - [`uri`]: listen addresses (`tcp://host:port`, `unix://path`)

pub mod codec;
pub mod event;
pub mod messages;
pub mod uri;

pub use codec::{read_event, write_event};
pub use event::Event;
pub use messages::Message;
pub use uri::ListenUri;

use thiserror::Error;

/// Version written into every header
pub const PROTOCOL_VERSION: &str = "1.5.4";

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("{what} of {length} bytes exceeds limit of {max}")]
    TooLarge {
        what: &'static str,
        length: usize,
        max: usize,
    },

    #[error("Expected '{expected}' event, got '{actual}'")]
    UnexpectedType { expected: &'static str, actual: String },

    #[error("Unsupported URI: {0}")]
    UnsupportedUri(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;

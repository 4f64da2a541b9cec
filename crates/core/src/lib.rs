//! Core types for the speech synthesis service
//!
//! This crate holds the vocabulary shared by every other crate:
//! - **Audio**: PCM format description and the frames sent to clients
//! - **Requests**: validated synthesis requests and the rate/speaker policy
//! - **Engine**: the boundary trait of the external synthesis engine
//!
//! Nothing in here performs I/O.

pub mod audio;
pub mod engine;
pub mod error;
pub mod request;

pub use audio::{AudioFormat, AudioFrame};
pub use engine::{EngineError, SynthesisEngine};
pub use error::{Error, Result};
pub use request::{RateRange, SpeakerId, SynthesisRequest};

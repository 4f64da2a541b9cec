//! Synthesis engine access
//!
//! The engine is blocking and not safe for concurrent use. [`EngineHandle`]
//! owns the single exclusive-access gate for the process: every call waits
//! for the gate, then runs on the blocking thread pool so protocol I/O is
//! not stalled.
//!
//! A call cannot be cancelled. If the caller goes away while the engine is
//! running, the call still completes and keeps the gate until it does; its
//! result is discarded.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use voice_tts_config::{EngineConfig, EngineKind};
use voice_tts_core::{AudioFormat, EngineError, SpeakerId, SynthesisEngine};

use crate::PipelineError;

/// Shared, serialized access to the synthesis engine
#[derive(Clone)]
pub struct EngineHandle {
    engine: Arc<dyn SynthesisEngine>,
    gate: Arc<Mutex<()>>,
    timeout: Option<Duration>,
}

impl EngineHandle {
    pub fn new(engine: Arc<dyn SynthesisEngine>) -> Self {
        Self {
            engine,
            gate: Arc::new(Mutex::new(())),
            timeout: None,
        }
    }

    /// Give up waiting for a result after `timeout`.
    ///
    /// The engine call itself keeps running and holds the gate.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn format(&self) -> AudioFormat {
        self.engine.format()
    }

    pub fn model_name(&self) -> &str {
        self.engine.model_name()
    }

    /// Synthesize normalized text to raw PCM
    pub async fn synthesize(
        &self,
        text: &str,
        speaker: SpeakerId,
        rate: f32,
    ) -> Result<Vec<u8>, PipelineError> {
        let guard = self.gate.clone().lock_owned().await;

        let engine = self.engine.clone();
        let text = text.to_string();
        let started = Instant::now();

        let task = tokio::task::spawn_blocking(move || {
            // Released only when the engine returns, even if the caller is gone
            let _guard = guard;
            engine.synthesize(&text, speaker, rate)
        });

        let joined = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| PipelineError::Timeout(limit))?,
            None => task.await,
        };

        let pcm = joined.map_err(|e| PipelineError::Worker(format!("Task join error: {}", e)))??;

        tracing::debug!(
            speaker,
            rate,
            bytes = pcm.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Engine call complete"
        );

        Ok(pcm)
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("model", &self.engine.model_name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Engine backed by an external program
///
/// The program receives the text on stdin and writes raw PCM of the
/// configured format to stdout. `{model}`, `{speaker}`, `{rate}` and
/// `{length_scale}` in the arguments are substituted per call.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    model_name: String,
    format: AudioFormat,
}

impl CommandEngine {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        model_name: impl Into<String>,
        format: AudioFormat,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            model_name: model_name.into(),
            format,
        }
    }

    fn render_args(&self, speaker: SpeakerId, rate: f32) -> Vec<String> {
        let length_scale = if rate > 0.0 { 1.0 / rate } else { 1.0 };
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{model}", &self.model_name)
                    .replace("{speaker}", &speaker.to_string())
                    .replace("{rate}", &rate.to_string())
                    .replace("{length_scale}", &format!("{:.3}", length_scale))
            })
            .collect()
    }
}

impl SynthesisEngine for CommandEngine {
    fn synthesize(
        &self,
        text: &str,
        speaker: SpeakerId,
        rate: f32,
    ) -> Result<Vec<u8>, EngineError> {
        let mut child = Command::new(&self.program)
            .args(self.render_args(speaker, rate))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                EngineError::Unavailable(format!("failed to spawn '{}': {}", self.program, e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Unavailable("engine stdin not captured".to_string()))?;
        let input = text.as_bytes().to_vec();
        // Written from a separate thread so a full stdout pipe cannot deadlock us
        let writer = std::thread::spawn(move || stdin.write_all(&input));

        let output = child
            .wait_with_output()
            .map_err(|e| EngineError::Synthesis(format!("waiting for engine: {}", e)))?;

        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(EngineError::Synthesis(format!("writing engine input: {}", e)));
            }
            Err(_) => {
                return Err(EngineError::Synthesis("engine input writer panicked".to_string()));
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Synthesis(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let pcm = output.stdout;
        if pcm.is_empty() {
            return Err(EngineError::UnexpectedOutput("engine produced no audio".to_string()));
        }

        let unit = self.format.bytes_per_sample();
        if unit > 0 && pcm.len() % unit != 0 {
            tracing::warn!(bytes = pcm.len(), unit, "Engine output is not sample aligned");
        }

        Ok(pcm)
    }

    fn format(&self) -> AudioFormat {
        self.format
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Engine that returns silence (~50 ms per character, scaled by rate)
#[derive(Debug, Clone)]
pub struct SilenceEngine {
    format: AudioFormat,
    model_name: String,
}

impl SilenceEngine {
    pub fn new(format: AudioFormat) -> Self {
        tracing::warn!("Using silence engine - audio output will be silence");
        Self {
            format,
            model_name: "silence".to_string(),
        }
    }
}

impl SynthesisEngine for SilenceEngine {
    fn synthesize(
        &self,
        text: &str,
        _speaker: SpeakerId,
        rate: f32,
    ) -> Result<Vec<u8>, EngineError> {
        let samples_per_char = self.format.sample_rate as f32 / 20.0 / rate.max(f32::EPSILON);
        let samples = (text.chars().count() as f32 * samples_per_char) as usize;
        Ok(vec![0u8; samples * self.format.bytes_per_sample()])
    }

    fn format(&self) -> AudioFormat {
        self.format
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Create the configured engine
pub fn create_engine(config: &EngineConfig) -> Result<Arc<dyn SynthesisEngine>, PipelineError> {
    let format = config.format();
    match config.kind {
        EngineKind::Command => {
            if config.program.is_empty() {
                return Err(PipelineError::Config("command engine requires a program".to_string()));
            }
            tracing::info!(
                program = %config.program,
                model = %config.model_name,
                sample_rate = format.sample_rate,
                "Using command engine"
            );
            Ok(Arc::new(CommandEngine::new(
                config.program.clone(),
                config.args.clone(),
                config.model_name.clone(),
                format,
            )))
        }
        EngineKind::Silence => Ok(Arc::new(SilenceEngine::new(format))),
    }
}

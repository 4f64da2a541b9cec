//! Typed protocol messages
//!
//! Each message maps to one event type. Data-only messages go through
//! [`Message`]; [`AudioChunk`] also carries a binary payload and has its own
//! conversions.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use voice_tts_core::{AudioFormat, AudioFrame};

use crate::{Event, Result, TransportError};

/// A data-only message with a fixed event type
pub trait Message: Serialize + DeserializeOwned {
    const TYPE: &'static str;

    fn to_event(&self) -> Result<Event> {
        let data = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(TransportError::InvalidHeader(format!(
                    "'{}' data must be an object, got {}",
                    Self::TYPE,
                    other
                )))
            }
        };
        Ok(Event::new(Self::TYPE).with_data(data))
    }

    fn from_event(event: &Event) -> Result<Self> {
        if !event.is_type(Self::TYPE) {
            return Err(TransportError::UnexpectedType {
                expected: Self::TYPE,
                actual: event.event_type.clone(),
            });
        }
        Ok(serde_json::from_value(Value::Object(event.data.clone()))?)
    }

    fn is_type(event: &Event) -> bool {
        event.is_type(Self::TYPE)
    }
}

// ---------------------------------------------------------------------------
// Discovery

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Describe {}

impl Message for Describe {
    const TYPE: &'static str = "describe";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsVoice {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub attribution: Attribution,
    pub installed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsProgram {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub attribution: Attribution,
    pub installed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub voices: Vec<TtsVoice>,
    #[serde(default)]
    pub supports_synthesize_streaming: bool,
}

/// Reply to [`Describe`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub tts: Vec<TtsProgram>,
}

impl Message for Info {
    const TYPE: &'static str = "info";
}

// ---------------------------------------------------------------------------
// Synthesis requests

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesizeVoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

impl SynthesizeVoice {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Single-shot synthesis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Synthesize {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<SynthesizeVoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f32>,
}

impl Synthesize {
    pub fn voice_name(&self) -> Option<&str> {
        self.voice.as_ref().and_then(|v| v.name.as_deref())
    }
}

impl Message for Synthesize {
    const TYPE: &'static str = "synthesize";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesizeStart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<SynthesizeVoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f32>,
}

impl SynthesizeStart {
    pub fn voice_name(&self) -> Option<&str> {
        self.voice.as_ref().and_then(|v| v.name.as_deref())
    }
}

impl Message for SynthesizeStart {
    const TYPE: &'static str = "synthesize-start";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesizeChunk {
    pub text: String,
}

impl Message for SynthesizeChunk {
    const TYPE: &'static str = "synthesize-chunk";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesizeStop {}

impl Message for SynthesizeStop {
    const TYPE: &'static str = "synthesize-stop";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesizeStopped {}

impl Message for SynthesizeStopped {
    const TYPE: &'static str = "synthesize-stopped";
}

// ---------------------------------------------------------------------------
// Audio

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioStart {
    pub rate: u32,
    pub width: u16,
    pub channels: u16,
}

impl From<AudioFormat> for AudioStart {
    fn from(format: AudioFormat) -> Self {
        Self {
            rate: format.sample_rate,
            width: format.sample_width,
            channels: format.channels,
        }
    }
}

impl Message for AudioStart {
    const TYPE: &'static str = "audio-start";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioStop {}

impl Message for AudioStop {
    const TYPE: &'static str = "audio-stop";
}

#[derive(Debug, Serialize, Deserialize)]
struct AudioChunkData {
    rate: u32,
    width: u16,
    channels: u16,
}

/// One frame of PCM audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub format: AudioFormat,
    pub audio: Bytes,
}

impl AudioChunk {
    pub const TYPE: &'static str = "audio-chunk";

    pub fn to_event(&self) -> Result<Event> {
        let data = AudioChunkData {
            rate: self.format.sample_rate,
            width: self.format.sample_width,
            channels: self.format.channels,
        };
        let Value::Object(map) = serde_json::to_value(data)? else {
            let reason = "audio-chunk data must be an object".to_string();
            return Err(TransportError::InvalidHeader(reason));
        };
        Ok(Event::new(Self::TYPE).with_data(map).with_payload(self.audio.clone()))
    }

    pub fn from_event(event: &Event) -> Result<Self> {
        if !event.is_type(Self::TYPE) {
            return Err(TransportError::UnexpectedType {
                expected: Self::TYPE,
                actual: event.event_type.clone(),
            });
        }
        let data: AudioChunkData = serde_json::from_value(Value::Object(event.data.clone()))?;
        Ok(Self {
            format: AudioFormat::new(data.rate, data.width, data.channels),
            audio: event.payload.clone().unwrap_or_default(),
        })
    }
}

impl From<AudioFrame> for AudioChunk {
    fn from(frame: AudioFrame) -> Self {
        Self {
            format: frame.format,
            audio: Bytes::from(frame.payload),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Error {
    pub fn new(text: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: Some(code.into()),
        }
    }
}

impl Message for Error {
    const TYPE: &'static str = "error";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesize_accepts_minimal_data() {
        let mut event = Event::new("synthesize");
        event.data.insert("text".into(), Value::from("Привет"));
        let msg = Synthesize::from_event(&event).unwrap();
        assert_eq!(msg.text, "Привет");
        assert_eq!(msg.voice_name(), None);
        assert_eq!(msg.rate, None);
    }

    #[test]
    fn test_synthesize_voice_and_rate() {
        let event: Event = Synthesize {
            text: "Да".into(),
            voice: Some(SynthesizeVoice::named("vosk_male_01")),
            rate: Some(1.25),
        }
        .to_event()
        .unwrap();
        assert_eq!(event.data["voice"]["name"], "vosk_male_01");
        assert!(event.data["voice"].get("language").is_none());

        let parsed = Synthesize::from_event(&event).unwrap();
        assert_eq!(parsed.voice_name(), Some("vosk_male_01"));
        assert_eq!(parsed.rate, Some(1.25));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let event = Event::new("synthesize-stop");
        assert!(matches!(
            Synthesize::from_event(&event),
            Err(TransportError::UnexpectedType { expected: "synthesize", .. })
        ));
        assert!(SynthesizeStop::from_event(&event).is_ok());
    }

    #[test]
    fn test_empty_messages_have_empty_data() {
        let event = SynthesizeStopped {}.to_event().unwrap();
        assert_eq!(event.event_type, "synthesize-stopped");
        assert!(event.data.is_empty());
        assert!(event.payload.is_none());
    }

    #[test]
    fn test_audio_chunk_carries_payload() {
        let frame = AudioFrame::new(AudioFormat::new(22050, 2, 1), vec![1, 2, 3, 4]);
        let event = AudioChunk::from(frame).to_event().unwrap();
        assert_eq!(event.data["rate"], 22050);
        assert_eq!(event.data["width"], 2);
        assert_eq!(event.payload_len(), 4);

        let chunk = AudioChunk::from_event(&event).unwrap();
        assert_eq!(chunk.format, AudioFormat::new(22050, 2, 1));
        assert_eq!(&chunk.audio[..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_info_streaming_flag() {
        let info = Info {
            tts: vec![TtsProgram {
                name: "vosk-tts-wyoming".into(),
                description: None,
                attribution: Attribution {
                    name: "alphacep".into(),
                    url: "https://github.com/alphacep/vosk-tts".into(),
                },
                installed: true,
                version: None,
                voices: vec![],
                supports_synthesize_streaming: true,
            }],
        };
        let event = info.to_event().unwrap();
        assert_eq!(event.data["tts"][0]["supports_synthesize_streaming"], true);
    }

    #[test]
    fn test_error_code() {
        let event = Error::new("boom", "synthesis-failed").to_event().unwrap();
        assert_eq!(event.data["code"], "synthesis-failed");
        assert_eq!(Error::from_event(&event).unwrap().text, "boom");
    }
}

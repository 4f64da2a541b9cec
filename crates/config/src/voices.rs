//! Voice catalogue
//!
//! Maps configured speaker indices to the voice names advertised over the
//! streaming protocol (`vosk_male_01`, ...).

use serde::{Deserialize, Serialize};

use voice_tts_core::SpeakerId;

use crate::constants::model::{LANGUAGE, VOICE_MAP, VOICE_NAME_PREFIX};

/// One advertised voice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    pub description: String,
    pub speaker: SpeakerId,
    pub language: String,
}

/// Voices available in this deployment, in configured order
#[derive(Debug, Clone, Default)]
pub struct VoiceCatalogue {
    voices: Vec<Voice>,
}

impl VoiceCatalogue {
    /// Build the catalogue from configured speaker ids.
    ///
    /// Ids with no known voice are skipped with a warning; duplicates are kept once.
    pub fn from_speaker_ids(ids: &[SpeakerId]) -> Self {
        let mut voices: Vec<Voice> = Vec::with_capacity(ids.len());

        for &id in ids {
            if voices.iter().any(|v| v.speaker == id) {
                continue;
            }
            match VOICE_MAP.iter().find(|(speaker, _, _)| *speaker == id) {
                Some((speaker, description, suffix)) => voices.push(Voice {
                    name: format!("{}{}", VOICE_NAME_PREFIX, suffix),
                    description: description.to_string(),
                    speaker: *speaker,
                    language: LANGUAGE.to_string(),
                }),
                None => tracing::warn!(speaker = id, "No voice known for speaker id, skipping"),
            }
        }

        Self { voices }
    }

    pub fn by_name(&self, name: &str) -> Option<&Voice> {
        self.voices.iter().find(|v| v.name == name)
    }

    pub fn by_speaker(&self, speaker: SpeakerId) -> Option<&Voice> {
        self.voices.iter().find(|v| v.speaker == speaker)
    }

    /// Speaker for a requested voice name, if that voice is served here
    pub fn speaker_for(&self, name: &str) -> Option<SpeakerId> {
        self.by_name(name).map(|v| v.speaker)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

//! Synthesis requests and the speaker/rate policy
//!
//! Out-of-range speakers and rates are rejected, never clamped. The same
//! check is applied by the HTTP surface and by the streaming protocol.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Speaker index understood by the engine
pub type SpeakerId = u32;

/// Accepted speech rate range (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateRange {
    pub min: f32,
    pub max: f32,
}

impl RateRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, rate: f32) -> bool {
        rate.is_finite() && rate >= self.min && rate <= self.max
    }

    /// Reject `rate` if it falls outside the range
    pub fn check(&self, rate: f32) -> Result<f32> {
        if self.contains(rate) {
            Ok(rate)
        } else {
            Err(Error::InvalidRate {
                rate,
                min: self.min,
                max: self.max,
            })
        }
    }
}

impl Default for RateRange {
    fn default() -> Self {
        Self::new(0.2, 2.0)
    }
}

/// A validated request for one synthesis call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub speaker: SpeakerId,
    pub rate: f32,
}

impl SynthesisRequest {
    /// Validate and build a request.
    ///
    /// `available` is the configured speaker set.
    pub fn new(
        text: impl Into<String>,
        speaker: SpeakerId,
        rate: f32,
        available: &[SpeakerId],
        rates: RateRange,
    ) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::EmptyText);
        }
        if !available.contains(&speaker) {
            return Err(Error::InvalidSpeaker {
                speaker,
                available: available.to_vec(),
            });
        }
        let rate = rates.check(rate)?;

        Ok(Self {
            text,
            speaker,
            rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEAKERS: &[SpeakerId] = &[0, 1, 2, 3, 4];

    #[test]
    fn test_valid_request() {
        let req = SynthesisRequest::new("привет", 3, 1.0, SPEAKERS, RateRange::default()).unwrap();
        assert_eq!(req.speaker, 3);
        assert_eq!(req.rate, 1.0);
    }

    #[test]
    fn test_rejects_empty_text() {
        let err = SynthesisRequest::new("   ", 3, 1.0, SPEAKERS, RateRange::default()).unwrap_err();
        assert_eq!(err, Error::EmptyText);
    }

    #[test]
    fn test_rejects_unknown_speaker() {
        let err =
            SynthesisRequest::new("текст", 7, 1.0, SPEAKERS, RateRange::default()).unwrap_err();
        assert_eq!(err.code(), "invalid-speaker");
    }

    #[test]
    fn test_rejects_out_of_range_rate() {
        let rates = RateRange::default();
        assert!(SynthesisRequest::new("текст", 0, 0.1, SPEAKERS, rates).is_err());
        assert!(SynthesisRequest::new("текст", 0, 2.5, SPEAKERS, rates).is_err());
        assert!(SynthesisRequest::new("текст", 0, f32::NAN, SPEAKERS, rates).is_err());
        assert!(SynthesisRequest::new("текст", 0, 2.0, SPEAKERS, rates).is_ok());
        assert!(SynthesisRequest::new("текст", 0, 0.2, SPEAKERS, rates).is_ok());
    }
}

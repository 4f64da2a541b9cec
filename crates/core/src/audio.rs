//! PCM audio description

use serde::{Deserialize, Serialize};

/// Raw PCM format produced by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Bytes per sample (2 = 16-bit)
    pub sample_width: u16,
    /// Number of channels (1 = mono)
    pub channels: u16,
}

impl AudioFormat {
    pub const fn new(sample_rate: u32, sample_width: u16, channels: u16) -> Self {
        Self {
            sample_rate,
            sample_width,
            channels,
        }
    }

    /// Size of one interleaved sample frame in bytes
    pub fn bytes_per_sample(&self) -> usize {
        self.sample_width as usize * self.channels as usize
    }

    /// Duration of `len` payload bytes in milliseconds
    pub fn duration_ms(&self, len: usize) -> u64 {
        let per_second = self.bytes_per_sample() as u64 * self.sample_rate as u64;
        if per_second == 0 {
            return 0;
        }
        len as u64 * 1000 / per_second
    }
}

impl Default for AudioFormat {
    /// 22.05 kHz, 16-bit little-endian, mono
    fn default() -> Self {
        Self::new(22050, 2, 1)
    }
}

/// One chunk of synthesized audio sent to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    pub format: AudioFormat,
    pub payload: Vec<u8>,
}

impl AudioFrame {
    pub fn new(format: AudioFormat, payload: Vec<u8>) -> Self {
        Self { format, payload }
    }

    /// Whether the payload holds a whole number of sample frames.
    ///
    /// Only the last frame of a stream may fail this.
    pub fn is_aligned(&self) -> bool {
        let unit = self.format.bytes_per_sample();
        unit == 0 || self.payload.len() % unit == 0
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

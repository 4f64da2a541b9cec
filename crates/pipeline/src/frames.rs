//! Splitting PCM payloads into protocol frames

use voice_tts_core::{AudioFormat, AudioFrame};

/// Frame size in bytes for `samples_per_chunk` samples of `format`
pub fn frame_size(format: &AudioFormat, samples_per_chunk: usize) -> usize {
    format.bytes_per_sample() * samples_per_chunk
}

/// Split `payload` into consecutive frames of `frame_size` bytes.
///
/// Only the last frame may be shorter. A zero frame size sends the whole
/// payload as one frame; an empty payload yields no frames.
pub fn split_frames(
    format: AudioFormat,
    payload: &[u8],
    samples_per_chunk: usize,
) -> Vec<AudioFrame> {
    if payload.is_empty() {
        return Vec::new();
    }

    let size = frame_size(&format, samples_per_chunk);
    if size == 0 {
        return vec![AudioFrame::new(format, payload.to_vec())];
    }

    payload
        .chunks(size)
        .map(|chunk| AudioFrame::new(format, chunk.to_vec()))
        .collect()
}

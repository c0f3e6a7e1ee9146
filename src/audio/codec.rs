//! Conversion between f32 device samples and 16-bit little-endian PCM.
//!
//! Pure functions with no session state, so the bit-exact conversion can be
//! tested on its own.

use anyhow::{bail, Result};
use base64::Engine;

/// Scale between normalized float samples and signed 16-bit integers.
pub const PCM_SCALE: f32 = 32768.0;

/// Decoded audio, one sample vector per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Per-channel samples in [-1.0, 1.0)
    pub channels: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Number of sample frames (samples per channel)
    pub fn frame_count(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// Playback duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

/// Encode float samples as 16-bit little-endian PCM bytes.
///
/// Each sample maps to `round(s * 32768)`. The integer cast saturates, so a
/// full-scale `1.0` lands on `i16::MAX`.
pub fn encode(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .map(|&s| (s * PCM_SCALE).round() as i16)
        .flat_map(|v| v.to_le_bytes())
        .collect()
}

/// Decode 16-bit little-endian PCM into per-channel float samples.
///
/// Interleaved samples are assigned to channels round-robin. A trailing
/// partial frame (fewer samples than channels) is discarded.
pub fn decode(pcm: &[u8], channels: u16, sample_rate: u32) -> Result<DecodedAudio> {
    if channels == 0 {
        bail!("Cannot decode PCM into zero channels");
    }
    if pcm.len() % 2 != 0 {
        bail!("PCM payload has odd length {} (expected 16-bit samples)", pcm.len());
    }

    let channel_count = channels as usize;
    let frame_count = pcm.len() / 2 / channel_count;
    let mut decoded = vec![Vec::with_capacity(frame_count); channel_count];

    for (i, bytes) in pcm.chunks_exact(2).take(frame_count * channel_count).enumerate() {
        let value = i16::from_le_bytes([bytes[0], bytes[1]]);
        decoded[i % channel_count].push(value as f32 / PCM_SCALE);
    }

    Ok(DecodedAudio {
        channels: decoded,
        sample_rate,
    })
}

/// Base64 text form of a PCM payload, as carried in JSON messages.
pub fn to_base64(pcm: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(pcm)
}

pub fn from_base64(data: &str) -> Result<Vec<u8>> {
    Ok(base64::engine::general_purpose::STANDARD.decode(data)?)
}

// PCM16 codec for the live audio wire format.
//
// The endpoint consumes and produces linear PCM: 16-bit signed little-endian
// samples wrapped in base64 for the JSON transport. Encoding clamps
// out-of-range samples to [-1.0, 1.0] before scaling; that loss is
// intentional for input outside the nominal range.

use base64::Engine;
use tracing::debug;

use crate::error::SessionError;

/// Decoded audio ready for playback scheduling.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Normalized samples in [-1.0, 1.0], interleaved if multi-channel.
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

impl AudioBuffer {
    /// Playback duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

/// Encode normalized f32 samples as base64-wrapped PCM16-LE.
pub fn encode_pcm16_base64(samples: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = (clamped * 32768.0)
            .round()
            .clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    base64::engine::general_purpose::STANDARD.encode(&bytes)
}

/// Unwrap base64 transport text back to raw PCM bytes.
///
/// Inverse of the wrapping step only; use [`decode_audio_data`] to interpret
/// the bytes as samples.
pub fn decode_base64(data: &str) -> Result<Vec<u8>, SessionError> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| SessionError::Decode(format!("invalid base64 payload: {}", e)))
}

/// Interpret raw PCM16-LE bytes as a playable buffer at the declared rate
/// and channel count.
///
/// The conversion runs off the caller's task: inbound chunks can be large
/// and the dispatch loop must stay responsive to interrupts while one is
/// being decoded.
pub async fn decode_audio_data(
    bytes: Vec<u8>,
    sample_rate: u32,
    channels: u16,
) -> Result<AudioBuffer, SessionError> {
    if bytes.len() % 2 != 0 {
        return Err(SessionError::Decode(format!(
            "PCM16 payload has odd length {}",
            bytes.len()
        )));
    }

    let buffer = tokio::task::spawn_blocking(move || {
        let samples: Vec<f32> = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect();
        AudioBuffer {
            samples,
            sample_rate,
            channels,
        }
    })
    .await
    .map_err(|e| SessionError::Decode(format!("decode task failed: {}", e)))?;

    debug!(
        "Decoded audio chunk: {} samples at {}Hz",
        buffer.samples.len(),
        buffer.sample_rate
    );

    Ok(buffer)
}

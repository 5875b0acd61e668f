// Take loader - Decodes a recorded payload into an AudioBuffer
//
// Decoding runs on a blocking task; its completion is delivered through a
// oneshot channel and raced against a timeout.

use crate::audio::buffer::AudioBuffer;
use hound::{SampleFormat, WavReader};
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors while loading a recorded take
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Recording produced an empty payload")]
    EmptyPayload,

    #[error("Failed to decode recorded audio: {0}")]
    Decode(#[from] hound::Error),

    #[error("Unsupported channel count: {0}")]
    UnsupportedChannels(u16),

    #[error("Unsupported bit depth: {0}")]
    UnsupportedBitDepth(u16),

    #[error("Sample rate mismatch: expected {expected} Hz, found {found} Hz")]
    SampleRateMismatch { expected: u32, found: u32 },

    #[error("Timed out loading audio after {0:?}")]
    Timeout(Duration),

    #[error("Loader task ended without a result")]
    Cancelled,
}

/// Decode an in-memory WAV payload into a mono buffer.
/// Multi-channel payloads are folded down by averaging.
pub fn decode_wav(payload: &[u8]) -> Result<AudioBuffer, LoadError> {
    if payload.is_empty() {
        return Err(LoadError::EmptyPayload);
    }

    let reader = WavReader::new(Cursor::new(payload))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(LoadError::UnsupportedChannels(spec.channels));
    }
    if !(1..=32).contains(&spec.bits_per_sample) {
        return Err(LoadError::UnsupportedBitDepth(spec.bits_per_sample));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let channels = spec.channels as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok(AudioBuffer::new(samples, spec.sample_rate))
}

/// Run `decode` on a blocking task and wait at most `timeout` for it
pub async fn load_with<F>(decode: F, timeout: Duration) -> Result<AudioBuffer, LoadError>
where
    F: FnOnce() -> Result<AudioBuffer, LoadError> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    tokio::task::spawn_blocking(move || {
        // The receiver is gone if the wait already timed out
        let _ = tx.send(decode());
    });

    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(LoadError::Cancelled),
        Err(_) => Err(LoadError::Timeout(timeout)),
    }
}

/// Decode a WAV payload for a bus running at `expected_rate`
pub async fn load_payload(
    payload: Vec<u8>,
    expected_rate: u32,
    timeout: Duration,
) -> Result<AudioBuffer, LoadError> {
    let buffer = load_with(move || decode_wav(&payload), timeout).await?;
    if buffer.sample_rate() != expected_rate {
        return Err(LoadError::SampleRateMismatch {
            expected: expected_rate,
            found: buffer.sample_rate(),
        });
    }
    Ok(buffer)
}

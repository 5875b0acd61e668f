// Audio capture - Records the shared bus into a take
//
// The audio thread appends bus samples while armed; stopping hands the raw
// samples back so the (slow) WAV encoding can happen off the audio path.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use thiserror::Error;

/// Errors while turning a capture into a playable payload
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("WAV encoding failed: {0}")]
    Encode(#[from] hound::Error),
}

/// Raw samples of a finished capture
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl CapturedAudio {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Encode as an in-memory mono 32-bit float WAV file.
    /// An empty capture gives an empty payload (no header).
    pub fn encode_wav(&self) -> Result<Vec<u8>, CaptureError> {
        if self.samples.is_empty() {
            return Ok(Vec::new());
        }

        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(self.samples.len() * 4 + 64));
        {
            let mut writer = WavWriter::new(&mut cursor, spec)?;
            for &sample in &self.samples {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }
}

/// Bus recorder
#[derive(Debug)]
pub struct Recorder {
    sample_rate: u32,
    samples: Vec<f32>,
    max_frames: usize,
    armed: bool,
}

impl Recorder {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            samples: Vec::new(),
            max_frames: 0,
            armed: false,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Frames captured so far
    pub fn captured_frames(&self) -> usize {
        self.samples.len()
    }

    /// Start a fresh capture bounded to `max_frames` (one loop).
    /// The buffer is pre-sized so the audio thread never reallocates.
    pub fn start(&mut self, max_frames: usize) {
        self.samples = Vec::with_capacity(max_frames);
        self.max_frames = max_frames;
        self.armed = true;
    }

    /// Append bus samples; anything past the loop length is dropped
    pub fn capture(&mut self, input: &[f32]) {
        if !self.armed {
            return;
        }
        let room = self.max_frames.saturating_sub(self.samples.len());
        let take = room.min(input.len());
        self.samples.extend_from_slice(&input[..take]);
    }

    /// Stop and hand back what was captured
    pub fn stop(&mut self) -> CapturedAudio {
        self.armed = false;
        self.max_frames = 0;
        CapturedAudio {
            samples: std::mem::take(&mut self.samples),
            sample_rate: self.sample_rate,
        }
    }

    /// Stop and throw away the capture
    pub fn discard(&mut self) {
        self.armed = false;
        self.max_frames = 0;
        self.samples = Vec::new();
    }
}

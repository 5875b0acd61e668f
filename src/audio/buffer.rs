// Audio buffers - Decoded mono sample data owned by a track take

use std::sync::Arc;

/// Decoded, immutable mono audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in frames
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Sample at `frame`, silence past the end
    #[inline]
    pub fn sample(&self, frame: usize) -> f32 {
        self.samples.get(frame).copied().unwrap_or(0.0)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

// Shared audio bus contract with the tone source
//
// The tone source renders into a mono bus block; the looper taps that block
// for recording, then adds track playback and metronome clicks into it.

use thiserror::Error;

/// Errors raised by a tone source while handing out its bus
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(String),

    #[error("Audio context not started")]
    NotStarted,
}

/// Description of the tone source's output node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioBus {
    /// Bus sample rate in Hz
    pub sample_rate: u32,
    /// Typical block size the host will call the processor with
    pub block_size: usize,
}

impl AudioBus {
    pub fn new(sample_rate: u32, block_size: usize) -> Self {
        Self {
            sample_rate,
            block_size,
        }
    }
}

/// The synthesis engine, seen from the looper
///
/// Only `output_bus` is required by the looper itself; note playback is how
/// hosts drive the same engine that feeds the bus.
pub trait ToneSource: Send {
    /// Hand out the output node the looper records from and plays into
    fn output_bus(&self) -> Result<AudioBus, EngineError>;

    /// Start a note (e.g. "C4") at velocity in [0, 1]
    fn play_note(&mut self, note: &str, velocity: f32);

    /// Release a note
    fn stop_note(&mut self, note: &str);

    /// Render the next block of the engine's output into `out`
    fn render(&mut self, out: &mut [f32]);
}

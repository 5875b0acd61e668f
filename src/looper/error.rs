// Looper errors
//
// Only initialisation can fail towards the caller; every later failure is
// logged where it happens and the looper keeps running.

use crate::audio::bus::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LooperError {
    #[error("Could not acquire the audio bus: {0}")]
    Engine(#[from] EngineError),

    #[error("Invalid audio bus sample rate: {sample_rate}")]
    InvalidBus { sample_rate: u32 },

    #[error("No async runtime available for finalizing recordings")]
    NoRuntime,
}

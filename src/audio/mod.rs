// Module audio - Bus contract, capture, take loading and loop playback

pub mod buffer;
pub mod bus;
pub mod capture;
pub mod dsp_utils;
pub mod loader;
pub mod player;

pub use buffer::AudioBuffer;
pub use bus::{AudioBus, EngineError, ToneSource};
pub use capture::{CaptureError, CapturedAudio, Recorder};
pub use loader::LoadError;
pub use player::{LoopPlayer, PlayerState};

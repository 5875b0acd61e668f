// Loop Station - Library exports for the demo, tests and benchmarks

pub mod audio;
pub mod config;
pub mod looper;
pub mod messaging;
pub mod sequencer;
pub mod track;

// Re-export commonly used types for convenience
pub use audio::{AudioBuffer, AudioBus, EngineError, LoopPlayer, ToneSource};
pub use config::LooperConfig;
pub use looper::{AudioProcessor, Looper, LooperError, LooperState};
pub use messaging::BeatEvent;
pub use sequencer::{NoteEvent, Subdivision, Tempo, TransportClock, TransportState};
pub use track::{ContentKind, TrackId, TrackSnapshot};

// Sequencer module
// Musical time, the loop transport, metronome and note capture

pub mod metronome;
pub mod note;
pub mod note_recorder;
pub mod timeline;
pub mod transport;

pub use metronome::{ClickType, Metronome};
pub use note::NoteEvent;
pub use note_recorder::NoteRecorder;
pub use timeline::{BarCount, LoopLength, Subdivision, Tempo};
pub use transport::{CycleBoundary, ScheduleHandle, Tick, TransportClock, TransportState};

// Messaging between the audio callback and the UI thread

pub mod channels;
pub mod event;

pub use channels::{EventConsumer, EventProducer, create_event_channel};
pub use event::{BeatEvent, LooperEvent};

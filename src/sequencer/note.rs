// Note events captured against the loop cycle
// Start and duration are fractions of one loop pass, so they survive tempo changes

use serde::{Deserialize, Serialize};

/// Shortest duration kept for a captured note (fraction of the loop)
pub const MIN_NOTE_DURATION: f64 = 0.01;

/// Velocity given to notes captured from on/off gestures
pub const DEFAULT_NOTE_VELOCITY: f32 = 0.8;

/// A note played while a track was recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    /// Note name as given by the tone source (e.g. "C4")
    pub note: String,
    /// Loop fraction where the note started, in [0, 1)
    pub start_time: f64,
    /// Length as a fraction of the loop
    pub duration: f64,
    /// Velocity in [0, 1]
    pub velocity: f32,
}

impl NoteEvent {
    pub fn new(note: impl Into<String>, start_time: f64, duration: f64, velocity: f32) -> Self {
        Self {
            note: note.into(),
            start_time,
            duration,
            velocity: velocity.clamp(0.0, 1.0),
        }
    }

    /// Loop fraction where the note ends, wrapped into [0, 1)
    pub fn end_time(&self) -> f64 {
        (self.start_time + self.duration).fract()
    }

    /// Check if the note covers a loop fraction, including notes that wrap the boundary
    pub fn contains(&self, position: f64) -> bool {
        let offset = position - self.start_time;
        let offset = if offset < 0.0 { offset + 1.0 } else { offset };
        offset < self.duration
    }
}

/// Duration between two loop fractions.
/// A negative span means the note crossed the loop boundary.
pub fn wrapped_duration(start: f64, end: f64) -> f64 {
    let duration = end - start;
    let duration = if duration < 0.0 {
        (1.0 - start) + end
    } else {
        duration
    };
    duration.max(MIN_NOTE_DURATION)
}

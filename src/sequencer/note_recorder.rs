// Note recorder - Captures note on/off gestures as loop-relative note events
// One pending note at a time, matching a single held key

use crate::sequencer::note::{DEFAULT_NOTE_VELOCITY, NoteEvent, wrapped_duration};

/// The note currently held down
#[derive(Debug, Clone, PartialEq)]
struct PendingNote {
    note: String,
    start: f64,
}

/// Note recorder for the active recording session
#[derive(Debug, Default)]
pub struct NoteRecorder {
    pending: Option<PendingNote>,
}

impl NoteRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a note starting at `position` (loop fraction).
    /// A second note-on replaces the pending one.
    pub fn note_on(&mut self, note: &str, position: f64) {
        self.pending = Some(PendingNote {
            note: note.to_string(),
            start: position,
        });
    }

    /// Close the pending note at `position`, handling loop wraparound.
    /// Returns `None` when no note is held.
    pub fn note_off(&mut self, position: f64) -> Option<NoteEvent> {
        let pending = self.pending.take()?;
        let duration = wrapped_duration(pending.start, position);
        Some(NoteEvent::new(
            pending.note,
            pending.start,
            duration,
            DEFAULT_NOTE_VELOCITY,
        ))
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Name of the held note, if any
    pub fn pending_note(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.note.as_str())
    }

    /// Forget the held note without producing an event
    pub fn clear(&mut self) {
        self.pending = None;
    }
}

// Recording session - Which track is being recorded and where it stands
//
// Idle -> Recording -> Finalizing -> Idle. At most one session exists.

use crate::audio::capture::CapturedAudio;
use crate::sequencer::note::NoteEvent;
use crate::sequencer::note_recorder::NoteRecorder;
use crate::track::TrackId;

/// Identifies one recording from start to finalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TakeId(u64);

/// Session phase
#[derive(Debug, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Recording {
        track_id: TrackId,
        take: TakeId,
        /// Loop fraction where capture began
        start_position: f64,
        notes: NoteRecorder,
    },
    /// Capture ended; the take is being encoded and loaded
    Finalizing { track_id: TrackId, take: TakeId },
}

/// Raw capture handed from the audio side to finalization
#[derive(Debug)]
pub struct PendingTake {
    pub take: TakeId,
    pub track_id: TrackId,
    pub capture: CapturedAudio,
    /// Loop length (seconds) the new player loops over
    pub loop_duration: f64,
}

#[derive(Debug, Default)]
pub struct RecordingSession {
    phase: SessionPhase,
    next_take: u64,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, SessionPhase::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.phase, SessionPhase::Recording { .. })
    }

    /// Track being recorded or finalized
    pub fn track_id(&self) -> Option<TrackId> {
        match &self.phase {
            SessionPhase::Idle => None,
            SessionPhase::Recording { track_id, .. }
            | SessionPhase::Finalizing { track_id, .. } => Some(*track_id),
        }
    }

    pub fn start_position(&self) -> Option<f64> {
        match &self.phase {
            SessionPhase::Recording { start_position, .. } => Some(*start_position),
            _ => None,
        }
    }

    /// Take currently recording or finalizing
    pub fn take(&self) -> Option<TakeId> {
        match &self.phase {
            SessionPhase::Idle => None,
            SessionPhase::Recording { take, .. } | SessionPhase::Finalizing { take, .. } => {
                Some(*take)
            }
        }
    }

    /// Idle -> Recording. Returns the new take, or `None` (changing nothing) unless idle.
    pub fn begin(&mut self, track_id: TrackId, start_position: f64) -> Option<TakeId> {
        if !self.is_idle() {
            return None;
        }
        let take = TakeId(self.next_take);
        self.next_take += 1;
        self.phase = SessionPhase::Recording {
            track_id,
            take,
            start_position,
            notes: NoteRecorder::new(),
        };
        Some(take)
    }

    /// Recording -> Finalizing. A held note is dropped.
    pub fn end(&mut self) -> Option<(TrackId, TakeId)> {
        match std::mem::take(&mut self.phase) {
            SessionPhase::Recording {
                track_id,
                take,
                notes,
                ..
            } => {
                if let Some(note) = notes.pending_note() {
                    log::debug!("Dropping held note {} at end of recording", note);
                }
                self.phase = SessionPhase::Finalizing { track_id, take };
                Some((track_id, take))
            }
            other => {
                self.phase = other;
                None
            }
        }
    }

    /// Back to Idle from any phase
    pub fn finish(&mut self) {
        self.phase = SessionPhase::Idle;
    }

    /// Finalizing -> Idle, only if `take` is the one being finalized.
    /// Returns false for a take the session no longer tracks.
    pub fn finish_take(&mut self, take: TakeId) -> bool {
        match self.phase {
            SessionPhase::Finalizing { take: current, .. } if current == take => {
                self.phase = SessionPhase::Idle;
                true
            }
            _ => false,
        }
    }

    /// Remember a note press at `position` while recording
    pub fn note_on(&mut self, note: &str, position: f64) -> bool {
        match &mut self.phase {
            SessionPhase::Recording { notes, .. } => {
                notes.note_on(note, position);
                true
            }
            _ => false,
        }
    }

    /// Close the held note at `position`; returns the target track and the event
    pub fn note_off(&mut self, position: f64) -> Option<(TrackId, NoteEvent)> {
        match &mut self.phase {
            SessionPhase::Recording {
                track_id, notes, ..
            } => notes.note_off(position).map(|event| (*track_id, event)),
            _ => None,
        }
    }
}

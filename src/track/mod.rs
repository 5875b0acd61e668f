// Track - One lane of the looper: an audio take, a note sequence, or nothing
//
// Content is a tagged union so playback code matches on what a track holds
// instead of probing optional fields.

pub mod manager;

use crate::audio::buffer::AudioBuffer;
use crate::audio::dsp_utils::clamp_track_db;
use crate::audio::player::LoopPlayer;
use crate::sequencer::note::NoteEvent;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub use manager::TrackManager;

/// Unique track identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(Uuid);

impl TrackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track-{}", self.0)
    }
}

/// What a track currently holds
#[derive(Debug, Clone, Default)]
pub enum TrackContent {
    #[default]
    Empty,
    /// Notes captured without (yet) an audio take
    NoteSequence(Vec<NoteEvent>),
    /// A recorded take; notes played during recording ride along as annotations
    Audio {
        player: LoopPlayer,
        annotations: Vec<NoteEvent>,
    },
}

/// Content kind reported in snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentKind {
    Empty,
    NoteSequence,
    Audio,
}

impl TrackContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            TrackContent::Empty => ContentKind::Empty,
            TrackContent::NoteSequence(_) => ContentKind::NoteSequence,
            TrackContent::Audio { .. } => ContentKind::Audio,
        }
    }

    pub fn note_events(&self) -> &[NoteEvent] {
        match self {
            TrackContent::Empty => &[],
            TrackContent::NoteSequence(notes) => notes,
            TrackContent::Audio { annotations, .. } => annotations,
        }
    }

    /// Append a captured note, promoting `Empty` to `NoteSequence`
    pub fn annotate(&mut self, event: NoteEvent) {
        match self {
            TrackContent::Empty => *self = TrackContent::NoteSequence(vec![event]),
            TrackContent::NoteSequence(notes) => notes.push(event),
            TrackContent::Audio { annotations, .. } => annotations.push(event),
        }
    }

    /// Swap in a new take, keeping captured notes. Returns the replaced player.
    pub fn install(&mut self, player: LoopPlayer) -> Option<LoopPlayer> {
        match std::mem::take(self) {
            TrackContent::Empty => {
                *self = TrackContent::Audio {
                    player,
                    annotations: Vec::new(),
                };
                None
            }
            TrackContent::NoteSequence(notes) => {
                *self = TrackContent::Audio {
                    player,
                    annotations: notes,
                };
                None
            }
            TrackContent::Audio {
                player: old,
                annotations,
            } => {
                *self = TrackContent::Audio {
                    player,
                    annotations,
                };
                Some(old)
            }
        }
    }
}

/// A looper track
#[derive(Debug, Clone)]
pub struct Track {
    id: TrackId,
    name: String,
    color: String,
    content: TrackContent,
    is_recording: bool,
    is_muted: bool,
    is_solo: bool,
    volume_db: f32,
}

impl Track {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: TrackId::new(),
            name: name.into(),
            color: color.into(),
            content: TrackContent::Empty,
            is_recording: false,
            is_muted: false,
            is_solo: false,
            volume_db: 0.0,
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn content(&self) -> &TrackContent {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut TrackContent {
        &mut self.content
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub fn set_recording(&mut self, recording: bool) {
        self.is_recording = recording;
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    pub(crate) fn set_muted_flag(&mut self, muted: bool) {
        self.is_muted = muted;
    }

    pub fn is_solo(&self) -> bool {
        self.is_solo
    }

    pub(crate) fn set_solo_flag(&mut self, solo: bool) {
        self.is_solo = solo;
    }

    pub fn volume_db(&self) -> f32 {
        self.volume_db
    }

    /// Set volume (dB, clamped) and apply it to the live player
    pub fn set_volume_db(&mut self, db: f32) {
        let db = clamp_track_db(db);
        self.volume_db = db;
        if let Some(player) = self.player_mut() {
            player.set_volume_db(db);
        }
    }

    pub fn has_buffer(&self) -> bool {
        matches!(self.content, TrackContent::Audio { .. })
    }

    pub fn buffer(&self) -> Option<&AudioBuffer> {
        self.player().map(LoopPlayer::buffer)
    }

    pub fn player(&self) -> Option<&LoopPlayer> {
        match &self.content {
            TrackContent::Audio { player, .. } => Some(player),
            _ => None,
        }
    }

    pub fn player_mut(&mut self) -> Option<&mut LoopPlayer> {
        match &mut self.content {
            TrackContent::Audio { player, .. } => Some(player),
            _ => None,
        }
    }

    pub fn note_events(&self) -> &[NoteEvent] {
        self.content.note_events()
    }

    /// Release the take and notes; identity, mix settings and name stay
    pub fn clear(&mut self) {
        if let Some(player) = self.player_mut() {
            player.unsync();
        }
        self.content = TrackContent::Empty;
    }

    pub fn snapshot(&self) -> TrackSnapshot {
        TrackSnapshot {
            id: self.id,
            name: self.name.clone(),
            color: self.color.clone(),
            content: self.content.kind(),
            has_buffer: self.has_buffer(),
            buffer_duration: self.buffer().map(AudioBuffer::duration_seconds),
            is_recording: self.is_recording,
            is_muted: self.is_muted,
            is_solo: self.is_solo,
            volume: self.volume_db,
            note_events: self.note_events().to_vec(),
        }
    }
}

/// Immutable view of a track handed to listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSnapshot {
    pub id: TrackId,
    pub name: String,
    pub color: String,
    pub content: ContentKind,
    pub has_buffer: bool,
    /// Take length in seconds, when a buffer is present
    pub buffer_duration: Option<f64>,
    pub is_recording: bool,
    pub is_muted: bool,
    pub is_solo: bool,
    /// Gain in dB
    pub volume: f32,
    pub note_events: Vec<NoteEvent>,
}

// LooperState - Immutable snapshot broadcast to state listeners

use crate::track::TrackSnapshot;
use serde::{Deserialize, Serialize};

/// Full looper state after a mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LooperState {
    pub is_playing: bool,
    pub is_recording: bool,
    pub bpm: u32,
    pub bars: u32,
    pub beats_per_bar: u32,
    pub current_beat: u32,
    pub loop_enabled: bool,
    pub metronome_enabled: bool,
    pub tracks: Vec<TrackSnapshot>,
}

impl LooperState {
    pub fn track(&self, id: crate::track::TrackId) -> Option<&TrackSnapshot> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn total_beats(&self) -> u32 {
        self.bars * self.beats_per_bar
    }
}

// Looper configuration - initial transport values and runtime limits

use crate::track::manager::DEFAULT_PALETTE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Looper settings, loadable from JSON. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LooperConfig {
    /// Initial tempo (clamped to [40, 240])
    pub bpm: i64,
    /// Initial bars per loop (clamped to [1, 16])
    pub bars: i64,
    /// Initial tick subdivision (4, 8, 12 or 16; anything else falls back to 4)
    pub beats_per_bar: i64,
    pub loop_enabled: bool,
    pub metronome_enabled: bool,
    /// Click level (0.0 to 1.0)
    pub metronome_volume: f32,
    /// How long a recorded take may take to decode before it is given up
    pub load_timeout_ms: u64,
    /// Capacity of the audio -> UI event queue
    pub event_queue_capacity: usize,
    /// Track colours, cycled by creation index
    pub track_palette: Vec<String>,
}

impl Default for LooperConfig {
    fn default() -> Self {
        Self {
            bpm: 120,
            bars: 4,
            beats_per_bar: 4,
            loop_enabled: true,
            metronome_enabled: true,
            metronome_volume: 0.5,
            load_timeout_ms: 5000,
            event_queue_capacity: 1024,
            track_palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl LooperConfig {
    /// Parse a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}

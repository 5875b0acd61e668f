// Event types - Communication audio -> UI

/// A transport tick, stamped with the audio-clock frame it fired at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeatEvent {
    /// Beat counter within the loop cycle
    pub beat: u32,
    pub beat_in_bar: u32,
    pub frame_time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LooperEvent {
    Beat(BeatEvent),
    /// Looping is disabled and the playhead reached the loop end
    LoopEnded,
}

// Transport - Loop clock, playhead and beat scheduling
// Owns the musical time context and decides when subdivision ticks fire

use super::timeline::{BarCount, LoopLength, Subdivision, Tempo};

/// Transport state (play/pause/stop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl TransportState {
    /// Check if transport is running
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }
}

/// Identifies one registration of the repeating tick callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleHandle(u64);

/// The repeating subdivision callback registration
#[derive(Debug, Clone)]
struct BeatSchedule {
    handle: ScheduleHandle,
    subdivision: Subdivision,
    /// Index (within the cycle) of the next tick to fire
    next_tick: u32,
}

/// A subdivision tick that fired at the current playhead
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Tick counter within the loop cycle
    pub beat: u32,
    /// `beat % beats_per_bar`; zero is the downbeat
    pub beat_in_bar: u32,
    /// Bar index within the loop cycle
    pub bar: u32,
    /// Audio-clock frame at which the tick fired
    pub frame_time: u64,
}

impl Tick {
    pub fn is_downbeat(&self) -> bool {
        self.beat_in_bar == 0
    }
}

/// What happened when the playhead reached the end of the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleBoundary {
    /// Loop enabled: playhead is back at the origin and still running
    Wrapped,
    /// Loop disabled: transport stopped at the origin
    Ended,
}

/// Transport clock
/// Frame-counted playhead inside one loop cycle plus the tick schedule
#[derive(Debug, Clone)]
pub struct TransportClock {
    sample_rate: f64,
    tempo: Tempo,
    bars: BarCount,
    subdivision: Subdivision,
    loop_enabled: bool,
    state: TransportState,

    /// Frames into the current cycle, always `< cycle_frames()`
    position: u64,
    /// Last tick observed, reset on stop
    current_beat: u32,
    schedule: Option<BeatSchedule>,
    next_handle: u64,
    /// Frames rendered since the clock was created (audio clock)
    elapsed_frames: u64,
}

impl TransportClock {
    /// Create new transport clock at the given sample rate
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            tempo: Tempo::default(),
            bars: BarCount::default(),
            subdivision: Subdivision::default(),
            loop_enabled: true,
            state: TransportState::Stopped,
            position: 0,
            current_beat: 0,
            schedule: None,
            next_handle: 0,
            elapsed_frames: 0,
        }
    }

    /// Get current state
    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Called when the bus sample rate becomes known; keeps the loop fraction
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        let fraction = self.current_position();
        self.sample_rate = sample_rate;
        self.place_at_fraction(fraction);
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn bars(&self) -> u32 {
        self.bars.get()
    }

    pub fn subdivision(&self) -> Subdivision {
        self.subdivision
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.subdivision.beats_per_bar()
    }

    pub fn loop_length(&self) -> LoopLength {
        LoopLength::new(self.tempo, self.bars, self.subdivision)
    }

    /// Loop duration in seconds
    pub fn loop_duration(&self) -> f64 {
        self.loop_length().duration_seconds()
    }

    pub fn total_beats(&self) -> u32 {
        self.loop_length().total_beats()
    }

    /// Loop duration in frames
    pub fn cycle_frames(&self) -> u64 {
        self.loop_length().frames(self.sample_rate)
    }

    pub fn current_beat(&self) -> u32 {
        self.current_beat
    }

    pub fn is_loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
    }

    /// Frames into the current cycle
    pub fn position_frames(&self) -> u64 {
        self.position
    }

    /// Audio-clock frames rendered so far
    pub fn elapsed_frames(&self) -> u64 {
        self.elapsed_frames
    }

    /// Loop fraction in [0, 1). Kept while paused or stopped.
    pub fn current_position(&self) -> f64 {
        self.position as f64 / self.cycle_frames() as f64
    }

    /// Current playhead in seconds from the loop origin
    pub fn position_seconds(&self) -> f64 {
        self.position as f64 / self.sample_rate
    }

    /// Handle of the active tick schedule, if any
    pub fn schedule_handle(&self) -> Option<ScheduleHandle> {
        self.schedule.as_ref().map(|s| s.handle)
    }

    /// Set tempo (clamped). Affects future ticks only; the loop fraction is kept.
    ///
    /// Rounding into the new cycle can land on a tick that already fired, so
    /// the pending tick never moves backwards.
    pub fn set_bpm(&mut self, bpm: i64) {
        let fraction = self.current_position();
        let pending_tick = self.schedule.as_ref().map(|s| s.next_tick);
        self.tempo = Tempo::new(bpm);
        self.place_at_fraction(fraction);
        if let (Some(pending), Some(schedule)) = (pending_tick, self.schedule.as_mut()) {
            schedule.next_tick = schedule.next_tick.max(pending);
        }
    }

    /// Set bar count (clamped). The playhead keeps its musical position,
    /// wrapped into the new cycle.
    pub fn set_bars(&mut self, bars: i64) {
        self.bars = BarCount::new(bars);
        let cycle = self.cycle_frames();
        self.position %= cycle;
        self.resync_beat();
    }

    /// Set tick subdivision. Invalid values are ignored and `false` is returned.
    /// A valid change clears and re-registers the tick schedule.
    pub fn set_beats_per_bar(&mut self, beats: i64) -> bool {
        let Some(subdivision) = Subdivision::from_beats_per_bar(beats) else {
            log::debug!("Ignoring invalid beats per bar: {}", beats);
            return false;
        };
        self.subdivision = subdivision;
        self.resync_beat();
        self.schedule_beats();
        true
    }

    /// Register the repeating tick callback, clearing any previous registration first
    pub fn schedule_beats(&mut self) -> ScheduleHandle {
        if let Some(old) = self.schedule.take() {
            log::debug!("Cleared tick schedule {:?}", old.handle);
        }

        let handle = ScheduleHandle(self.next_handle);
        self.next_handle += 1;
        let next_tick = self.first_tick_at_or_after(self.position);
        self.schedule = Some(BeatSchedule {
            handle,
            subdivision: self.subdivision,
            next_tick,
        });
        log::debug!(
            "Scheduled {} ticks as {:?} starting at tick {}",
            self.subdivision,
            handle,
            next_tick
        );
        handle
    }

    /// Start the clock. Returns false when it was already running.
    pub fn play(&mut self) -> bool {
        if self.state.is_playing() {
            return false;
        }
        self.state = TransportState::Playing;
        true
    }

    /// Stop the clock but keep the playhead
    pub fn pause(&mut self) -> bool {
        if !self.state.is_playing() {
            return false;
        }
        self.state = TransportState::Paused;
        true
    }

    /// Stop, rewind to the origin and re-register the tick schedule
    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.position = 0;
        self.current_beat = 0;
        self.schedule_beats();
    }

    /// Move the playhead to a loop fraction (clamped into [0, 1]; 1.0 is the origin)
    pub fn seek_to(&mut self, fraction: f64) {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        self.place_at_fraction(fraction);
    }

    /// Rewind to the origin without changing the run state
    pub fn rewind(&mut self) {
        self.position = 0;
        self.current_beat = 0;
        if let Some(schedule) = self.schedule.as_mut() {
            schedule.next_tick = 0;
        }
    }

    /// Return the tick due at the playhead (if any) and how many frames,
    /// at most `max_frames`, can be rendered before the next tick or the cycle end.
    pub fn poll(&mut self, max_frames: usize) -> (Option<Tick>, usize) {
        let total = self.total_beats();
        let cycle = self.cycle_frames();
        let beats_per_bar = self.beats_per_bar();

        let mut fired = None;
        let mut next_tick_frame = cycle;

        if let Some(schedule) = self.schedule.as_mut() {
            let tick_at = |k: u32| tick_frame(k, cycle, total);
            if schedule.next_tick < total && tick_at(schedule.next_tick) <= self.position {
                let beat = schedule.next_tick;
                schedule.next_tick += 1;
                self.current_beat = beat;
                fired = Some(Tick {
                    beat,
                    beat_in_bar: beat % beats_per_bar,
                    bar: beat / beats_per_bar,
                    frame_time: self.elapsed_frames,
                });
            }
            if schedule.next_tick < total {
                next_tick_frame = tick_at(schedule.next_tick);
            }
        }

        let until_boundary = next_tick_frame.min(cycle).saturating_sub(self.position).max(1);
        (fired, (until_boundary as usize).min(max_frames))
    }

    /// Move the playhead forward by `frames` rendered frames
    pub fn advance(&mut self, frames: usize) -> Option<CycleBoundary> {
        self.elapsed_frames += frames as u64;
        self.position += frames as u64;

        let cycle = self.cycle_frames();
        if self.position < cycle {
            return None;
        }

        if self.loop_enabled {
            self.position %= cycle;
            if let Some(schedule) = self.schedule.as_mut() {
                schedule.next_tick = 0;
            }
            Some(CycleBoundary::Wrapped)
        } else {
            log::debug!("Reached loop end with looping disabled, stopping");
            self.state = TransportState::Stopped;
            self.rewind();
            Some(CycleBoundary::Ended)
        }
    }

    fn place_at_fraction(&mut self, fraction: f64) {
        let cycle = self.cycle_frames();
        self.position = ((fraction * cycle as f64).floor() as u64) % cycle;
        self.resync_beat();
    }

    /// Recompute the beat counter and the next pending tick from the playhead
    fn resync_beat(&mut self) {
        let total = self.total_beats();
        let fraction = self.current_position();
        self.current_beat = ((fraction * total as f64).floor() as u32).min(total - 1);
        let next_tick = self.first_tick_at_or_after(self.position);
        if let Some(schedule) = self.schedule.as_mut() {
            schedule.next_tick = next_tick;
        }
    }

    fn first_tick_at_or_after(&self, position: u64) -> u32 {
        let total = self.total_beats();
        let cycle = self.cycle_frames();
        let mut k = ((position as f64 / cycle as f64) * total as f64).floor() as u32;
        while k < total && tick_frame(k, cycle, total) < position {
            k += 1;
        }
        k.min(total)
    }

    /// Subdivision the active tick schedule was registered with
    pub fn scheduled_subdivision(&self) -> Option<Subdivision> {
        self.schedule.as_ref().map(|s| s.subdivision)
    }
}

/// Frame offset of tick `k` within a cycle
fn tick_frame(k: u32, cycle_frames: u64, total_beats: u32) -> u64 {
    (k as f64 * cycle_frames as f64 / total_beats as f64).round() as u64
}

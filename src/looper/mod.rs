// Looper - Orchestrates transport, tracks and recording around a tone source
//
// Control methods lock the shared core, mutate it and then notify state
// listeners with a fresh snapshot (outside the core lock). The audio host
// drives the same core through an `AudioProcessor`. Beat ticks travel back
// through a lock-free queue and are handed to beat listeners when the host
// calls `dispatch_events` from its UI loop.

pub mod engine;
pub mod error;
pub mod recording;
pub mod state;

pub use engine::LooperCore;
pub use error::LooperError;
pub use recording::{PendingTake, RecordingSession, SessionPhase};
pub use state::LooperState;

use crate::audio::bus::ToneSource;
use crate::audio::loader;
use crate::audio::player::LoopPlayer;
use crate::config::LooperConfig;
use crate::messaging::{BeatEvent, EventConsumer, LooperEvent, create_event_channel};
use crate::track::{TrackId, TrackSnapshot};
use ringbuf::traits::Consumer;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Called with the full state after every mutation.
/// Must not call back into the looper synchronously.
pub type StateCallback = Box<dyn FnMut(&LooperState) + Send>;

/// Called for every transport tick, from `dispatch_events`
pub type BeatCallback = Box<dyn FnMut(BeatEvent) + Send>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking listener must not take the audio path down with it
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handles shared with the audio processor and finalization tasks
#[derive(Clone)]
struct Shared {
    core: Arc<Mutex<LooperCore>>,
    listeners: Arc<Mutex<Vec<StateCallback>>>,
}

impl Shared {
    fn with_core<R>(&self, f: impl FnOnce(&mut LooperCore) -> R) -> R {
        f(&mut lock(&self.core))
    }

    fn notify(&self) {
        let state = lock(&self.core).snapshot();
        for listener in lock(&self.listeners).iter_mut() {
            listener(&state);
        }
    }
}

/// Audio-side handle. The host calls `process` once per block with the tone
/// source's output; the block comes back with track playback and clicks mixed in.
#[derive(Clone)]
pub struct AudioProcessor {
    core: Arc<Mutex<LooperCore>>,
}

impl AudioProcessor {
    pub fn process(&self, block: &mut [f32]) {
        lock(&self.core).process(block);
    }
}

/// The looper
pub struct Looper {
    config: LooperConfig,
    shared: Shared,
    events: EventConsumer,
    beat_listeners: Vec<BeatCallback>,
    runtime: Option<Handle>,
}

impl Looper {
    pub fn new(config: LooperConfig) -> Self {
        let (producer, consumer) = create_event_channel(config.event_queue_capacity);
        let core = LooperCore::new(&config, producer);
        Self {
            config,
            shared: Shared {
                core: Arc::new(Mutex::new(core)),
                listeners: Arc::new(Mutex::new(Vec::new())),
            },
            events: consumer,
            beat_listeners: Vec::new(),
            runtime: None,
        }
    }

    /// Attach to the tone source's bus.
    ///
    /// Must be called from within a tokio runtime; takes are finalized on it.
    /// Calling it again returns another processor for the same core.
    pub fn init(&mut self, source: &dyn ToneSource) -> Result<AudioProcessor, LooperError> {
        let runtime = Handle::try_current().map_err(|_| LooperError::NoRuntime)?;
        let bus = source.output_bus()?;
        if bus.sample_rate == 0 {
            return Err(LooperError::InvalidBus {
                sample_rate: bus.sample_rate,
            });
        }

        if self.shared.with_core(|core| core.init(bus)) {
            log::info!(
                "Looper initialised at {} Hz ({} frame blocks)",
                bus.sample_rate,
                bus.block_size
            );
            self.runtime = Some(runtime);
            self.shared.notify();
        } else {
            log::debug!("Looper already initialised");
        }

        Ok(AudioProcessor {
            core: Arc::clone(&self.shared.core),
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.with_core(|core| core.is_initialized())
    }

    // ---- Subscriptions ----

    pub fn on_state_change(&self, callback: impl FnMut(&LooperState) + Send + 'static) {
        lock(&self.shared.listeners).push(Box::new(callback));
    }

    pub fn on_beat(&mut self, callback: impl FnMut(BeatEvent) + Send + 'static) {
        self.beat_listeners.push(Box::new(callback));
    }

    /// Drain queued audio events: beat listeners see every tick in order,
    /// and a loop that ran out with looping disabled is stopped for real.
    /// Returns the number of events handled.
    pub fn dispatch_events(&mut self) -> usize {
        let mut handled = 0;
        let mut loop_ended = false;
        while let Some(event) = self.events.try_pop() {
            handled += 1;
            match event {
                LooperEvent::Beat(beat) => {
                    for listener in &mut self.beat_listeners {
                        listener(beat);
                    }
                }
                LooperEvent::LoopEnded => loop_ended = true,
            }
        }
        if loop_ended {
            log::info!("Loop ended");
            self.stop();
        }
        handled
    }

    // ---- Queries ----

    pub fn state(&self) -> LooperState {
        self.shared.with_core(|core| core.snapshot())
    }

    /// Loop fraction in [0, 1)
    pub fn current_position(&self) -> f64 {
        self.shared.with_core(|core| core.transport().current_position())
    }

    /// Loop duration in seconds
    pub fn loop_duration(&self) -> f64 {
        self.shared.with_core(|core| core.transport().loop_duration())
    }

    pub fn total_beats(&self) -> u32 {
        self.shared.with_core(|core| core.transport().total_beats())
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut LooperCore) -> R) -> R {
        let result = self.shared.with_core(f);
        self.shared.notify();
        result
    }

    // ---- Transport ----

    /// Start playback from the current position. No-op when already playing.
    pub fn play(&self) {
        if self.mutate(LooperCore::play) {
            log::debug!("Transport started");
        }
    }

    /// Halt playback keeping the position
    pub fn pause(&self) {
        self.mutate(LooperCore::pause);
    }

    /// Stop and rewind. A recording in progress is ended first; its take is
    /// finalized in the background.
    pub fn stop(&self) {
        let take = self.shared.with_core(|core| {
            let take = core.end_capture();
            core.stop_transport();
            take
        });
        if let Some(take) = take {
            self.spawn_finalize(take);
        }
        self.shared.notify();
    }

    /// Seek to a loop fraction (clamped into [0, 1])
    pub fn seek_to(&self, fraction: f64) {
        self.mutate(|core| core.seek_to(fraction));
    }

    pub fn set_bpm(&self, bpm: i64) {
        self.mutate(|core| core.set_bpm(bpm));
    }

    pub fn set_bars(&self, bars: i64) {
        self.mutate(|core| core.set_bars(bars));
    }

    /// Accepts 4, 8, 12 or 16; anything else is ignored
    pub fn set_beats_per_bar(&self, beats: i64) {
        self.mutate(|core| core.set_beats_per_bar(beats));
    }

    pub fn set_metronome_enabled(&self, enabled: bool) {
        self.mutate(|core| core.set_metronome_enabled(enabled));
    }

    pub fn set_loop_enabled(&self, enabled: bool) {
        self.mutate(|core| core.set_loop_enabled(enabled));
    }

    // ---- Tracks ----

    pub fn add_track(&self) -> TrackSnapshot {
        self.mutate(LooperCore::add_track)
    }

    pub fn remove_track(&self, id: TrackId) {
        self.mutate(|core| core.remove_track(id));
    }

    pub fn clear_track(&self, id: TrackId) {
        self.mutate(|core| core.clear_track(id));
    }

    pub fn clear_all_tracks(&self) {
        self.mutate(LooperCore::clear_all_tracks);
    }

    pub fn set_track_volume(&self, id: TrackId, db: f32) {
        self.mutate(|core| core.set_track_volume(id, db));
    }

    pub fn set_track_muted(&self, id: TrackId, muted: bool) {
        self.mutate(|core| core.set_track_muted(id, muted));
    }

    pub fn set_track_solo(&self, id: TrackId, solo: bool) {
        self.mutate(|core| core.set_track_solo(id, solo));
    }

    // ---- Recording ----

    /// Start recording into `track` (or the first empty track, or a new one).
    /// Ignored before init and while another take is recording or finalizing.
    pub fn start_recording(&self, track: Option<TrackId>) -> Option<TrackId> {
        let started = self.shared.with_core(|core| core.start_recording(track));
        if started.is_some() {
            self.shared.notify();
        }
        started
    }

    /// End the current recording.
    ///
    /// Capture stops when this is called and the take is handed to the
    /// runtime for encoding and loading, whether or not the returned future
    /// is awaited. The future resolves once the take is installed on its
    /// track or abandoned. Listeners are notified right away and again when
    /// finalization ends.
    pub fn stop_recording(&self) -> impl Future<Output = ()> + Send + use<> {
        let take = self.shared.with_core(LooperCore::end_capture);
        self.shared.notify();
        let handle = take.and_then(|take| self.spawn_finalize(take));
        async move {
            if let Some(handle) = handle {
                if let Err(e) = handle.await {
                    log::error!("Finalization task failed: {}", e);
                }
            }
        }
    }

    /// Remember a pressed note while recording
    pub fn note_on(&self, note: &str) {
        self.shared.with_core(|core| core.note_on(note));
    }

    /// Close the held note and attach it to the recorded track
    pub fn note_off(&self) {
        if self.shared.with_core(LooperCore::note_off) {
            self.shared.notify();
        }
    }

    /// Stop everything, release every take and drop all listeners
    pub fn dispose(&mut self) {
        self.stop();
        self.shared.with_core(LooperCore::dispose);
        lock(&self.shared.listeners).clear();
        self.beat_listeners.clear();
        while self.events.try_pop().is_some() {}
        log::info!("Looper disposed");
    }

    fn spawn_finalize(&self, take: PendingTake) -> Option<JoinHandle<()>> {
        match &self.runtime {
            Some(runtime) => Some(runtime.spawn(finalize_take(
                self.shared.clone(),
                take,
                self.config.load_timeout(),
            ))),
            None => {
                log::warn!("No runtime to finalize take for {}", take.track_id);
                self.shared.with_core(|core| core.abandon_take(take.take));
                self.shared.notify();
                None
            }
        }
    }
}

/// Encode, load and install a captured take. Every failure is logged and
/// leaves the track as it was.
async fn finalize_take(shared: Shared, take: PendingTake, timeout: Duration) {
    let PendingTake {
        take,
        track_id,
        capture,
        loop_duration,
    } = take;

    let payload = match capture.encode_wav() {
        Ok(payload) => payload,
        Err(e) => {
            log::error!("Failed to encode take for {}: {}", track_id, e);
            shared.with_core(|core| core.abandon_take(take));
            shared.notify();
            return;
        }
    };

    if payload.is_empty() {
        log::warn!("Recording for {} produced no audio", track_id);
        shared.with_core(|core| core.abandon_take(take));
        shared.notify();
        return;
    }

    match loader::load_payload(payload, capture.sample_rate, timeout).await {
        Ok(buffer) => {
            let volume_db = shared
                .with_core(|core| core.track_volume(track_id))
                .unwrap_or(0.0);
            let player = LoopPlayer::new(buffer, loop_duration, volume_db);
            shared.with_core(|core| core.install_take(take, track_id, player));
        }
        Err(e) => {
            log::error!("Failed to load take for {}: {}", track_id, e);
            shared.with_core(|core| core.abandon_take(take));
        }
    }
    shared.notify();
}

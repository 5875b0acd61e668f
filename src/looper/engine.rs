// Looper engine - Everything the audio callback and the control side share
//
// One instance lives behind a mutex. Control methods mutate it directly; the
// audio callback calls `process` once per block. Nothing here blocks, logs
// above debug level on the audio path, or allocates once recording is armed.

use super::recording::{PendingTake, RecordingSession, TakeId};
use super::state::LooperState;
use crate::audio::bus::AudioBus;
use crate::audio::capture::Recorder;
use crate::audio::player::LoopPlayer;
use crate::config::LooperConfig;
use crate::messaging::{BeatEvent, EventProducer, LooperEvent};
use crate::sequencer::metronome::Metronome;
use crate::sequencer::transport::{CycleBoundary, Tick, TransportClock};
use crate::track::{TrackId, TrackManager, TrackSnapshot};
use ringbuf::traits::Producer;

/// Sample rate assumed until a bus is attached
const PLACEHOLDER_SAMPLE_RATE: u32 = 48000;

pub struct LooperCore {
    transport: TransportClock,
    metronome: Metronome,
    tracks: TrackManager,
    recorder: Recorder,
    session: RecordingSession,
    events: EventProducer,
    initialized: bool,
    /// Events lost because the UI side did not drain the queue
    dropped_events: u64,
}

impl LooperCore {
    pub fn new(config: &LooperConfig, events: EventProducer) -> Self {
        let mut transport = TransportClock::new(PLACEHOLDER_SAMPLE_RATE as f64);
        transport.set_bpm(config.bpm);
        transport.set_bars(config.bars);
        if !transport.set_beats_per_bar(config.beats_per_bar) {
            log::warn!(
                "Configured beats per bar {} is not a supported subdivision, using {}",
                config.beats_per_bar,
                transport.beats_per_bar()
            );
        }
        transport.set_loop_enabled(config.loop_enabled);

        let mut metronome = Metronome::new(PLACEHOLDER_SAMPLE_RATE as f32);
        metronome.set_enabled(config.metronome_enabled);
        metronome.set_volume(config.metronome_volume);

        Self {
            transport,
            metronome,
            tracks: TrackManager::new(config.track_palette.clone()),
            recorder: Recorder::new(PLACEHOLDER_SAMPLE_RATE),
            session: RecordingSession::new(),
            events,
            initialized: false,
            dropped_events: 0,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Attach to the bus: size the clock, clicks and recorder to its rate,
    /// register the tick schedule and create the first track.
    /// Returns false if already initialised (nothing changes).
    pub fn init(&mut self, bus: AudioBus) -> bool {
        if self.initialized {
            return false;
        }

        let sample_rate = bus.sample_rate;
        self.transport.set_sample_rate(sample_rate as f64);

        let mut metronome = Metronome::new(sample_rate as f32);
        metronome.set_enabled(self.metronome.is_enabled());
        metronome.set_volume(self.metronome.volume());
        self.metronome = metronome;

        self.recorder = Recorder::new(sample_rate);
        self.transport.schedule_beats();
        if self.tracks.is_empty() {
            self.tracks.add();
        }
        self.initialized = true;
        true
    }

    pub fn transport(&self) -> &TransportClock {
        &self.transport
    }

    pub fn tracks(&self) -> &TrackManager {
        &self.tracks
    }

    pub fn session(&self) -> &RecordingSession {
        &self.session
    }

    pub fn metronome(&self) -> &Metronome {
        &self.metronome
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events
    }

    pub fn snapshot(&self) -> LooperState {
        LooperState {
            is_playing: self.transport.is_playing(),
            is_recording: self.session.is_recording(),
            bpm: self.transport.tempo().bpm(),
            bars: self.transport.bars(),
            beats_per_bar: self.transport.beats_per_bar(),
            current_beat: self.transport.current_beat(),
            loop_enabled: self.transport.is_loop_enabled(),
            metronome_enabled: self.metronome.is_enabled(),
            tracks: self.tracks.snapshots(),
        }
    }

    // ---- Transport ----

    /// Start every take at the current offset, then the clock.
    /// Returns false when already playing.
    pub fn play(&mut self) -> bool {
        if self.transport.is_playing() {
            return false;
        }
        self.restart_players_at(self.transport.position_seconds());
        self.transport.play()
    }

    /// Halt the clock keeping the playhead
    pub fn pause(&mut self) -> bool {
        if !self.transport.pause() {
            return false;
        }
        self.unsync_players();
        self.metronome.reset();
        true
    }

    /// Halt everything and rewind to the origin
    pub fn stop_transport(&mut self) {
        self.unsync_players();
        self.metronome.reset();
        self.transport.stop();
    }

    /// Move the playhead; running takes restart from the new offset
    pub fn seek_to(&mut self, fraction: f64) {
        self.transport.seek_to(fraction);
        if self.transport.is_playing() {
            self.restart_players_at(self.transport.position_seconds());
        }
    }

    pub fn set_bpm(&mut self, bpm: i64) {
        self.transport.set_bpm(bpm);
        if self.transport.is_playing() {
            self.restart_players_at(self.transport.position_seconds());
        }
    }

    pub fn set_bars(&mut self, bars: i64) {
        self.transport.set_bars(bars);
        if self.transport.is_playing() {
            self.restart_players_at(self.transport.position_seconds());
        }
    }

    pub fn set_beats_per_bar(&mut self, beats: i64) -> bool {
        self.transport.set_beats_per_bar(beats)
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) {
        self.transport.set_loop_enabled(enabled);
    }

    pub fn set_metronome_enabled(&mut self, enabled: bool) {
        self.metronome.set_enabled(enabled);
    }

    fn unsync_players(&mut self) {
        for player in self.tracks.players_mut() {
            player.unsync();
        }
    }

    fn restart_players_at(&mut self, offset_seconds: f64) {
        for player in self.tracks.players_mut() {
            player.unsync();
            player.sync_start(offset_seconds);
        }
    }

    // ---- Tracks ----

    pub fn add_track(&mut self) -> TrackSnapshot {
        self.tracks.add().snapshot()
    }

    /// Remove a track. Removing the track being recorded abandons the take.
    pub fn remove_track(&mut self, id: TrackId) -> bool {
        if self.session.is_recording() && self.session.track_id() == Some(id) {
            log::warn!("Removing {} while recording into it, discarding the take", id);
            self.recorder.discard();
            self.session.finish();
        }
        self.tracks.remove(id)
    }

    pub fn clear_track(&mut self, id: TrackId) -> bool {
        self.tracks.clear(id)
    }

    pub fn clear_all_tracks(&mut self) {
        self.tracks.clear_all();
    }

    pub fn set_track_volume(&mut self, id: TrackId, db: f32) -> bool {
        self.tracks.set_volume(id, db)
    }

    pub fn set_track_muted(&mut self, id: TrackId, muted: bool) -> bool {
        self.tracks.set_muted(id, muted)
    }

    pub fn set_track_solo(&mut self, id: TrackId, solo: bool) -> bool {
        self.tracks.set_solo(id, solo)
    }

    pub fn track_volume(&self, id: TrackId) -> Option<f32> {
        self.tracks.get(id).map(|t| t.volume_db())
    }

    // ---- Recording ----

    /// Arm recording on `target` (or the first track without a take, or a new
    /// track), rewind to the origin and make sure the transport runs.
    /// Returns the track recorded into, or `None` when nothing started.
    pub fn start_recording(&mut self, target: Option<TrackId>) -> Option<TrackId> {
        if !self.initialized {
            log::debug!("Ignoring record request before init");
            return None;
        }
        if !self.session.is_idle() {
            log::debug!("Ignoring record request, a take is already in progress");
            return None;
        }

        let track_id = match target {
            Some(id) if self.tracks.get(id).is_some() => id,
            Some(id) => {
                log::warn!("Cannot record into unknown {}", id);
                return None;
            }
            None => match self.tracks.first_without_buffer() {
                Some(id) => id,
                None => self.tracks.add().id(),
            },
        };

        if let Some(track) = self.tracks.get_mut(track_id) {
            track.set_recording(true);
        }

        self.transport.rewind();
        if self.transport.is_playing() {
            self.restart_players_at(0.0);
        }
        self.session.begin(track_id, self.transport.current_position());
        self.recorder.start(self.transport.cycle_frames() as usize);

        if !self.transport.is_playing() {
            self.play();
        }

        log::info!("Recording into {}", track_id);
        Some(track_id)
    }

    /// End capture synchronously. The raw take is handed back for
    /// finalization, the session moves to finalizing.
    pub fn end_capture(&mut self) -> Option<PendingTake> {
        let (track_id, take) = self.session.end()?;
        let capture = self.recorder.stop();
        if let Some(track) = self.tracks.get_mut(track_id) {
            track.set_recording(false);
        }
        log::info!(
            "Captured {} frames for {}",
            capture.samples.len(),
            track_id
        );
        Some(PendingTake {
            take,
            track_id,
            capture,
            loop_duration: self.transport.loop_duration(),
        })
    }

    /// Swap a finished take into its track. A playing transport picks it up
    /// immediately at the current offset. Returns false when the track is gone
    /// or the take no longer belongs to the current session.
    pub fn install_take(
        &mut self,
        take: TakeId,
        track_id: TrackId,
        mut player: LoopPlayer,
    ) -> bool {
        if !self.session.finish_take(take) {
            log::warn!("Dropping stale take for {}", track_id);
            return false;
        }
        if !self.initialized {
            log::debug!("Looper disposed, dropping take for {}", track_id);
            return false;
        }
        let position_seconds = self.transport.position_seconds();
        let playing = self.transport.is_playing();

        let Some(track) = self.tracks.get_mut(track_id) else {
            log::warn!("{} was removed before its take was ready", track_id);
            return false;
        };

        player.set_volume_db(track.volume_db());
        if playing {
            player.sync_start(position_seconds);
        }
        if let Some(mut old) = track.content_mut().install(player) {
            old.unsync();
        }
        self.tracks.apply_audibility();
        log::info!("Installed new take on {}", track_id);
        true
    }

    /// Finalization failed; the track keeps whatever it had
    pub fn abandon_take(&mut self, take: TakeId) {
        self.session.finish_take(take);
    }

    /// Remember a pressed note while recording
    pub fn note_on(&mut self, note: &str) -> bool {
        let position = self.transport.current_position();
        self.session.note_on(note, position)
    }

    /// Close the held note and attach it to the recorded track
    pub fn note_off(&mut self) -> bool {
        let position = self.transport.current_position();
        let Some((track_id, event)) = self.session.note_off(position) else {
            return false;
        };
        match self.tracks.get_mut(track_id) {
            Some(track) => {
                log::debug!("Captured {} on {}", event.note, track_id);
                track.content_mut().annotate(event);
                true
            }
            None => false,
        }
    }

    /// Stop everything and release every take
    pub fn dispose(&mut self) {
        self.stop_transport();
        self.recorder.discard();
        self.session.finish();
        self.tracks.clear_all();
        self.initialized = false;
    }

    // ---- Audio path ----

    /// Render one block of the mono bus in place.
    ///
    /// `block` holds the tone source's output. It is captured (when armed)
    /// before track playback and clicks are added, so takes never contain
    /// other loops.
    pub fn process(&mut self, block: &mut [f32]) {
        if !self.initialized || !self.transport.is_playing() {
            return;
        }

        let mut offset = 0;
        while offset < block.len() && self.transport.is_playing() {
            let (tick, frames) = self.transport.poll(block.len() - offset);
            if let Some(tick) = tick {
                self.on_tick(tick);
            }

            let segment = &mut block[offset..offset + frames];
            self.recorder.capture(segment);
            for player in self.tracks.players_mut() {
                player.mix_into(segment);
            }
            self.metronome.mix_into(segment);
            offset += frames;

            match self.transport.advance(frames) {
                Some(CycleBoundary::Wrapped) => self.restart_players_at(0.0),
                Some(CycleBoundary::Ended) => {
                    self.unsync_players();
                    self.push_event(LooperEvent::LoopEnded);
                }
                None => {}
            }
        }
    }

    fn on_tick(&mut self, tick: Tick) {
        self.metronome
            .on_beat(tick.beat_in_bar, self.transport.is_playing());
        self.push_event(LooperEvent::Beat(BeatEvent {
            beat: tick.beat,
            beat_in_bar: tick.beat_in_bar,
            frame_time: tick.frame_time,
        }));
    }

    fn push_event(&mut self, event: LooperEvent) {
        if self.events.try_push(event).is_err() {
            self.dropped_events += 1;
        }
    }
}

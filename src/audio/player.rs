// Loop player - Plays one recorded take in a loop, synced to the transport
//
// A player is built fully-formed off the audio path, then swapped into its
// track. `unsync` always runs before a new `sync_start`, so two start
// generations never overlap.

use crate::audio::buffer::AudioBuffer;
use crate::audio::dsp_utils::{OnePoleSmoother, clamp_track_db, db_to_gain};

/// Gain smoothing time for mute/solo/volume changes
const GAIN_SMOOTHING_MS: f32 = 5.0;

/// Playback state of a loop player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Not following the transport
    Stopped,
    /// Following the transport, reading at `playhead`
    Started { playhead: usize },
}

/// Looping playback unit bound to one buffer
#[derive(Debug, Clone)]
pub struct LoopPlayer {
    buffer: AudioBuffer,
    loop_start: usize,
    loop_end: usize,
    volume_db: f32,
    audible: bool,
    gain: OnePoleSmoother,
    state: PlayerState,
}

impl LoopPlayer {
    /// Create a player looping over `[0, loop_duration)` seconds of `buffer`
    pub fn new(buffer: AudioBuffer, loop_duration: f64, volume_db: f32) -> Self {
        let sample_rate = buffer.sample_rate() as f32;
        let loop_end = ((loop_duration * buffer.sample_rate() as f64).round() as usize).max(1);
        let volume_db = clamp_track_db(volume_db);

        Self {
            buffer,
            loop_start: 0,
            loop_end,
            volume_db,
            audible: true,
            gain: OnePoleSmoother::new(db_to_gain(volume_db), GAIN_SMOOTHING_MS, sample_rate),
            state: PlayerState::Stopped,
        }
    }

    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn is_started(&self) -> bool {
        matches!(self.state, PlayerState::Started { .. })
    }

    /// Loop length in frames
    pub fn loop_frames(&self) -> usize {
        self.loop_end - self.loop_start
    }

    pub fn volume_db(&self) -> f32 {
        self.volume_db
    }

    /// Set volume in dB (clamped to the track range)
    pub fn set_volume_db(&mut self, db: f32) {
        self.volume_db = clamp_track_db(db);
    }

    pub fn is_audible(&self) -> bool {
        self.audible
    }

    /// Apply the effective audibility computed from mute/solo
    pub fn set_audible(&mut self, audible: bool) {
        self.audible = audible;
    }

    fn target_gain(&self) -> f32 {
        if self.audible {
            db_to_gain(self.volume_db)
        } else {
            0.0
        }
    }

    /// Follow the transport from `offset_seconds` into the loop
    pub fn sync_start(&mut self, offset_seconds: f64) {
        let offset = (offset_seconds.max(0.0) * self.buffer.sample_rate() as f64) as usize;
        let playhead = self.loop_start + offset % self.loop_frames();
        self.gain.reset(self.target_gain());
        self.state = PlayerState::Started { playhead };
    }

    /// Stop following the transport
    pub fn unsync(&mut self) {
        self.state = PlayerState::Stopped;
    }

    /// Add this player's output into a bus segment
    pub fn mix_into(&mut self, output: &mut [f32]) {
        let PlayerState::Started { mut playhead } = self.state else {
            return;
        };

        let target = self.target_gain();
        for sample in output.iter_mut() {
            let gain = self.gain.process(target);
            *sample += self.buffer.sample(playhead) * gain;
            playhead += 1;
            if playhead >= self.loop_end {
                playhead = self.loop_start;
            }
        }
        self.state = PlayerState::Started { playhead };
    }
}

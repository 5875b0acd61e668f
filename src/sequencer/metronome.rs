// Metronome - Click track generator for the loop transport
// Triggered by transport ticks, mixed into the shared output bus

use std::f32::consts::PI;

/// Metronome click type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickType {
    /// Click on first beat of bar (accent/downbeat)
    Accent,
    /// Click on other beats
    Regular,
}

impl ClickType {
    /// Accent on the first tick of a bar, regular otherwise
    pub fn for_beat_in_bar(beat_in_bar: u32) -> Self {
        if beat_in_bar == 0 {
            ClickType::Accent
        } else {
            ClickType::Regular
        }
    }
}

/// Metronome click sound generator
/// Pre-generates short click samples for low CPU overhead
#[derive(Debug, Clone)]
pub struct MetronomeSound {
    accent_samples: Vec<f32>,
    regular_samples: Vec<f32>,
}

impl MetronomeSound {
    /// Duration of click in milliseconds
    const CLICK_DURATION_MS: f32 = 10.0;

    /// Create new metronome sound generator
    pub fn new(sample_rate: f32) -> Self {
        let click_samples = ((Self::CLICK_DURATION_MS / 1000.0) * sample_rate) as usize;

        Self {
            accent_samples: Self::generate_click(sample_rate, click_samples, 1200.0, 0.6),
            regular_samples: Self::generate_click(sample_rate, click_samples, 800.0, 0.4),
        }
    }

    /// Generate a short click sound using sine wave with envelope
    /// Higher frequency and amplitude for accent clicks
    fn generate_click(
        sample_rate: f32,
        num_samples: usize,
        frequency: f32,
        amplitude: f32,
    ) -> Vec<f32> {
        let phase_increment = 2.0 * PI * frequency / sample_rate;

        (0..num_samples)
            .map(|i| {
                let t = i as f32 / num_samples as f32;
                let envelope = (-t * 8.0).exp();
                (i as f32 * phase_increment).sin() * envelope * amplitude
            })
            .collect()
    }

    /// Get click samples for given type
    pub fn get_click(&self, click_type: ClickType) -> &[f32] {
        match click_type {
            ClickType::Accent => &self.accent_samples,
            ClickType::Regular => &self.regular_samples,
        }
    }
}

/// Active click playback state
#[derive(Debug, Clone)]
struct ClickPlayback {
    click_type: ClickType,
    position: usize,
}

/// Metronome voice pair (accent + regular)
/// Stateless beyond enable/disable: each tick either starts a click or does nothing
#[derive(Debug, Clone)]
pub struct Metronome {
    sound: MetronomeSound,
    enabled: bool,
    volume: f32,
    current_click: Option<ClickPlayback>,
}

impl Metronome {
    /// Create new metronome
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sound: MetronomeSound::new(sample_rate),
            enabled: true,
            volume: 0.5,
            current_click: None,
        }
    }

    /// Enable/disable metronome
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.current_click = None;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Set metronome volume (0.0 to 1.0)
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Tick hook: accent on the downbeat, regular otherwise.
    /// Silent unless enabled and the transport is playing. Returns the click started.
    pub fn on_beat(&mut self, beat_in_bar: u32, transport_playing: bool) -> Option<ClickType> {
        if !self.enabled || !transport_playing {
            return None;
        }
        let click_type = ClickType::for_beat_in_bar(beat_in_bar);
        self.current_click = Some(ClickPlayback {
            click_type,
            position: 0,
        });
        Some(click_type)
    }

    /// Process one sample of metronome output
    /// Returns the click sample (0.0 if no click active)
    pub fn process_sample(&mut self) -> f32 {
        if let Some(ref mut playback) = self.current_click {
            let click_samples = self.sound.get_click(playback.click_type);

            if playback.position < click_samples.len() {
                let sample = click_samples[playback.position] * self.volume;
                playback.position += 1;
                return sample;
            }
            self.current_click = None;
        }

        0.0
    }

    /// Add the running click (if any) into a bus segment
    pub fn mix_into(&mut self, output: &mut [f32]) {
        if self.current_click.is_none() {
            return;
        }
        for sample in output.iter_mut() {
            *sample += self.process_sample();
        }
    }

    /// Drop any click in progress
    pub fn reset(&mut self) {
        self.current_click = None;
    }
}

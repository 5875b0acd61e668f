// Loop Station demo - records one loop from a synthetic tone source offline
// and plays it back, without touching an audio device.
//
// RUST_LOG=debug cargo run   for the full trace

use loop_station::{AudioBus, EngineError, Looper, LooperConfig, ToneSource};
use std::f32::consts::TAU;
use std::sync::{Arc, Mutex};

const SAMPLE_RATE: u32 = 48000;
const BLOCK_SIZE: usize = 512;

/// Minimal monophonic sine voice standing in for the synth engine
struct SineSource {
    sample_rate: f32,
    phase: f32,
    frequency: Option<f32>,
    amplitude: f32,
}

impl SineSource {
    fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            phase: 0.0,
            frequency: None,
            amplitude: 0.0,
        }
    }
}

/// "A4" -> 440 Hz. Unknown names give None.
fn note_frequency(note: &str) -> Option<f32> {
    let (name, octave) = note.split_at(note.find(|c: char| c.is_ascii_digit() || c == '-')?);
    let octave: i32 = octave.parse().ok()?;
    let semitone = match name {
        "C" => 0,
        "C#" | "Db" => 1,
        "D" => 2,
        "D#" | "Eb" => 3,
        "E" => 4,
        "F" => 5,
        "F#" | "Gb" => 6,
        "G" => 7,
        "G#" | "Ab" => 8,
        "A" => 9,
        "A#" | "Bb" => 10,
        "B" => 11,
        _ => return None,
    };
    let midi = (octave + 1) * 12 + semitone;
    Some(440.0 * 2f32.powf((midi - 69) as f32 / 12.0))
}

impl ToneSource for SineSource {
    fn output_bus(&self) -> Result<AudioBus, EngineError> {
        Ok(AudioBus::new(self.sample_rate as u32, BLOCK_SIZE))
    }

    fn play_note(&mut self, note: &str, velocity: f32) {
        self.frequency = note_frequency(note);
        self.amplitude = 0.3 * velocity.clamp(0.0, 1.0);
    }

    fn stop_note(&mut self, _note: &str) {
        self.frequency = None;
    }

    fn render(&mut self, out: &mut [f32]) {
        let Some(frequency) = self.frequency else {
            out.fill(0.0);
            return;
        };
        let step = TAU * frequency / self.sample_rate;
        for sample in out.iter_mut() {
            *sample = self.phase.sin() * self.amplitude;
            self.phase = (self.phase + step) % TAU;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("=== Loop Station ===");

    let config = LooperConfig {
        bpm: 140,
        bars: 1,
        metronome_enabled: false,
        ..LooperConfig::default()
    };

    let mut source = SineSource::new(SAMPLE_RATE);
    let mut looper = Looper::new(config);
    let processor = looper.init(&source)?;

    let beats = Arc::new(Mutex::new(0u32));
    let beat_count = Arc::clone(&beats);
    looper.on_beat(move |_| {
        if let Ok(mut count) = beat_count.lock() {
            *count += 1;
        }
    });
    looper.on_state_change(|state| {
        log::debug!(
            "State: playing={} recording={} beat={}",
            state.is_playing,
            state.is_recording,
            state.current_beat
        );
    });

    let loop_frames = (looper.loop_duration() * SAMPLE_RATE as f64).round() as usize;
    log::info!(
        "Loop: {:.3} s, {} ticks, {} frames",
        looper.loop_duration(),
        looper.total_beats(),
        loop_frames
    );

    // A short arpeggio, one note per quarter of the loop
    let melody = ["C4", "E4", "G4", "C5"];
    let note_frames = loop_frames / melody.len();

    let track = looper
        .start_recording(None)
        .ok_or("recording did not start")?;
    log::info!("Recording into {}", track);

    let mut block = vec![0.0f32; BLOCK_SIZE];
    let mut rendered = 0;
    let mut current_note: Option<usize> = None;
    while rendered < loop_frames {
        let index = (rendered / note_frames).min(melody.len() - 1);
        if current_note != Some(index) {
            if let Some(previous) = current_note {
                source.stop_note(melody[previous]);
                looper.note_off();
            }
            source.play_note(melody[index], 0.8);
            looper.note_on(melody[index]);
            current_note = Some(index);
        }

        let frames = BLOCK_SIZE.min(loop_frames - rendered);
        source.render(&mut block[..frames]);
        processor.process(&mut block[..frames]);
        rendered += frames;
        looper.dispatch_events();
    }
    if let Some(previous) = current_note {
        source.stop_note(melody[previous]);
    }
    looper.note_off();

    looper.stop_recording().await;

    // Two cycles of playback with the source silent
    looper.play();
    let mut peak = 0.0f32;
    for _ in 0..(2 * loop_frames).div_ceil(BLOCK_SIZE) {
        source.render(&mut block);
        processor.process(&mut block);
        peak = block.iter().fold(peak, |p, s| p.max(s.abs()));
        looper.dispatch_events();
    }
    looper.stop();

    log::info!("Playback peak: {:.3}", peak);
    log::info!("Beats dispatched: {}", beats.lock().map(|b| *b).unwrap_or(0));
    log::info!("Final state:\n{}", serde_json::to_string_pretty(&looper.state())?);

    looper.dispose();
    Ok(())
}

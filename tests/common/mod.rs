//! Shared fixtures for the integration tests

#![allow(dead_code)]

use loop_station::{AudioBus, AudioProcessor, EngineError, Looper, LooperConfig, ToneSource};

/// Tests run the bus at 1 kHz so loops stay a few thousand frames long
pub const TEST_RATE: u32 = 1000;
pub const BLOCK: usize = 100;

/// Tone source emitting a constant level, so recorded takes are easy to recognise
pub struct LevelSource {
    pub level: f32,
    sample_rate: u32,
}

impl LevelSource {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            level: 0.0,
            sample_rate,
        }
    }
}

impl ToneSource for LevelSource {
    fn output_bus(&self) -> Result<AudioBus, EngineError> {
        Ok(AudioBus::new(self.sample_rate, BLOCK))
    }

    fn play_note(&mut self, _note: &str, velocity: f32) {
        self.level = velocity;
    }

    fn stop_note(&mut self, _note: &str) {
        self.level = 0.0;
    }

    fn render(&mut self, out: &mut [f32]) {
        out.fill(self.level);
    }
}

/// Looper attached to a 1 kHz source, clicks off so the bus only carries tracks
pub fn looper_with(config: LooperConfig) -> (Looper, AudioProcessor, LevelSource) {
    let source = LevelSource::new(TEST_RATE);
    let mut looper = Looper::new(LooperConfig {
        metronome_enabled: false,
        ..config
    });
    let processor = looper.init(&source).expect("init");
    (looper, processor, source)
}

/// Render `frames` through source and looper; returns the last block
pub fn run(
    looper: &mut Looper,
    processor: &AudioProcessor,
    source: &mut LevelSource,
    frames: usize,
) -> Vec<f32> {
    let mut remaining = frames;
    let mut last = Vec::new();
    while remaining > 0 {
        let n = remaining.min(BLOCK);
        let mut block = vec![0.0; n];
        source.render(&mut block);
        processor.process(&mut block);
        looper.dispatch_events();
        remaining -= n;
        last = block;
    }
    last
}

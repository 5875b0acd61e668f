// Timeline - Musical time representation for the loop
// Handles conversion between bpm, bars, tick subdivisions, seconds and frames

use std::fmt;

/// Tempo in BPM (Beats Per Minute), always a quarter-note pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Tempo {
    bpm: u32,
}

impl Tempo {
    /// Slowest tempo the looper accepts
    pub const MIN_BPM: u32 = 40;
    /// Fastest tempo the looper accepts
    pub const MAX_BPM: u32 = 240;

    /// Creates a tempo, clamping into [40, 240]
    pub fn new(bpm: i64) -> Self {
        Self {
            bpm: bpm.clamp(Self::MIN_BPM as i64, Self::MAX_BPM as i64) as u32,
        }
    }

    /// Get BPM value
    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Duration of one quarter note in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm as f64
    }

    /// Duration of one bar (four quarter notes) in seconds
    pub fn bar_duration_seconds(&self) -> f64 {
        self.beat_duration_seconds() * QUARTERS_PER_BAR as f64
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(120)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.bpm)
    }
}

/// Every bar is four quarter notes long; the subdivision only changes tick density
pub const QUARTERS_PER_BAR: u32 = 4;

/// Tick granularity inside a bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Subdivision {
    /// 4 ticks per bar
    Quarter,
    /// 8 ticks per bar
    Eighth,
    /// 12 ticks per bar
    TripletEighth,
    /// 16 ticks per bar
    Sixteenth,
}

impl Subdivision {
    /// Map a beats-per-bar value onto a subdivision.
    /// Only 4, 8, 12 and 16 are meaningful; anything else yields `None`.
    pub fn from_beats_per_bar(beats: i64) -> Option<Self> {
        match beats {
            4 => Some(Subdivision::Quarter),
            8 => Some(Subdivision::Eighth),
            12 => Some(Subdivision::TripletEighth),
            16 => Some(Subdivision::Sixteenth),
            _ => None,
        }
    }

    /// Number of ticks in one bar
    pub fn beats_per_bar(&self) -> u32 {
        match self {
            Subdivision::Quarter => 4,
            Subdivision::Eighth => 8,
            Subdivision::TripletEighth => 12,
            Subdivision::Sixteenth => 16,
        }
    }

    /// Tick length relative to a quarter note
    pub fn quarter_fraction(&self) -> f64 {
        QUARTERS_PER_BAR as f64 / self.beats_per_bar() as f64
    }
}

impl Default for Subdivision {
    fn default() -> Self {
        Subdivision::Quarter
    }
}

impl fmt::Display for Subdivision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Subdivision::Quarter => "4n",
            Subdivision::Eighth => "8n",
            Subdivision::TripletEighth => "8t",
            Subdivision::Sixteenth => "16n",
        };
        f.write_str(label)
    }
}

/// Number of bars in one loop cycle, clamped into [1, 16]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BarCount(u32);

impl BarCount {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 16;

    pub fn new(bars: i64) -> Self {
        Self(bars.clamp(Self::MIN as i64, Self::MAX as i64) as u32)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for BarCount {
    fn default() -> Self {
        Self(4)
    }
}

/// Loop geometry derived from tempo, bar count and subdivision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopLength {
    pub tempo: Tempo,
    pub bars: BarCount,
    pub subdivision: Subdivision,
}

impl LoopLength {
    pub fn new(tempo: Tempo, bars: BarCount, subdivision: Subdivision) -> Self {
        Self {
            tempo,
            bars,
            subdivision,
        }
    }

    /// Loop duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.tempo.bar_duration_seconds() * self.bars.get() as f64
    }

    /// Ticks in one loop cycle (`bars * beats_per_bar`)
    pub fn total_beats(&self) -> u32 {
        self.bars.get() * self.subdivision.beats_per_bar()
    }

    /// Loop duration in frames at the given sample rate (never zero)
    pub fn frames(&self, sample_rate: f64) -> u64 {
        ((self.duration_seconds() * sample_rate).round() as u64).max(1)
    }

    /// Duration of one tick in seconds
    pub fn tick_duration_seconds(&self) -> f64 {
        self.tempo.beat_duration_seconds() * self.subdivision.quarter_fraction()
    }
}

impl fmt::Display for LoopLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bars @ {} ({})",
            self.bars.get(),
            self.tempo,
            self.subdivision
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo_clamps() {
        assert_eq!(Tempo::new(10).bpm(), 40);
        assert_eq!(Tempo::new(-500).bpm(), 40);
        assert_eq!(Tempo::new(300).bpm(), 240);
        assert_eq!(Tempo::new(133).bpm(), 133);
        assert_eq!(Tempo::new(120).beat_duration_seconds(), 0.5);
    }

    #[test]
    fn test_subdivision_validation() {
        assert_eq!(Subdivision::from_beats_per_bar(4), Some(Subdivision::Quarter));
        assert_eq!(Subdivision::from_beats_per_bar(12), Some(Subdivision::TripletEighth));
        assert_eq!(Subdivision::from_beats_per_bar(6), None);
        assert_eq!(Subdivision::from_beats_per_bar(0), None);
        assert_eq!(Subdivision::TripletEighth.to_string(), "8t");
    }

    #[test]
    fn test_loop_duration() {
        // 4 bars x 4 quarters x 0.5s at 120 BPM
        let length = LoopLength::new(Tempo::new(120), BarCount::new(4), Subdivision::Quarter);
        assert_eq!(length.duration_seconds(), 8.0);
        assert_eq!(length.total_beats(), 16);
        assert_eq!(length.frames(48000.0), 384_000);

        // Subdivision changes tick density, not the loop length
        let sixteenths = LoopLength::new(Tempo::new(120), BarCount::new(4), Subdivision::Sixteenth);
        assert_eq!(sixteenths.duration_seconds(), 8.0);
        assert_eq!(sixteenths.total_beats(), 64);
        assert_eq!(sixteenths.tick_duration_seconds(), 0.125);
    }

    #[test]
    fn test_bar_count_clamps() {
        assert_eq!(BarCount::new(0).get(), 1);
        assert_eq!(BarCount::new(17).get(), 16);
        assert_eq!(BarCount::new(8).get(), 8);
    }
}

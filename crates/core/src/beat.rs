use std::time::{Duration, Instant};

/// Musical timing snapshot sampled once per compositor tick.
#[derive(Clone, Copy, Debug)]
pub struct BeatState {
    pub bpm: f64,
    /// 0.0 to 1.0, resets each beat
    pub beat_phase: f64,
    /// 0.0 to 1.0, resets each bar
    pub bar_phase: f64,
    pub elapsed: Duration,
}

impl Default for BeatState {
    fn default() -> Self {
        BeatState {
            bpm: 120.0,
            beat_phase: 0.0,
            bar_phase: 0.0,
            elapsed: Duration::ZERO,
        }
    }
}

/// Tempo provider. The compositor pulls this once per tick; it never
/// pushes into the engine.
pub trait BeatSource: Send + Sync {
    fn sample(&self) -> BeatState;
}

/// Free-running internal tempo, the fallback when no external sync
/// (Link, DJ deck, ...) is feeding the engine.
pub struct InternalClock {
    bpm: f64,
    beats_per_bar: u32,
    origin: Instant,
}

impl InternalClock {
    pub fn new(bpm: f64) -> Self {
        InternalClock {
            bpm,
            beats_per_bar: 4,
            origin: Instant::now(),
        }
    }

    pub fn with_beats_per_bar(mut self, beats_per_bar: u32) -> Self {
        self.beats_per_bar = beats_per_bar.max(1);
        self
    }
}

impl BeatSource for InternalClock {
    fn sample(&self) -> BeatState {
        let elapsed = self.origin.elapsed();
        let beat_time = elapsed.as_secs_f64() * self.bpm / 60.0;
        BeatState {
            bpm: self.bpm,
            beat_phase: beat_time.fract(),
            bar_phase: (beat_time / self.beats_per_bar as f64).fract(),
            elapsed,
        }
    }
}

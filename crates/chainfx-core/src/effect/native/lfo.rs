//! Sine LFO shared by the modulation effects

use std::f32::consts::TAU;

/// Phase-accumulator sine oscillator, output in -1..1
#[derive(Debug, Clone)]
pub(crate) struct Lfo {
    /// Phase in cycles (0..1)
    phase: f32,
    increment: f32,
}

impl Lfo {
    pub(crate) fn new() -> Self {
        Self {
            phase: 0.0,
            increment: 0.0,
        }
    }

    pub(crate) fn set_frequency(&mut self, hz: f32, sample_rate: f32) {
        self.increment = if sample_rate > 0.0 { hz.max(0.0) / sample_rate } else { 0.0 };
    }

    #[inline]
    pub(crate) fn next(&mut self) -> f32 {
        let value = (TAU * self.phase).sin();
        self.phase = (self.phase + self.increment).fract();
        value
    }

    pub(crate) fn reset(&mut self) {
        self.phase = 0.0;
    }
}

//! Phaser - six first-order allpass stages swept by an LFO
//!
//! The sweep runs on a log-frequency scale around the centre frequency;
//! depth is the sweep width as a fraction of the 20 Hz–20 kHz span.

use crate::effect::native::lfo::Lfo;
use crate::effect::{Effect, EffectInfo};
use crate::params::ParamId;
use crate::types::{Sample, SAMPLE_RATE};

const NUM_STAGES: usize = 6;
const MIN_FREQ: f32 = 20.0;
const MAX_FREQ: f32 = 20000.0;
/// Keep the feedback loop strictly stable
const MAX_FEEDBACK: f32 = 0.95;

/// First-order allpass (bilinear)
#[derive(Debug, Clone, Default)]
struct AllpassStage {
    zm1: f32,
}

impl AllpassStage {
    #[inline]
    fn tick(&mut self, x: f32, a1: f32) -> f32 {
        let y = -a1 * x + self.zm1;
        self.zm1 = x + a1 * y;
        y
    }
}

/// Map a frequency onto 0..1 on a log scale
#[inline]
fn log_normalize(freq: f32) -> f32 {
    (freq.clamp(MIN_FREQ, MAX_FREQ) / MIN_FREQ).ln() / (MAX_FREQ / MIN_FREQ).ln()
}

#[inline]
fn log_denormalize(norm: f32) -> f32 {
    MIN_FREQ * (MAX_FREQ / MIN_FREQ).powf(norm)
}

/// Swept allpass phaser
pub struct Phaser {
    info: EffectInfo,
    sample_rate: f32,
    stages: [AllpassStage; NUM_STAGES],
    lfo: Lfo,
    rate: f32,
    depth: f32,
    centre_norm: f32,
    feedback: f32,
    mix: f32,
    last_output: f32,
}

impl Phaser {
    pub fn new() -> Self {
        let info = EffectInfo::new("Phase", "Modulation")
            .with_param(ParamId::PhaserRate)
            .with_param(ParamId::PhaserDepth)
            .with_param(ParamId::PhaserCenterFreq)
            .with_param(ParamId::PhaserFeedback)
            .with_param(ParamId::PhaserMix)
            .with_bypass(ParamId::PhaserBypass);

        let mut phaser = Self {
            info,
            sample_rate: SAMPLE_RATE as f32,
            stages: Default::default(),
            lfo: Lfo::new(),
            rate: 0.2,
            depth: 0.05,
            centre_norm: log_normalize(1000.0),
            feedback: 0.0,
            mix: 0.0,
            last_output: 0.0,
        };
        phaser.set_rate(0.2);
        phaser
    }

    /// LFO rate in Hz
    pub fn set_rate(&mut self, hz: f32) {
        self.rate = hz;
        self.lfo.set_frequency(hz, self.sample_rate);
    }

    /// Sweep depth (0..1)
    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth.clamp(0.0, 1.0);
    }

    pub fn set_centre_frequency(&mut self, hz: f32) {
        self.centre_norm = log_normalize(hz);
    }

    /// Feedback (-1..1, limited internally for stability)
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(-MAX_FEEDBACK, MAX_FEEDBACK);
    }

    /// Dry/wet (0 = dry)
    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }
}

impl Default for Phaser {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Phaser {
    fn info(&self) -> &EffectInfo {
        &self.info
    }

    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.lfo.set_frequency(self.rate, sample_rate);
        self.reset();
    }

    fn process(&mut self, block: &mut [Sample]) {
        let nyquist_guard = self.sample_rate * 0.49;
        for sample in block.iter_mut() {
            let sweep = 0.5 * self.depth * self.lfo.next();
            let norm = (self.centre_norm + sweep).clamp(0.01, 0.99);
            let freq = log_denormalize(norm).min(nyquist_guard);

            let w = (std::f32::consts::PI * freq / self.sample_rate).tan();
            let a1 = (1.0 - w) / (1.0 + w);

            let dry = *sample;
            let input = dry + self.feedback * self.last_output;
            let wet = self
                .stages
                .iter_mut()
                .fold(input, |x, stage| stage.tick(x, a1));
            self.last_output = wet;

            *sample = dry * (1.0 - self.mix) + wet * self.mix;
        }
    }

    fn reset(&mut self) {
        self.stages = Default::default();
        self.lfo.reset();
        self.last_output = 0.0;
    }
}

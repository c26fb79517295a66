//! Chorus - LFO-modulated fractional delay with feedback
//!
//! The delay time swings `depth × MAX_DEPTH_MS` around the centre delay.
//! The delay line is sized in `prepare` for the longest centre delay plus
//! the full modulation swing, so `process` never allocates.

use crate::effect::native::lfo::Lfo;
use crate::effect::{Effect, EffectInfo};
use crate::params::ParamId;
use crate::types::{Sample, SAMPLE_RATE};

/// Longest centre delay the parameter allows
const MAX_CENTRE_DELAY_MS: f32 = 100.0;
/// Modulation swing at full depth
const MAX_DEPTH_MS: f32 = 10.0;
const MAX_FEEDBACK: f32 = 0.95;

/// Circular buffer with linear-interpolated reads
#[derive(Debug, Clone, Default)]
struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    fn allocate(&mut self, len: usize) {
        self.buffer = vec![0.0; len.max(4)];
        self.write_pos = 0;
    }

    /// Read `delay` samples behind the write head (fractional)
    #[inline]
    fn read(&self, delay: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay.clamp(1.0, (len - 2) as f32);
        let whole = delay.floor();
        let frac = delay - whole;
        let i0 = (self.write_pos + len - whole as usize) % len;
        let i1 = (i0 + len - 1) % len;
        self.buffer[i0] + (self.buffer[i1] - self.buffer[i0]) * frac
    }

    #[inline]
    fn write(&mut self, value: f32) {
        self.buffer[self.write_pos] = value;
        self.write_pos += 1;
        if self.write_pos >= self.buffer.len() {
            self.write_pos = 0;
        }
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// Modulated-delay chorus
pub struct Chorus {
    info: EffectInfo,
    sample_rate: f32,
    line: DelayLine,
    lfo: Lfo,
    rate: f32,
    depth: f32,
    centre_delay_ms: f32,
    feedback: f32,
    mix: f32,
}

impl Chorus {
    pub fn new() -> Self {
        let info = EffectInfo::new("Chorus", "Modulation")
            .with_param(ParamId::ChorusRate)
            .with_param(ParamId::ChorusDepth)
            .with_param(ParamId::ChorusCenterDelay)
            .with_param(ParamId::ChorusFeedback)
            .with_param(ParamId::ChorusMix)
            .with_bypass(ParamId::ChorusBypass);

        let mut chorus = Self {
            info,
            sample_rate: SAMPLE_RATE as f32,
            line: DelayLine::default(),
            lfo: Lfo::new(),
            rate: 0.2,
            depth: 0.05,
            centre_delay_ms: 7.0,
            feedback: 0.0,
            mix: 0.0,
        };
        chorus.set_rate(0.2);
        chorus
    }

    pub fn set_rate(&mut self, hz: f32) {
        self.rate = hz;
        self.lfo.set_frequency(hz, self.sample_rate);
    }

    /// Modulation depth (0..1)
    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth.clamp(0.0, 1.0);
    }

    pub fn set_centre_delay(&mut self, ms: f32) {
        self.centre_delay_ms = ms.clamp(1.0, MAX_CENTRE_DELAY_MS);
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(-MAX_FEEDBACK, MAX_FEEDBACK);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    /// Delay line length for a sample rate
    fn line_len(sample_rate: f32) -> usize {
        ((MAX_CENTRE_DELAY_MS + MAX_DEPTH_MS) * 0.001 * sample_rate).ceil() as usize + 4
    }
}

impl Default for Chorus {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Chorus {
    fn info(&self) -> &EffectInfo {
        &self.info
    }

    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.line.allocate(Self::line_len(sample_rate));
        self.lfo.set_frequency(self.rate, sample_rate);
        self.reset();
    }

    fn process(&mut self, block: &mut [Sample]) {
        if self.line.buffer.is_empty() {
            // Not prepared yet
            return;
        }
        let ms_to_samples = self.sample_rate * 0.001;
        for sample in block.iter_mut() {
            let delay_ms = self.centre_delay_ms + self.depth * MAX_DEPTH_MS * self.lfo.next();
            let delayed = self.line.read(delay_ms * ms_to_samples);

            let dry = *sample;
            self.line.write(dry + self.feedback * delayed);

            *sample = dry * (1.0 - self.mix) + delayed * self.mix;
        }
    }

    fn reset(&mut self) {
        self.line.clear();
        self.lfo.reset();
    }
}

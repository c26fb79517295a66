//! Ladder filter - four saturating one-pole stages with resonance feedback
//!
//! A Moog-style ladder: the input is driven into a `tanh` saturator, run
//! through four cascaded one-pole lowpass stages, and the last stage is fed
//! back (also saturated) for resonance. The output is a weighted sum of the
//! stage taps, which gives the 12/24 dB low-, high- and bandpass modes.
//!
//! The same structure doubles as the chain's overdrive: with the cutoff
//! parked at the top of the audio band, the drive control becomes a
//! saturation amount and the filtering is mostly transparent.

use crate::effect::{Effect, EffectInfo};
use crate::params::ParamId;
use crate::types::{Sample, SAMPLE_RATE};

/// Output scaling applied to every mode's tap weights
const OUTPUT_GAIN: f32 = 1.2;
/// Cutoff used when the ladder acts as an overdrive
const OVERDRIVE_CUTOFF_HZ: f32 = 20000.0;

/// Filter response, in parameter choice-index order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LadderMode {
    #[default]
    Lpf12,
    Hpf12,
    Bpf12,
    Lpf24,
    Hpf24,
    Bpf24,
}

impl LadderMode {
    pub const ALL: [LadderMode; 6] = [
        LadderMode::Lpf12,
        LadderMode::Hpf12,
        LadderMode::Bpf12,
        LadderMode::Lpf24,
        LadderMode::Hpf24,
        LadderMode::Bpf24,
    ];

    /// Mode for a choice index; out-of-range indices clamp to the last mode
    pub fn from_index(idx: usize) -> Self {
        Self::ALL[idx.min(Self::ALL.len() - 1)]
    }

    /// Tap weights and feedback compensation
    fn taps(self) -> ([f32; 5], f32) {
        match self {
            LadderMode::Lpf12 => ([0.0, 0.0, 1.0, 0.0, 0.0], 0.5),
            LadderMode::Hpf12 => ([1.0, -2.0, 1.0, 0.0, 0.0], 0.0),
            LadderMode::Bpf12 => ([0.0, 0.0, -1.0, 1.0, 0.0], 0.5),
            LadderMode::Lpf24 => ([0.0, 0.0, 0.0, 0.0, 1.0], 0.5),
            LadderMode::Hpf24 => ([1.0, -4.0, 6.0, -4.0, 1.0], 0.0),
            LadderMode::Bpf24 => ([0.0, 0.0, 1.0, -2.0, 1.0], 0.5),
        }
    }
}

/// Saturating ladder filter
pub struct LadderFilter {
    info: EffectInfo,
    sample_rate: f32,
    mode: LadderMode,
    taps: [f32; 5],
    comp: f32,
    state: [f32; 5],
    cutoff_hz: f32,
    cutoff_transform: f32,
    resonance: f32,
    scaled_resonance: f32,
    drive: f32,
    drive2: f32,
    gain: f32,
    gain2: f32,
}

impl LadderFilter {
    /// Ladder configured as the chain's filter stage
    pub fn new() -> Self {
        let info = EffectInfo::new("Ladder Filter", "Filter")
            .with_param(ParamId::LadderFilterMode)
            .with_param(ParamId::LadderFilterCutoff)
            .with_param(ParamId::LadderFilterResonance)
            .with_param(ParamId::LadderFilterDrive)
            .with_bypass(ParamId::LadderFilterBypass);
        Self::with_info(info, 20000.0)
    }

    /// Ladder configured as the chain's overdrive stage
    pub fn overdrive() -> Self {
        let info = EffectInfo::new("Overdrive", "Distortion")
            .with_param(ParamId::OverdriveSaturation)
            .with_bypass(ParamId::OverdriveBypass);
        Self::with_info(info, OVERDRIVE_CUTOFF_HZ)
    }

    fn with_info(info: EffectInfo, cutoff_hz: f32) -> Self {
        let (taps, comp) = LadderMode::Lpf12.taps();
        let mut filter = Self {
            info,
            sample_rate: SAMPLE_RATE as f32,
            mode: LadderMode::Lpf12,
            taps: taps.map(|a| a * OUTPUT_GAIN),
            comp,
            state: [0.0; 5],
            cutoff_hz,
            cutoff_transform: 0.0,
            resonance: 0.0,
            scaled_resonance: 0.0,
            drive: 1.0,
            drive2: 1.0,
            gain: 1.0,
            gain2: 1.0,
        };
        filter.update_cutoff();
        filter.set_resonance(0.0);
        filter.set_drive(1.0);
        filter
    }

    pub fn mode(&self) -> LadderMode {
        self.mode
    }

    /// Change the response by swapping tap weights; the stage memory is
    /// kept so automating the mode doesn't click
    pub fn set_mode(&mut self, mode: LadderMode) {
        if mode == self.mode {
            return;
        }
        let (taps, comp) = mode.taps();
        self.taps = taps.map(|a| a * OUTPUT_GAIN);
        self.comp = comp;
        self.mode = mode;
    }

    pub fn set_cutoff(&mut self, hz: f32) {
        self.cutoff_hz = hz.max(1.0);
        self.update_cutoff();
    }

    /// Resonance (0..1)
    pub fn set_resonance(&mut self, resonance: f32) {
        self.resonance = resonance.clamp(0.0, 1.0);
        self.scaled_resonance = 0.1 + 0.9 * self.resonance;
    }

    /// Input drive (>= 1)
    pub fn set_drive(&mut self, drive: f32) {
        self.drive = drive.max(1.0);
        self.gain = self.drive.powf(-2.642) * 0.6103 + 0.3903;
        self.drive2 = self.drive * 0.04 + 0.96;
        self.gain2 = self.drive2.powf(-2.642) * 0.6103 + 0.3903;
    }

    fn update_cutoff(&mut self) {
        let hz = self.cutoff_hz.min(self.sample_rate * 0.49);
        self.cutoff_transform = (-2.0 * std::f32::consts::PI * hz / self.sample_rate).exp();
    }

    #[inline]
    fn process_sample(&mut self, input: f32) -> f32 {
        let a1 = self.cutoff_transform;
        let g = 1.0 - a1;
        let b0 = g * 0.769_230_77;
        let b1 = g * 0.230_769_23;
        let s = &mut self.state;

        let dx = self.gain * (self.drive * input).tanh();
        let a = dx + self.scaled_resonance * -4.0 * (self.gain2 * (self.drive2 * s[4]).tanh() - dx * self.comp);
        let b = b1 * s[0] + a1 * s[1] + b0 * a;
        let c = b1 * s[1] + a1 * s[2] + b0 * b;
        let d = b1 * s[2] + a1 * s[3] + b0 * c;
        let e = b1 * s[3] + a1 * s[4] + b0 * d;
        *s = [a, b, c, d, e];

        let t = &self.taps;
        a * t[0] + b * t[1] + c * t[2] + d * t[3] + e * t[4]
    }
}

impl Default for LadderFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for LadderFilter {
    fn info(&self) -> &EffectInfo {
        &self.info
    }

    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.update_cutoff();
        self.reset();
    }

    fn process(&mut self, block: &mut [Sample]) {
        for sample in block.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    fn reset(&mut self) {
        self.state = [0.0; 5];
    }
}

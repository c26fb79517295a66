//! General filter - RBJ cookbook biquad (peak, bandpass, notch, allpass)
//!
//! Coefficients are only recomputed when the settings actually change:
//! the module remembers the last [`GeneralFilterSettings`] it was built for
//! and starts from an impossible value so the first update always lands.

use crate::effect::{Effect, EffectInfo};
use crate::params::ParamId;
use crate::types::{Sample, SAMPLE_RATE};

/// Filter response, in parameter choice-index order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeneralFilterMode {
    #[default]
    Peak,
    Bandpass,
    Notch,
    Allpass,
}

impl GeneralFilterMode {
    pub const ALL: [GeneralFilterMode; 4] = [
        GeneralFilterMode::Peak,
        GeneralFilterMode::Bandpass,
        GeneralFilterMode::Notch,
        GeneralFilterMode::Allpass,
    ];

    /// Mode for a choice index; out-of-range indices clamp to the last mode
    pub fn from_index(idx: usize) -> Self {
        Self::ALL[idx.min(Self::ALL.len() - 1)]
    }
}

/// Everything the coefficients depend on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneralFilterSettings {
    pub mode: GeneralFilterMode,
    pub freq: f32,
    pub quality: f32,
    pub gain_db: f32,
}

impl GeneralFilterSettings {
    /// Never produced by the parameter layout (gain is limited to ±24 dB)
    const UNSET: Self = Self {
        mode: GeneralFilterMode::Peak,
        freq: 0.0,
        quality: 0.0,
        gain_db: -100.0,
    };
}

/// Biquad filter coefficients (normalised, a0 = 1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl BiquadCoeffs {
    /// Build coefficients for any mode
    pub fn for_settings(settings: &GeneralFilterSettings, sample_rate: f32) -> Self {
        let freq = settings.freq.clamp(1.0, sample_rate * 0.49);
        let q = settings.quality.max(0.01);
        match settings.mode {
            GeneralFilterMode::Peak => Self::peaking(freq, settings.gain_db, q, sample_rate),
            GeneralFilterMode::Bandpass => Self::bandpass(freq, q, sample_rate),
            GeneralFilterMode::Notch => Self::notch(freq, q, sample_rate),
            GeneralFilterMode::Allpass => Self::allpass(freq, q, sample_rate),
        }
    }

    /// Peaking EQ
    pub fn peaking(freq: f32, gain_db: f32, q: f32, sample_rate: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let (cos_w0, alpha) = Self::prewarp(freq, q, sample_rate);

        let a0 = 1.0 + alpha / a;
        Self {
            b0: (1.0 + alpha * a) / a0,
            b1: (-2.0 * cos_w0) / a0,
            b2: (1.0 - alpha * a) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha / a) / a0,
        }
    }

    /// Bandpass, 0 dB peak gain
    pub fn bandpass(freq: f32, q: f32, sample_rate: f32) -> Self {
        let (cos_w0, alpha) = Self::prewarp(freq, q, sample_rate);
        let a0 = 1.0 + alpha;
        Self {
            b0: alpha / a0,
            b1: 0.0,
            b2: -alpha / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    pub fn notch(freq: f32, q: f32, sample_rate: f32) -> Self {
        let (cos_w0, alpha) = Self::prewarp(freq, q, sample_rate);
        let a0 = 1.0 + alpha;
        Self {
            b0: 1.0 / a0,
            b1: (-2.0 * cos_w0) / a0,
            b2: 1.0 / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    pub fn allpass(freq: f32, q: f32, sample_rate: f32) -> Self {
        let (cos_w0, alpha) = Self::prewarp(freq, q, sample_rate);
        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 - alpha) / a0,
            b1: (-2.0 * cos_w0) / a0,
            b2: (1.0 + alpha) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// Passthrough (unity gain, no filtering)
    pub fn passthrough() -> Self {
        Self { b0: 1.0, b1: 0.0, b2: 0.0, a1: 0.0, a2: 0.0 }
    }

    #[inline]
    fn prewarp(freq: f32, q: f32, sample_rate: f32) -> (f32, f32) {
        let w0 = 2.0 * std::f32::consts::PI * freq / sample_rate;
        (w0.cos(), w0.sin() / (2.0 * q))
    }
}

/// Single-channel biquad with change-gated coefficient updates
pub struct GeneralFilter {
    info: EffectInfo,
    sample_rate: f32,
    coeffs: BiquadCoeffs,
    settings: GeneralFilterSettings,
    z1: f32,
    z2: f32,
    coefficient_updates: u64,
}

impl GeneralFilter {
    pub fn new() -> Self {
        let info = EffectInfo::new("General Filter", "Filter")
            .with_param(ParamId::GeneralFilterMode)
            .with_param(ParamId::GeneralFilterFreq)
            .with_param(ParamId::GeneralFilterQuality)
            .with_param(ParamId::GeneralFilterGain)
            .with_bypass(ParamId::GeneralFilterBypass);
        Self {
            info,
            sample_rate: SAMPLE_RATE as f32,
            coeffs: BiquadCoeffs::passthrough(),
            settings: GeneralFilterSettings::UNSET,
            z1: 0.0,
            z2: 0.0,
            coefficient_updates: 0,
        }
    }

    /// Apply settings; coefficients are rebuilt only if something changed.
    /// Returns `true` when a rebuild happened.
    pub fn update(&mut self, settings: GeneralFilterSettings) -> bool {
        if settings == self.settings {
            return false;
        }
        self.settings = settings;
        self.coeffs = BiquadCoeffs::for_settings(&settings, self.sample_rate);
        self.coefficient_updates += 1;
        true
    }

    /// Forget the cached settings so the next `update` rebuilds
    pub fn invalidate(&mut self) {
        self.settings = GeneralFilterSettings::UNSET;
    }

    /// Number of coefficient rebuilds since construction
    pub fn coefficient_updates(&self) -> u64 {
        self.coefficient_updates
    }

    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }
}

impl Default for GeneralFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for GeneralFilter {
    fn info(&self) -> &EffectInfo {
        &self.info
    }

    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.invalidate();
        self.reset();
    }

    fn process(&mut self, block: &mut [Sample]) {
        let c = self.coeffs;
        for sample in block.iter_mut() {
            // Transposed direct form II
            let x = *sample;
            let y = c.b0 * x + self.z1;
            self.z1 = c.b1 * x - c.a1 * y + self.z2;
            self.z2 = c.b2 * x - c.a2 * y;
            *sample = y;
        }
    }

    fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::native::sine;
    use crate::types::rms;

    fn settings(mode: GeneralFilterMode, freq: f32, quality: f32, gain_db: f32) -> GeneralFilterSettings {
        GeneralFilterSettings { mode, freq, quality, gain_db }
    }

    fn gain_at(filter: &mut GeneralFilter, freq: f32) -> f32 {
        filter.reset();
        let input = sine(freq, 48000.0, 9600);
        let mut block = input.clone();
        filter.process(&mut block);
        rms(&block[4800..]) / rms(&input[4800..])
    }

    #[test]
    fn test_update_is_change_gated() {
        let mut filter = GeneralFilter::new();
        filter.prepare(48000.0, 64);
        let s = settings(GeneralFilterMode::Peak, 750.0, 1.0, 0.0);
        assert!(filter.update(s));
        assert!(!filter.update(s));
        assert!(!filter.update(s));
        assert_eq!(filter.coefficient_updates(), 1);

        assert!(filter.update(settings(GeneralFilterMode::Peak, 750.0, 1.0, 3.0)));
        assert!(filter.update(settings(GeneralFilterMode::Notch, 750.0, 1.0, 3.0)));
        assert_eq!(filter.coefficient_updates(), 3);
    }

    #[test]
    fn test_prepare_forces_rebuild() {
        let mut filter = GeneralFilter::new();
        filter.prepare(48000.0, 64);
        let s = settings(GeneralFilterMode::Peak, 750.0, 1.0, 0.0);
        filter.update(s);
        filter.prepare(44100.0, 64);
        assert!(filter.update(s));
    }

    #[test]
    fn test_flat_peak_is_passthrough() {
        let mut filter = GeneralFilter::new();
        filter.prepare(48000.0, 64);
        filter.update(settings(GeneralFilterMode::Peak, 750.0, 1.0, 0.0));
        assert!((gain_at(&mut filter, 750.0) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_peak_boost() {
        let mut filter = GeneralFilter::new();
        filter.prepare(48000.0, 64);
        filter.update(settings(GeneralFilterMode::Peak, 1000.0, 1.0, 12.0));
        let g = gain_at(&mut filter, 1000.0);
        assert!((g - 3.98).abs() < 0.2, "gain {g}");
    }

    #[test]
    fn test_notch_and_bandpass() {
        let mut filter = GeneralFilter::new();
        filter.prepare(48000.0, 64);
        filter.update(settings(GeneralFilterMode::Notch, 1000.0, 2.0, 0.0));
        assert!(gain_at(&mut filter, 1000.0) < 0.05);
        assert!(gain_at(&mut filter, 100.0) > 0.9);

        filter.update(settings(GeneralFilterMode::Bandpass, 1000.0, 2.0, 0.0));
        assert!(gain_at(&mut filter, 1000.0) > 0.95);
        assert!(gain_at(&mut filter, 100.0) < 0.2);
    }

    #[test]
    fn test_allpass_keeps_level() {
        let mut filter = GeneralFilter::new();
        filter.prepare(48000.0, 64);
        filter.update(settings(GeneralFilterMode::Allpass, 1000.0, 1.0, 0.0));
        for freq in [100.0, 1000.0, 5000.0] {
            assert!((gain_at(&mut filter, freq) - 1.0).abs() < 0.02);
        }
    }

    #[test]
    fn test_mode_from_index() {
        assert_eq!(GeneralFilterMode::from_index(1), GeneralFilterMode::Bandpass);
        assert_eq!(GeneralFilterMode::from_index(42), GeneralFilterMode::Allpass);
    }
}

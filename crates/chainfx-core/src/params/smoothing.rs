//! Parameter smoothing (de-zippering)
//!
//! A [`Smoother`] ramps from its present value to a new target over a fixed
//! number of samples and lands on the target exactly when the ramp ends.
//! Retargeting mid-ramp starts a fresh ramp from wherever the value is now,
//! so the output never jumps.
//!
//! Because the ramp is a closed-form function of the remaining step count,
//! [`Smoother::skip`] advances any number of samples in O(1). The block
//! scheduler uses that to move every chain smoother by a whole sub-block at
//! once instead of ticking per sample.

use super::{ParamId, ParamStore};

/// Steepness of the exponential ramp (time constants per ramp)
const EXP_CURVE: f32 = 5.0;

/// Ramp shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingStyle {
    /// Straight line from start to target
    Linear,
    /// Exponential approach, normalised to reach the target exactly
    #[default]
    Exponential,
}

impl SmoothingStyle {
    /// Remaining distance (1 → 0) at ramp progress `t` (0 → 1)
    #[inline]
    fn remaining(self, t: f32) -> f32 {
        match self {
            SmoothingStyle::Linear => 1.0 - t,
            SmoothingStyle::Exponential => {
                let floor = (-EXP_CURVE).exp();
                ((-EXP_CURVE * t).exp() - floor) / (1.0 - floor)
            }
        }
    }
}

/// Single-value ramp
#[derive(Debug, Clone)]
pub struct Smoother {
    style: SmoothingStyle,
    ramp_samples: u32,
    steps_remaining: u32,
    start: f32,
    current: f32,
    target: f32,
}

impl Smoother {
    /// Create a smoother with no ramp (call [`Smoother::reset`] before use)
    pub fn new(style: SmoothingStyle) -> Self {
        Self {
            style,
            ramp_samples: 0,
            steps_remaining: 0,
            start: 0.0,
            current: 0.0,
            target: 0.0,
        }
    }

    /// Set the ramp length from a sample rate and duration
    ///
    /// Any ramp in progress is finished immediately.
    pub fn reset(&mut self, sample_rate: f32, ramp_seconds: f32) {
        self.ramp_samples = (sample_rate.max(0.0) * ramp_seconds.max(0.0)).floor() as u32;
        self.set_current_and_target(self.target);
    }

    /// Jump straight to a value with no ramp
    pub fn set_current_and_target(&mut self, value: f32) {
        self.start = value;
        self.current = value;
        self.target = value;
        self.steps_remaining = 0;
    }

    /// Start ramping towards a new target
    ///
    /// Setting the target it already has leaves a running ramp untouched.
    pub fn set_target(&mut self, target: f32) {
        if target == self.target {
            return;
        }
        self.target = target;
        if self.ramp_samples == 0 {
            self.set_current_and_target(target);
            return;
        }
        self.start = self.current;
        self.steps_remaining = self.ramp_samples;
    }

    /// Advance by `samples` and return the new current value
    pub fn skip(&mut self, samples: usize) -> f32 {
        if samples == 0 || self.steps_remaining == 0 {
            return self.current;
        }
        let samples = u32::try_from(samples).unwrap_or(u32::MAX);
        self.steps_remaining = self.steps_remaining.saturating_sub(samples);
        if self.steps_remaining == 0 {
            self.current = self.target;
        } else {
            let t = 1.0 - self.steps_remaining as f32 / self.ramp_samples as f32;
            self.current = self.target + (self.start - self.target) * self.style.remaining(t);
        }
        self.current
    }

    /// Advance one sample
    #[inline]
    pub fn next(&mut self) -> f32 {
        self.skip(1)
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn is_smoothing(&self) -> bool {
        self.steps_remaining > 0
    }

    pub fn ramp_samples(&self) -> u32 {
        self.ramp_samples
    }
}

/// Number of smoothed parameters
pub const NUM_SMOOTHED: usize = 19;

/// Parameters that get a smoother
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Smoothed {
    PhaserRate,
    PhaserDepth,
    PhaserCenterFreq,
    PhaserFeedback,
    PhaserMix,
    ChorusRate,
    ChorusDepth,
    ChorusCenterDelay,
    ChorusFeedback,
    ChorusMix,
    OverdriveSaturation,
    LadderFilterCutoff,
    LadderFilterResonance,
    LadderFilterDrive,
    GeneralFilterFreq,
    GeneralFilterQuality,
    GeneralFilterGain,
    InputGain,
    OutputGain,
}

impl Smoothed {
    pub const ALL: [Smoothed; NUM_SMOOTHED] = [
        Smoothed::PhaserRate,
        Smoothed::PhaserDepth,
        Smoothed::PhaserCenterFreq,
        Smoothed::PhaserFeedback,
        Smoothed::PhaserMix,
        Smoothed::ChorusRate,
        Smoothed::ChorusDepth,
        Smoothed::ChorusCenterDelay,
        Smoothed::ChorusFeedback,
        Smoothed::ChorusMix,
        Smoothed::OverdriveSaturation,
        Smoothed::LadderFilterCutoff,
        Smoothed::LadderFilterResonance,
        Smoothed::LadderFilterDrive,
        Smoothed::GeneralFilterFreq,
        Smoothed::GeneralFilterQuality,
        Smoothed::GeneralFilterGain,
        Smoothed::InputGain,
        Smoothed::OutputGain,
    ];

    /// Backing parameter
    pub fn param(self) -> ParamId {
        match self {
            Smoothed::PhaserRate => ParamId::PhaserRate,
            Smoothed::PhaserDepth => ParamId::PhaserDepth,
            Smoothed::PhaserCenterFreq => ParamId::PhaserCenterFreq,
            Smoothed::PhaserFeedback => ParamId::PhaserFeedback,
            Smoothed::PhaserMix => ParamId::PhaserMix,
            Smoothed::ChorusRate => ParamId::ChorusRate,
            Smoothed::ChorusDepth => ParamId::ChorusDepth,
            Smoothed::ChorusCenterDelay => ParamId::ChorusCenterDelay,
            Smoothed::ChorusFeedback => ParamId::ChorusFeedback,
            Smoothed::ChorusMix => ParamId::ChorusMix,
            Smoothed::OverdriveSaturation => ParamId::OverdriveSaturation,
            Smoothed::LadderFilterCutoff => ParamId::LadderFilterCutoff,
            Smoothed::LadderFilterResonance => ParamId::LadderFilterResonance,
            Smoothed::LadderFilterDrive => ParamId::LadderFilterDrive,
            Smoothed::GeneralFilterFreq => ParamId::GeneralFilterFreq,
            Smoothed::GeneralFilterQuality => ParamId::GeneralFilterQuality,
            Smoothed::GeneralFilterGain => ParamId::GeneralFilterGain,
            Smoothed::InputGain => ParamId::InputGain,
            Smoothed::OutputGain => ParamId::OutputGain,
        }
    }

    /// Chain parameters advance per sub-block; the gain stages tick their
    /// own smoothers per sample.
    #[inline]
    pub fn is_chain_param(self) -> bool {
        !matches!(self, Smoothed::InputGain | Smoothed::OutputGain)
    }
}

/// One smoother per continuous parameter, owned by the audio thread
#[derive(Debug, Clone)]
pub struct SmoothedParamBank {
    smoothers: [Smoother; NUM_SMOOTHED],
}

impl SmoothedParamBank {
    pub fn new(style: SmoothingStyle) -> Self {
        Self {
            smoothers: std::array::from_fn(|_| Smoother::new(style)),
        }
    }

    /// Reset every ramp length and snap to the live values
    ///
    /// Called from `prepare`, never from the audio callback.
    pub fn initialize(&mut self, sample_rate: f32, ramp_seconds: f32, params: &ParamStore) {
        for id in Smoothed::ALL {
            let smoother = &mut self.smoothers[id as usize];
            smoother.reset(sample_rate, ramp_seconds);
            smoother.set_current_and_target(params.get(id.param()));
        }
    }

    /// Point every chain smoother at its live value, then advance it by
    /// `skip_samples`
    pub fn retarget(&mut self, skip_samples: usize, params: &ParamStore) {
        for id in Smoothed::ALL {
            if !id.is_chain_param() {
                continue;
            }
            let smoother = &mut self.smoothers[id as usize];
            smoother.set_target(params.get(id.param()));
            smoother.skip(skip_samples);
        }
    }

    /// Present value
    #[inline]
    pub fn current(&self, id: Smoothed) -> f32 {
        self.smoothers[id as usize].current()
    }

    #[inline]
    pub fn smoother(&self, id: Smoothed) -> &Smoother {
        &self.smoothers[id as usize]
    }

    #[inline]
    pub fn smoother_mut(&mut self, id: Smoothed) -> &mut Smoother {
        &mut self.smoothers[id as usize]
    }

    /// True while any smoother is still ramping
    pub fn is_smoothing(&self) -> bool {
        self.smoothers.iter().any(Smoother::is_smoothing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramped(style: SmoothingStyle) -> Smoother {
        let mut s = Smoother::new(style);
        s.reset(1000.0, 0.1); // 100-sample ramp
        s.set_current_and_target(0.0);
        s
    }

    #[test]
    fn test_reaches_target_after_full_ramp() {
        for style in [SmoothingStyle::Linear, SmoothingStyle::Exponential] {
            let mut s = ramped(style);
            assert_eq!(s.ramp_samples(), 100);
            s.set_target(1.0);
            for _ in 0..99 {
                s.next();
                assert!(s.current() < 1.0);
            }
            assert_eq!(s.next(), 1.0);
            assert!(!s.is_smoothing());
        }
    }

    #[test]
    fn test_skip_whole_ramp() {
        for style in [SmoothingStyle::Linear, SmoothingStyle::Exponential] {
            let mut s = ramped(style);
            s.set_target(-3.0);
            assert_eq!(s.skip(100), -3.0);
            let mut t = ramped(style);
            t.set_target(-3.0);
            assert_eq!(t.skip(10_000), -3.0);
        }
    }

    #[test]
    fn test_skip_zero_is_noop() {
        let mut s = ramped(SmoothingStyle::Exponential);
        s.set_target(1.0);
        s.skip(37);
        let before = s.current();
        assert_eq!(s.skip(0), before);
        assert_eq!(s.current(), before);
    }

    #[test]
    fn test_skip_matches_per_sample() {
        for style in [SmoothingStyle::Linear, SmoothingStyle::Exponential] {
            let mut a = ramped(style);
            let mut b = ramped(style);
            a.set_target(2.0);
            b.set_target(2.0);
            a.skip(64);
            for _ in 0..64 {
                b.next();
            }
            assert!((a.current() - b.current()).abs() < 1e-5);
        }
    }

    #[test]
    fn test_monotonic_towards_target() {
        for style in [SmoothingStyle::Linear, SmoothingStyle::Exponential] {
            let mut s = ramped(style);
            s.set_target(1.0);
            let mut last = s.current();
            for _ in 0..100 {
                let v = s.next();
                assert!(v >= last);
                last = v;
            }
        }
    }

    #[test]
    fn test_retarget_mid_ramp_is_continuous() {
        let mut s = ramped(SmoothingStyle::Linear);
        s.set_target(1.0);
        s.skip(50);
        let mid = s.current();
        assert!((mid - 0.5).abs() < 1e-5);
        s.set_target(0.0);
        // First step of the new ramp moves only a little
        let next = s.next();
        assert!((next - mid).abs() < 0.01);
        assert_eq!(s.skip(100), 0.0);
    }

    #[test]
    fn test_same_target_keeps_ramp() {
        let mut s = ramped(SmoothingStyle::Linear);
        s.set_target(1.0);
        s.skip(50);
        s.set_target(1.0);
        assert_eq!(s.skip(50), 1.0);
    }

    #[test]
    fn test_zero_length_ramp_jumps() {
        let mut s = Smoother::new(SmoothingStyle::Exponential);
        s.reset(48000.0, 0.0);
        s.set_target(0.7);
        assert_eq!(s.current(), 0.7);
        assert!(!s.is_smoothing());
    }

    #[test]
    fn test_bank_initialize_snaps_to_live_values() {
        let params = ParamStore::new();
        params.set(ParamId::ChorusCenterDelay, 20.0);
        let mut bank = SmoothedParamBank::new(SmoothingStyle::Exponential);
        bank.initialize(48000.0, 0.05, &params);
        assert!((bank.current(Smoothed::ChorusCenterDelay) - 20.0).abs() < 1e-4);
        assert_eq!(bank.current(Smoothed::LadderFilterCutoff), 20000.0);
        assert!(!bank.is_smoothing());
    }

    #[test]
    fn test_bank_retarget_advances_chain_params_only() {
        let params = ParamStore::new();
        let mut bank = SmoothedParamBank::new(SmoothingStyle::Linear);
        bank.initialize(1000.0, 0.1, &params);

        params.set(ParamId::PhaserMix, 1.0);
        params.set(ParamId::InputGain, 6.0);
        bank.retarget(50, &params);
        assert!((bank.current(Smoothed::PhaserMix) - 0.5).abs() < 1e-5);
        // Gain smoothers belong to the gain stages
        assert_eq!(bank.smoother(Smoothed::InputGain).target(), 0.0);

        bank.retarget(50, &params);
        assert_eq!(bank.current(Smoothed::PhaserMix), 1.0);
    }

    #[test]
    fn test_smoothed_params_map_to_float_params() {
        for id in Smoothed::ALL {
            assert!(matches!(id.param().spec().kind, super::super::ParamKind::Float { .. }));
        }
        assert_eq!(Smoothed::ALL.iter().filter(|s| s.is_chain_param()).count(), 17);
    }
}

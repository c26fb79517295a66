//! Host-automatable parameters
//!
//! The layout is declared once as [`PARAM_LAYOUT`]: every parameter's
//! persisted name, kind, range and default. Live values sit in a
//! [`ParamStore`] shared between the control thread (writer) and the audio
//! thread (reader). Continuous parameters are de-zippered on the audio
//! thread by a [`SmoothedParamBank`].

mod smoothing;
mod store;

pub use smoothing::{Smoothed, SmoothedParamBank, Smoother, SmoothingStyle, NUM_SMOOTHED};
pub use store::ParamStore;

/// Number of parameters in the layout
pub const NUM_PARAMS: usize = 27;

/// Ladder filter modes, in choice-index order
pub const LADDER_FILTER_MODES: [&str; 6] = ["LPF12", "HPF12", "BPF12", "LPF24", "HPF24", "BPF24"];

/// General filter modes, in choice-index order
pub const GENERAL_FILTER_MODES: [&str; 4] = ["Peak", "bandpass", "notch", "allpass"];

/// Parameter identifiers
///
/// The discriminant is the index into [`PARAM_LAYOUT`] and the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum ParamId {
    // ─────────────────────────────────────────────────────────────
    // Phaser
    // ─────────────────────────────────────────────────────────────
    PhaserRate,
    PhaserDepth,
    PhaserCenterFreq,
    PhaserFeedback,
    PhaserMix,

    // ─────────────────────────────────────────────────────────────
    // Chorus
    // ─────────────────────────────────────────────────────────────
    ChorusRate,
    ChorusDepth,
    ChorusCenterDelay,
    ChorusFeedback,
    ChorusMix,

    // ─────────────────────────────────────────────────────────────
    // Overdrive / Ladder Filter
    // ─────────────────────────────────────────────────────────────
    OverdriveSaturation,
    LadderFilterMode,
    LadderFilterCutoff,
    LadderFilterResonance,
    LadderFilterDrive,

    // ─────────────────────────────────────────────────────────────
    // General Filter
    // ─────────────────────────────────────────────────────────────
    GeneralFilterMode,
    GeneralFilterFreq,
    GeneralFilterQuality,
    GeneralFilterGain,

    // ─────────────────────────────────────────────────────────────
    // I/O gain
    // ─────────────────────────────────────────────────────────────
    InputGain,
    OutputGain,

    // ─────────────────────────────────────────────────────────────
    // Bypass switches
    // ─────────────────────────────────────────────────────────────
    PhaserBypass,
    ChorusBypass,
    OverdriveBypass,
    LadderFilterBypass,
    GeneralFilterBypass,

    // ─────────────────────────────────────────────────────────────
    // Editor state
    // ─────────────────────────────────────────────────────────────
    SelectedTab,
}

impl ParamId {
    /// All parameters in layout order
    pub const ALL: [ParamId; NUM_PARAMS] = [
        ParamId::PhaserRate,
        ParamId::PhaserDepth,
        ParamId::PhaserCenterFreq,
        ParamId::PhaserFeedback,
        ParamId::PhaserMix,
        ParamId::ChorusRate,
        ParamId::ChorusDepth,
        ParamId::ChorusCenterDelay,
        ParamId::ChorusFeedback,
        ParamId::ChorusMix,
        ParamId::OverdriveSaturation,
        ParamId::LadderFilterMode,
        ParamId::LadderFilterCutoff,
        ParamId::LadderFilterResonance,
        ParamId::LadderFilterDrive,
        ParamId::GeneralFilterMode,
        ParamId::GeneralFilterFreq,
        ParamId::GeneralFilterQuality,
        ParamId::GeneralFilterGain,
        ParamId::InputGain,
        ParamId::OutputGain,
        ParamId::PhaserBypass,
        ParamId::ChorusBypass,
        ParamId::OverdriveBypass,
        ParamId::LadderFilterBypass,
        ParamId::GeneralFilterBypass,
        ParamId::SelectedTab,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Layout entry for this parameter
    #[inline]
    pub fn spec(self) -> &'static ParamSpec {
        &PARAM_LAYOUT[self.index()]
    }

    /// Persisted name (also the host-visible parameter ID)
    #[inline]
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Look up a parameter by its persisted name (exact match)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }

    /// Look up a parameter by name, ignoring case and spacing
    pub fn find(name: &str) -> Option<Self> {
        let key = squash(name);
        Self::ALL.into_iter().find(|id| squash(id.name()) == key)
    }
}

fn squash(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Value range of a float parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatRange {
    pub min: f32,
    pub max: f32,
    /// Snapping interval (0 = continuous)
    pub step: f32,
    /// Normalized mapping exponent (1 = linear)
    pub skew: f32,
}

impl FloatRange {
    pub const fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step, skew: 1.0 }
    }

    pub const fn with_skew(mut self, skew: f32) -> Self {
        self.skew = skew;
        self
    }

    /// Clamp into range and snap to the step grid
    pub fn snap(&self, value: f32) -> f32 {
        if !value.is_finite() {
            return self.min;
        }
        let mut v = value.clamp(self.min, self.max);
        if self.step > 0.0 {
            v = self.min + ((v - self.min) / self.step).round() * self.step;
            v = v.clamp(self.min, self.max);
        }
        v
    }

    /// Plain value → 0..1
    pub fn to_normalized(&self, value: f32) -> f32 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        let proportion = ((value - self.min) / span).clamp(0.0, 1.0);
        if self.skew == 1.0 {
            proportion
        } else {
            proportion.powf(self.skew)
        }
    }

    /// 0..1 → plain value (snapped)
    pub fn from_normalized(&self, normalized: f32) -> f32 {
        let mut proportion = normalized.clamp(0.0, 1.0);
        if self.skew != 1.0 && proportion > 0.0 {
            proportion = (proportion.ln() / self.skew).exp();
        }
        self.snap(self.min + (self.max - self.min) * proportion)
    }
}

/// Parameter kind, fixed at layout declaration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    Float {
        range: FloatRange,
        default: f32,
        unit: &'static str,
    },
    Choice {
        choices: &'static [&'static str],
        default: usize,
    },
    Bool {
        default: bool,
    },
    Int {
        min: i32,
        max: i32,
        default: i32,
    },
}

impl ParamKind {
    /// Default as a plain stored value
    pub fn default_value(&self) -> f32 {
        match *self {
            ParamKind::Float { default, .. } => default,
            ParamKind::Choice { default, .. } => default as f32,
            ParamKind::Bool { default } => {
                if default {
                    1.0
                } else {
                    0.0
                }
            }
            ParamKind::Int { default, .. } => default as f32,
        }
    }

    /// Coerce any plain value into a legal stored value
    pub fn sanitize(&self, value: f32) -> f32 {
        let value = if value.is_finite() { value } else { self.default_value() };
        match *self {
            ParamKind::Float { range, .. } => range.snap(value),
            ParamKind::Choice { choices, .. } => {
                let last = choices.len().saturating_sub(1) as f32;
                value.round().clamp(0.0, last)
            }
            ParamKind::Bool { .. } => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            ParamKind::Int { min, max, .. } => value.round().clamp(min as f32, max as f32),
        }
    }

    /// Plain value → 0..1
    pub fn to_normalized(&self, value: f32) -> f32 {
        match *self {
            ParamKind::Float { range, .. } => range.to_normalized(value),
            ParamKind::Choice { choices, .. } => {
                let last = choices.len().saturating_sub(1);
                if last == 0 {
                    0.0
                } else {
                    value / last as f32
                }
            }
            ParamKind::Bool { .. } => value,
            ParamKind::Int { min, max, .. } => {
                if max <= min {
                    0.0
                } else {
                    (value - min as f32) / (max - min) as f32
                }
            }
        }
    }

    /// 0..1 → plain value
    pub fn from_normalized(&self, normalized: f32) -> f32 {
        let n = normalized.clamp(0.0, 1.0);
        match *self {
            ParamKind::Float { range, .. } => range.from_normalized(n),
            ParamKind::Choice { choices, .. } => {
                self.sanitize(n * choices.len().saturating_sub(1) as f32)
            }
            ParamKind::Bool { .. } => self.sanitize(n),
            ParamKind::Int { min, max, .. } => {
                self.sanitize(min as f32 + n * (max - min) as f32)
            }
        }
    }

    /// Human-readable value with unit or choice label
    pub fn format(&self, value: f32) -> String {
        match *self {
            ParamKind::Float { unit: "%", .. } => format!("{:.0} %", value * 100.0),
            ParamKind::Float { unit, range, .. } => {
                let precision = if range.step >= 1.0 { 0 } else { 2 };
                if unit.is_empty() {
                    format!("{:.*}", precision, value)
                } else {
                    format!("{:.*} {}", precision, value, unit)
                }
            }
            ParamKind::Choice { choices, .. } => {
                let idx = self.sanitize(value) as usize;
                choices.get(idx).copied().unwrap_or("?").to_string()
            }
            ParamKind::Bool { .. } => {
                if value >= 0.5 {
                    "on".to_string()
                } else {
                    "off".to_string()
                }
            }
            ParamKind::Int { .. } => format!("{}", value.round() as i32),
        }
    }
}

/// One layout entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub id: ParamId,
    pub name: &'static str,
    pub kind: ParamKind,
}

const fn float(id: ParamId, name: &'static str, range: FloatRange, default: f32, unit: &'static str) -> ParamSpec {
    ParamSpec {
        id,
        name,
        kind: ParamKind::Float { range, default, unit },
    }
}

const fn choice(id: ParamId, name: &'static str, choices: &'static [&'static str], default: usize) -> ParamSpec {
    ParamSpec {
        id,
        name,
        kind: ParamKind::Choice { choices, default },
    }
}

const fn boolean(id: ParamId, name: &'static str, default: bool) -> ParamSpec {
    ParamSpec {
        id,
        name,
        kind: ParamKind::Bool { default },
    }
}

/// Wet/dry mixes put most of the knob travel near fully wet
const MIX_RANGE: FloatRange = FloatRange::new(0.0, 1.0, 0.01).with_skew(30.0);

/// Full parameter layout, indexed by [`ParamId`]
pub const PARAM_LAYOUT: [ParamSpec; NUM_PARAMS] = [
    float(ParamId::PhaserRate, "Phaser RateHz", FloatRange::new(0.01, 2.0, 0.01), 0.2, "Hz"),
    float(ParamId::PhaserDepth, "Phaser Depth %", FloatRange::new(0.01, 1.0, 0.01), 0.05, "%"),
    float(
        ParamId::PhaserCenterFreq,
        "Phaser Center FreqHz",
        FloatRange::new(20.0, 20000.0, 1.0),
        1000.0,
        "Hz",
    ),
    float(ParamId::PhaserFeedback, "Phaser Feedback %", FloatRange::new(-1.0, 1.0, 0.01), 0.0, "%"),
    float(ParamId::PhaserMix, "Phaser Mix %", MIX_RANGE, 0.0, "%"),
    float(ParamId::ChorusRate, "Chorus RateHz", FloatRange::new(0.01, 100.0, 0.01), 0.2, "Hz"),
    float(ParamId::ChorusDepth, "Chorus Depth %", FloatRange::new(0.01, 1.0, 0.01), 0.05, "%"),
    float(ParamId::ChorusCenterDelay, "Chorus Center Delay Ms", FloatRange::new(1.0, 100.0, 0.1), 7.0, "ms"),
    float(ParamId::ChorusFeedback, "Chorus Feedback %", FloatRange::new(-1.0, 1.0, 0.01), 0.0, "%"),
    float(ParamId::ChorusMix, "Chorus Mix %", MIX_RANGE, 0.0, "%"),
    float(ParamId::OverdriveSaturation, "Overdrive Saturation", FloatRange::new(1.0, 100.0, 0.01), 1.0, ""),
    choice(ParamId::LadderFilterMode, "Ladder Filter Mode", &LADDER_FILTER_MODES, 0),
    float(
        ParamId::LadderFilterCutoff,
        "Ladder Filter Cutoff Hz",
        FloatRange::new(20.0, 20000.0, 0.1),
        20000.0,
        "Hz",
    ),
    float(ParamId::LadderFilterResonance, "Ladder Filter Resonance", FloatRange::new(0.0, 1.0, 0.01), 0.0, ""),
    float(ParamId::LadderFilterDrive, "Ladder Filter Drive", FloatRange::new(1.0, 100.0, 0.01), 1.0, ""),
    choice(ParamId::GeneralFilterMode, "General Filter Mode", &GENERAL_FILTER_MODES, 0),
    float(
        ParamId::GeneralFilterFreq,
        "General Filter Freq Hz",
        FloatRange::new(20.0, 20000.0, 1.0),
        750.0,
        "Hz",
    ),
    float(ParamId::GeneralFilterQuality, "General Filter Quality", FloatRange::new(0.1, 10.0, 0.05), 1.0, ""),
    float(ParamId::GeneralFilterGain, "General Filter Gain", FloatRange::new(-24.0, 24.0, 0.5), 0.0, "dB"),
    float(ParamId::InputGain, "Input Gain", FloatRange::new(-18.0, 18.0, 0.1), 0.0, "dB"),
    float(ParamId::OutputGain, "Output Gain", FloatRange::new(-18.0, 18.0, 0.1), 0.0, "dB"),
    boolean(ParamId::PhaserBypass, "Phaser Bypass", false),
    boolean(ParamId::ChorusBypass, "Chorus Bypass", false),
    boolean(ParamId::OverdriveBypass, "Overdrive Bypass", false),
    boolean(ParamId::LadderFilterBypass, "Ladder Filter Bypass", false),
    boolean(ParamId::GeneralFilterBypass, "General Filter Bypass", false),
    ParamSpec {
        id: ParamId::SelectedTab,
        name: "Selected Tab",
        kind: ParamKind::Int { min: 0, max: 4, default: 0 },
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_indexed_by_id() {
        for (i, spec) in PARAM_LAYOUT.iter().enumerate() {
            assert_eq!(spec.id.index(), i, "{} is out of place", spec.name);
            assert_eq!(ParamId::ALL[i], spec.id);
        }
    }

    #[test]
    fn test_names_are_unique() {
        let names: std::collections::HashSet<_> = PARAM_LAYOUT.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), NUM_PARAMS);
    }

    #[test]
    fn test_defaults_are_legal() {
        for spec in &PARAM_LAYOUT {
            let default = spec.kind.default_value();
            assert!((spec.kind.sanitize(default) - default).abs() < 1e-4, "{}", spec.name);
        }
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(ParamId::from_name("Phaser RateHz"), Some(ParamId::PhaserRate));
        assert_eq!(ParamId::from_name("phaser ratehz"), None);
        assert_eq!(ParamId::find("phaser ratehz"), Some(ParamId::PhaserRate));
        assert_eq!(ParamId::find("ladder-filter-cutoff-hz"), Some(ParamId::LadderFilterCutoff));
        assert_eq!(ParamId::find("nope"), None);
    }

    #[test]
    fn test_float_snap() {
        let range = FloatRange::new(0.1, 10.0, 0.05);
        assert!((range.snap(1.013) - 1.0).abs() < 1e-5);
        assert!((range.snap(50.0) - 10.0).abs() < 1e-4);
        assert!((range.snap(-3.0) - 0.1).abs() < 1e-6);
        assert_eq!(range.snap(f32::NAN), 0.1);
    }

    #[test]
    fn test_skewed_normalization_roundtrip() {
        let range = FloatRange::new(20.0, 20000.0, 0.0).with_skew(0.25);
        for value in [20.0, 100.0, 1000.0, 5000.0, 20000.0] {
            let n = range.to_normalized(value);
            assert!((0.0..=1.0).contains(&n));
            let back = range.from_normalized(n);
            assert!((back - value).abs() / value < 1e-3, "{value} -> {n} -> {back}");
        }
        // Skew < 1 gives the low end more knob travel
        assert!(range.to_normalized(1000.0) > 0.3);
    }

    #[test]
    fn test_mix_normalization_is_skewed() {
        for id in [ParamId::PhaserMix, ParamId::ChorusMix] {
            let kind = id.spec().kind;
            assert!((kind.from_normalized(0.5) - 0.98).abs() < 1e-4, "{}", id.name());
            assert_eq!(kind.from_normalized(0.0), 0.0);
            assert_eq!(kind.from_normalized(1.0), 1.0);
            for value in [0.0, 0.25, 0.5, 0.9, 1.0] {
                let back = kind.from_normalized(kind.to_normalized(value));
                assert!((back - value).abs() < 1e-4, "{} {value} -> {back}", id.name());
            }
        }
    }

    #[test]
    fn test_frequencies_normalize_linearly() {
        for id in [ParamId::PhaserCenterFreq, ParamId::LadderFilterCutoff, ParamId::GeneralFilterFreq] {
            let kind = id.spec().kind;
            assert!((kind.to_normalized(10010.0) - 0.5).abs() < 1e-4, "{}", id.name());
        }
    }

    #[test]
    fn test_choice_and_int_sanitize() {
        let mode = ParamId::LadderFilterMode.spec().kind;
        assert_eq!(mode.sanitize(2.4), 2.0);
        assert_eq!(mode.sanitize(17.0), 5.0);
        assert_eq!(mode.from_normalized(1.0), 5.0);
        assert_eq!(mode.format(3.0), "LPF24");

        let tab = ParamId::SelectedTab.spec().kind;
        assert_eq!(tab.sanitize(-2.0), 0.0);
        assert_eq!(tab.sanitize(3.6), 4.0);
        assert_eq!(tab.format(2.0), "2");

        let bypass = ParamId::ChorusBypass.spec().kind;
        assert_eq!(bypass.sanitize(0.7), 1.0);
        assert_eq!(bypass.format(1.0), "on");
    }

    #[test]
    fn test_format_units() {
        assert_eq!(ParamId::PhaserMix.spec().kind.format(0.25), "25 %");
        assert_eq!(ParamId::GeneralFilterFreq.spec().kind.format(750.0), "750 Hz");
        assert_eq!(ParamId::GeneralFilterGain.spec().kind.format(-3.5), "-3.50 dB");
    }
}

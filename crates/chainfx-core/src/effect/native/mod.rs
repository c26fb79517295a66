//! Built-in effect modules
//!
//! All modules are pure Rust, single-channel, and allocation-free after
//! `prepare`.

pub mod biquad;
pub mod chorus;
pub mod gain;
pub mod ladder;
mod lfo;
pub mod phaser;

pub use biquad::{BiquadCoeffs, GeneralFilter, GeneralFilterMode, GeneralFilterSettings};
pub use chorus::Chorus;
pub use gain::GainStage;
pub use ladder::{LadderFilter, LadderMode};
pub use phaser::Phaser;

/// Render a sine at `freq` Hz into a fresh vector (test helper)
#[cfg(test)]
pub(crate) fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin() * 0.5)
        .collect()
}

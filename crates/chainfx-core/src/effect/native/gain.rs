//! Gain stage - per-sample smoothed input/output level in dB
//!
//! Unlike the chain modules, the gain stages run over the whole callback
//! buffer (both channels at once) and tick their smoother every sample.

use crate::params::{ParamId, ParamStore, Smoothed, SmoothedParamBank};
use crate::types::{db_to_gain, StereoBuffer};

/// A smoothed stereo gain stage
#[derive(Debug, Clone, Copy)]
pub struct GainStage {
    smoothed: Smoothed,
}

impl GainStage {
    /// Gain stage at the chain input
    pub fn input() -> Self {
        Self {
            smoothed: Smoothed::InputGain,
        }
    }

    /// Gain stage at the chain output
    pub fn output() -> Self {
        Self {
            smoothed: Smoothed::OutputGain,
        }
    }

    pub fn param(&self) -> ParamId {
        self.smoothed.param()
    }

    /// Scale the buffer, ramping towards the live parameter value
    pub fn process(&self, buffer: &mut StereoBuffer, params: &ParamStore, bank: &mut SmoothedParamBank) {
        let smoother = bank.smoother_mut(self.smoothed);
        smoother.set_target(params.get(self.smoothed.param()));

        if !smoother.is_smoothing() {
            let gain = db_to_gain(smoother.current());
            if gain != 1.0 {
                buffer.scale(gain);
            }
            return;
        }

        let (left, right) = buffer.channels_mut();
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let gain = db_to_gain(smoother.next());
            *l *= gain;
            *r *= gain;
        }
    }
}

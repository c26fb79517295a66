//! Effect system - the mono effect trait and module metadata
//!
//! Every chain stage implements [`Effect`] and processes one channel in
//! place. Parameters are not pushed through the trait: the channel
//! processor calls each module's typed setters from smoothed values once per
//! sub-block, then runs [`Effect::process`] on that sub-block.
//!
//! Bypass is not a module concern either. The channel processor decides per
//! chain position whether to call `process` at all, so a bypassed module's
//! state is left exactly as it was.

pub mod native;

use crate::params::ParamId;
use crate::types::Sample;

/// Information about an effect module
#[derive(Debug, Clone)]
pub struct EffectInfo {
    /// Effect name for display
    pub name: String,
    /// Effect category (e.g., "Filter", "Modulation", "Distortion")
    pub category: String,
    /// Parameters that drive this module, in display order
    pub params: Vec<ParamId>,
    /// Bypass switch for this module
    pub bypass: Option<ParamId>,
}

impl EffectInfo {
    /// Create a new effect info
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            params: Vec::new(),
            bypass: None,
        }
    }

    /// Add a parameter to this effect
    pub fn with_param(mut self, param: ParamId) -> Self {
        self.params.push(param);
        self
    }

    /// Set the bypass parameter
    pub fn with_bypass(mut self, param: ParamId) -> Self {
        self.bypass = Some(param);
        self
    }

    /// Get the number of parameters
    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

/// The core effect trait - implemented by every chain stage
///
/// Effects are single-channel; stereo is two independent instances.
pub trait Effect: Send {
    /// Get information about this effect (name, category, parameters)
    fn info(&self) -> &EffectInfo;

    /// Allocate and reset for a sample rate and maximum block size
    ///
    /// Called outside the audio callback; may allocate.
    fn prepare(&mut self, sample_rate: f32, max_block_size: usize);

    /// Process a block in place. Must not allocate, lock, or block.
    fn process(&mut self, block: &mut [Sample]);

    /// Clear internal state (delay lines, filter memories, LFO phase)
    fn reset(&mut self);
}

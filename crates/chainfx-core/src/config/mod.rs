//! Configuration for ChainFx
//!
//! Engine tuning lives in [`EngineConfig`]; hosts embed it in their own
//! YAML config. Loading and saving is generic over any serde type.

mod io;
mod paths;

pub use io::{load_config, save_config};
pub use paths::{default_config_dir, default_config_path, default_state_path};

use serde::{Deserialize, Serialize};

use crate::engine::ORDER_QUEUE_CAPACITY;
use crate::params::SmoothingStyle;

/// Default sub-block length in samples
pub const DEFAULT_MAX_SUB_BLOCK: usize = 64;

/// Default smoothing ramp in seconds
pub const DEFAULT_RAMP_SECONDS: f32 = 0.05;

/// Engine tuning
///
/// Every field has a default, so a partial YAML file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Parameter smoothing ramp length (seconds)
    pub smoothing_ramp_seconds: f32,
    /// Ramp shape for all smoothers
    pub smoothing_style: SmoothingStyle,
    /// Longest stretch of samples processed with one set of parameters
    pub max_sub_block_size: usize,
    /// Capacity of each order queue
    pub order_queue_capacity: usize,
    /// Run the general filter stage on the signal
    ///
    /// When false the stage keeps its place in the order and its
    /// coefficients stay up to date, but it never touches the audio.
    pub process_general_filter: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            smoothing_ramp_seconds: DEFAULT_RAMP_SECONDS,
            smoothing_style: SmoothingStyle::Exponential,
            max_sub_block_size: DEFAULT_MAX_SUB_BLOCK,
            order_queue_capacity: ORDER_QUEUE_CAPACITY,
            process_general_filter: false,
        }
    }
}

impl EngineConfig {
    /// Clamp values that would make the engine misbehave
    pub fn sanitized(&self) -> Self {
        Self {
            smoothing_ramp_seconds: if self.smoothing_ramp_seconds.is_finite() {
                self.smoothing_ramp_seconds.clamp(0.0, 5.0)
            } else {
                DEFAULT_RAMP_SECONDS
            },
            smoothing_style: self.smoothing_style,
            max_sub_block_size: self.max_sub_block_size.max(1),
            order_queue_capacity: self.order_queue_capacity.max(1),
            process_general_filter: self.process_general_filter,
        }
    }
}

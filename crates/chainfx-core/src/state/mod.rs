//! Persistent engine state
//!
//! A [`StateSnapshot`] is the settings tree saved by the host: every
//! parameter by name plus the processing order as an opaque blob under
//! `dsp_order`. On disk it is JSON.
//!
//! Restoring is forgiving. Unknown parameter names are skipped, missing
//! ones keep their current value, and an unreadable order falls back to
//! the default sequence. Only a document that isn't JSON at all is an error.

mod codec;

pub use codec::{decode_order, encode_order, OrderCodecError, ORDER_BLOB_VERSION};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order::ProcessingOrder;
use crate::params::{ParamId, ParamStore};

/// Current snapshot format version
pub const STATE_VERSION: u32 = 1;

/// Errors restoring a snapshot
#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid state document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported state version {0}")]
    Version(u32),

    #[error("invalid processing order: {0}")]
    Order(#[from] OrderCodecError),
}

/// Result type for state operations
pub type StateResult<T> = Result<T, StateError>;

/// Serialisable engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub params: BTreeMap<String, f32>,
    /// Order blob, see [`encode_order`]
    #[serde(default)]
    pub dsp_order: Vec<u8>,
}

fn default_version() -> u32 {
    STATE_VERSION
}

impl StateSnapshot {
    /// Capture the live parameters and `order`
    pub fn capture(params: &ParamStore, order: &ProcessingOrder) -> Self {
        Self {
            version: STATE_VERSION,
            params: params
                .snapshot()
                .into_iter()
                .map(|(id, value)| (id.name().to_string(), value))
                .collect(),
            dsp_order: encode_order(order),
        }
    }

    pub fn to_bytes(&self) -> StateResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parse a snapshot; newer format versions are refused
    pub fn from_bytes(bytes: &[u8]) -> StateResult<Self> {
        let snapshot: Self = serde_json::from_slice(bytes)?;
        if snapshot.version > STATE_VERSION {
            return Err(StateError::Version(snapshot.version));
        }
        Ok(snapshot)
    }

    /// Write known parameters into `params`, returning how many were applied
    pub fn apply_params(&self, params: &ParamStore) -> usize {
        let mut applied = 0;
        for (name, &value) in &self.params {
            match ParamId::from_name(name) {
                Some(id) if value.is_finite() => {
                    params.set(id, value);
                    applied += 1;
                }
                Some(id) => log::warn!("Ignoring non-finite value for '{}'", id.name()),
                None => log::warn!("Ignoring unknown parameter '{}' in saved state", name),
            }
        }
        applied
    }

    /// Stored order, or the default sequence if the blob is absent or bad
    pub fn order(&self) -> ProcessingOrder {
        if self.dsp_order.is_empty() {
            log::warn!("Saved state has no processing order, using default");
            return ProcessingOrder::identity();
        }
        match decode_order(&self.dsp_order) {
            Ok(order) => order,
            Err(e) => {
                log::warn!("Saved processing order unreadable ({}), using default", e);
                ProcessingOrder::identity()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::EffectId;

    #[test]
    fn test_capture_has_every_param() {
        let params = ParamStore::new();
        let snapshot = StateSnapshot::capture(&params, &ProcessingOrder::identity());
        assert_eq!(snapshot.params.len(), ParamId::ALL.len());
        assert_eq!(snapshot.params.get("Phaser RateHz"), Some(&params.get(ParamId::PhaserRate)));
        assert_eq!(snapshot.order(), ProcessingOrder::identity());
    }

    #[test]
    fn test_bytes_roundtrip() {
        let params = ParamStore::new();
        params.set(ParamId::ChorusMix, 0.75);
        params.set_bool(ParamId::OverdriveBypass, true);
        let order = ProcessingOrder::from_codes([3, 1, 4, 0, 2]);

        let bytes = StateSnapshot::capture(&params, &order).to_bytes().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("dsp_order"));

        let restored = StateSnapshot::from_bytes(&bytes).unwrap();
        assert_eq!(restored.order(), order);

        let target = ParamStore::new();
        assert_eq!(restored.apply_params(&target), ParamId::ALL.len());
        for id in ParamId::ALL {
            assert_eq!(target.get(id), params.get(id), "{}", id.name());
        }
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(matches!(StateSnapshot::from_bytes(b"not json"), Err(StateError::Json(_))));
        assert!(matches!(
            StateSnapshot::from_bytes(br#"{"version": 99}"#),
            Err(StateError::Version(99))
        ));
    }

    #[test]
    fn test_partial_document() {
        let snapshot = StateSnapshot::from_bytes(br#"{"params": {"Chorus Mix %": 0.25, "Flanger Rate": 3.0}}"#).unwrap();
        assert_eq!(snapshot.version, STATE_VERSION);

        let params = ParamStore::new();
        params.set(ParamId::PhaserMix, 0.6);
        assert_eq!(snapshot.apply_params(&params), 1);
        assert!((params.get(ParamId::ChorusMix) - 0.25).abs() < 1e-6);
        // Untouched by the snapshot
        assert!((params.get(ParamId::PhaserMix) - 0.6).abs() < 1e-6);
        // Absent order falls back to the default
        assert_eq!(snapshot.order(), ProcessingOrder::identity());
    }

    #[test]
    fn test_corrupt_order_falls_back() {
        let mut snapshot = StateSnapshot::capture(&ParamStore::new(), &ProcessingOrder::identity());
        snapshot.dsp_order = vec![1, 2, 3];
        assert_eq!(snapshot.order(), ProcessingOrder::identity());

        snapshot.dsp_order = [2i32, 2, 2, 2, 2].iter().flat_map(|c| c.to_le_bytes()).collect();
        assert_eq!(snapshot.order(), ProcessingOrder::identity());

        snapshot.dsp_order = [4i32, 3, 2, 1, 0].iter().flat_map(|c| c.to_le_bytes()).collect();
        assert_eq!(snapshot.order().get(0), Some(EffectId::GeneralFilter));
    }
}

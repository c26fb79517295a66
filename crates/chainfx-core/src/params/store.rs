//! Lock-free parameter value store
//!
//! Each value is an `f32` kept in an `AtomicU32` (bit pattern). Every
//! parameter is independently atomic, which is all the chain needs: no
//! invariant spans two parameters. The control thread is the only writer;
//! the audio thread reads with `Relaxed` ordering once per sub-block.

use std::sync::atomic::{AtomicU32, Ordering};

use super::{ParamId, ParamKind, NUM_PARAMS, PARAM_LAYOUT};

/// Live parameter values, shared via `Arc`
#[derive(Debug)]
pub struct ParamStore {
    values: [AtomicU32; NUM_PARAMS],
}

impl ParamStore {
    /// Create a store with every parameter at its default
    pub fn new() -> Self {
        Self {
            values: std::array::from_fn(|i| AtomicU32::new(PARAM_LAYOUT[i].kind.default_value().to_bits())),
        }
    }

    /// Plain value
    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Relaxed))
    }

    /// Set a plain value; it is clamped and snapped to the parameter's
    /// grid first. Returns the value actually stored.
    pub fn set(&self, id: ParamId, value: f32) -> f32 {
        let stored = id.spec().kind.sanitize(value);
        self.values[id.index()].store(stored.to_bits(), Ordering::Relaxed);
        stored
    }

    #[inline]
    pub fn get_bool(&self, id: ParamId) -> bool {
        self.get(id) >= 0.5
    }

    pub fn set_bool(&self, id: ParamId, value: bool) {
        self.set(id, if value { 1.0 } else { 0.0 });
    }

    /// Choice index (0-based)
    #[inline]
    pub fn get_choice(&self, id: ParamId) -> usize {
        self.get(id).max(0.0) as usize
    }

    #[inline]
    pub fn get_int(&self, id: ParamId) -> i32 {
        self.get(id).round() as i32
    }

    /// Value mapped to 0..1 (host automation scale)
    pub fn get_normalized(&self, id: ParamId) -> f32 {
        id.spec().kind.to_normalized(self.get(id))
    }

    /// Set from a 0..1 host automation value
    pub fn set_normalized(&self, id: ParamId, normalized: f32) -> f32 {
        let kind: &ParamKind = &id.spec().kind;
        self.set(id, kind.from_normalized(normalized))
    }

    /// Formatted value for display
    pub fn display(&self, id: ParamId) -> String {
        id.spec().kind.format(self.get(id))
    }

    /// Put every parameter back to its default
    pub fn reset_to_defaults(&self) {
        for spec in &PARAM_LAYOUT {
            self.values[spec.id.index()].store(spec.kind.default_value().to_bits(), Ordering::Relaxed);
        }
    }

    /// `(id, value)` for every parameter, in layout order
    pub fn snapshot(&self) -> [(ParamId, f32); NUM_PARAMS] {
        std::array::from_fn(|i| (ParamId::ALL[i], self.get(ParamId::ALL[i])))
    }
}

impl Default for ParamStore {
    fn default() -> Self {
        Self::new()
    }
}

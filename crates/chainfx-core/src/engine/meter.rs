//! Metering taps - RMS levels before and after the chain
//!
//! The audio thread stores one RMS value per channel per callback; the UI
//! reads them at its own rate. Values are `f32` bit patterns in
//! `AtomicU32`s, read and written `Relaxed` (a torn frame between left and
//! right is harmless for a meter).

use std::sync::atomic::{AtomicU32, Ordering};

use crate::types::{gain_to_db, NUM_CHANNELS};

/// Floor used when converting silence to dBFS
pub const METER_FLOOR_DB: f32 = -100.0;

/// Lock-free RMS cells
#[derive(Debug)]
pub struct MeterTaps {
    pre: [AtomicU32; NUM_CHANNELS],
    post: [AtomicU32; NUM_CHANNELS],
}

impl MeterTaps {
    pub fn new() -> Self {
        Self {
            pre: std::array::from_fn(|_| AtomicU32::new(0.0f32.to_bits())),
            post: std::array::from_fn(|_| AtomicU32::new(0.0f32.to_bits())),
        }
    }

    /// Store pre-chain RMS (audio thread)
    #[inline]
    pub fn store_pre(&self, left: f32, right: f32) {
        self.pre[0].store(left.to_bits(), Ordering::Relaxed);
        self.pre[1].store(right.to_bits(), Ordering::Relaxed);
    }

    /// Store post-chain RMS (audio thread)
    #[inline]
    pub fn store_post(&self, left: f32, right: f32) {
        self.post[0].store(left.to_bits(), Ordering::Relaxed);
        self.post[1].store(right.to_bits(), Ordering::Relaxed);
    }

    /// Read all four levels
    pub fn snapshot(&self) -> MeterSnapshot {
        let load = |cell: &AtomicU32| f32::from_bits(cell.load(Ordering::Relaxed));
        MeterSnapshot {
            pre: [load(&self.pre[0]), load(&self.pre[1])],
            post: [load(&self.post[0]), load(&self.post[1])],
        }
    }
}

impl Default for MeterTaps {
    fn default() -> Self {
        Self::new()
    }
}

/// Linear RMS levels, `[left, right]`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterSnapshot {
    pub pre: [f32; NUM_CHANNELS],
    pub post: [f32; NUM_CHANNELS],
}

impl MeterSnapshot {
    /// Pre-chain levels in dBFS
    pub fn pre_db(&self) -> [f32; NUM_CHANNELS] {
        self.pre.map(|v| gain_to_db(v, METER_FLOOR_DB))
    }

    /// Post-chain levels in dBFS
    pub fn post_db(&self) -> [f32; NUM_CHANNELS] {
        self.post.map(|v| gain_to_db(v, METER_FLOOR_DB))
    }
}

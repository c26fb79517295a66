//! State shared between the audio thread and the control thread
//!
//! Everything in [`EngineShared`] is atomic. The control thread writes
//! parameters and the restore flag; the audio thread writes meters, the
//! published order and the statistics counters.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use super::meter::MeterTaps;
use crate::order::ProcessingOrder;
use crate::params::ParamStore;

/// Counters the audio thread bumps instead of logging
#[derive(Debug, Default)]
pub struct EngineStats {
    /// Callbacks processed
    pub callbacks: AtomicU64,
    /// Times the active order actually changed
    pub order_changes: AtomicU64,
    /// Orders drained from the queue that were not permutations
    pub rejected_orders: AtomicU64,
    /// Order echoes lost because the restore queue was full
    pub dropped_echoes: AtomicU64,
}

impl EngineStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            callbacks: self.callbacks.load(Ordering::Relaxed),
            order_changes: self.order_changes.load(Ordering::Relaxed),
            rejected_orders: self.rejected_orders.load(Ordering::Relaxed),
            dropped_echoes: self.dropped_echoes.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`EngineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub callbacks: u64,
    pub order_changes: u64,
    pub rejected_orders: u64,
    pub dropped_echoes: u64,
}

/// Shared engine state, held in an `Arc` by both sides
#[derive(Debug)]
pub struct EngineShared {
    pub params: ParamStore,
    pub meters: MeterTaps,
    pub stats: EngineStats,
    /// Set by the control side; test-and-cleared by the next callback
    restore_requested: AtomicBool,
    /// Active order, packed (see [`ProcessingOrder::pack`])
    active_order: AtomicU32,
}

impl EngineShared {
    pub fn new() -> Self {
        Self {
            params: ParamStore::new(),
            meters: MeterTaps::new(),
            stats: EngineStats::default(),
            restore_requested: AtomicBool::new(false),
            active_order: AtomicU32::new(ProcessingOrder::identity().pack()),
        }
    }

    /// Ask the audio thread to echo its active order once
    pub fn request_restore(&self) {
        self.restore_requested.store(true, Ordering::Release);
    }

    /// Test-and-clear the restore flag (audio thread)
    #[inline]
    pub fn take_restore_request(&self) -> bool {
        self.restore_requested.swap(false, Ordering::AcqRel)
    }

    pub fn restore_pending(&self) -> bool {
        self.restore_requested.load(Ordering::Acquire)
    }

    /// Publish the active order (audio thread)
    #[inline]
    pub fn publish_order(&self, order: &ProcessingOrder) {
        self.active_order.store(order.pack(), Ordering::Release);
    }

    /// Last order published by the audio thread
    pub fn active_order(&self) -> ProcessingOrder {
        ProcessingOrder::unpack(self.active_order.load(Ordering::Acquire))
    }
}

impl Default for EngineShared {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::all_permutations;

    #[test]
    fn test_restore_flag_is_test_and_clear() {
        let shared = EngineShared::new();
        assert!(!shared.take_restore_request());
        shared.request_restore();
        shared.request_restore();
        assert!(shared.restore_pending());
        assert!(shared.take_restore_request());
        assert!(!shared.take_restore_request());
    }

    #[test]
    fn test_publish_order() {
        let shared = EngineShared::new();
        assert_eq!(shared.active_order(), ProcessingOrder::identity());
        let order = all_permutations()[77];
        shared.publish_order(&order);
        assert_eq!(shared.active_order(), order);
    }
}

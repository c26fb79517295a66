//! Control-thread half of the engine
//!
//! [`create_engine`] wires the two halves together: the order queue runs
//! control → audio, the restore queue audio → control, and both sides hold
//! the same [`EngineShared`]. Every method here may allocate and log.

use std::sync::Arc;

use super::chain::bypass_param;
use super::meter::MeterSnapshot;
use super::order_queue::{order_queue, OrderReceiver, OrderSender};
use super::scheduler::AudioEngine;
use super::shared::{EngineShared, StatsSnapshot};
use crate::config::EngineConfig;
use crate::order::{EffectId, ProcessingOrder};
use crate::params::{ParamId, ParamStore};
use crate::state::{StateResult, StateSnapshot};

/// Build a connected audio engine and controller
pub fn create_engine(config: &EngineConfig) -> (AudioEngine, EngineController) {
    let config = config.sanitized();
    let shared = Arc::new(EngineShared::new());
    let (order_tx, order_rx) = order_queue(config.order_queue_capacity);
    let (restore_tx, restore_rx) = order_queue(config.order_queue_capacity);

    log::info!(
        "Creating engine: queue capacity {}, sub-block {}, ramp {}s ({:?})",
        config.order_queue_capacity,
        config.max_sub_block_size,
        config.smoothing_ramp_seconds,
        config.smoothing_style
    );

    let engine = AudioEngine::new(Arc::clone(&shared), order_rx, restore_tx, config);
    let controller = EngineController {
        shared,
        order_tx,
        restore_rx,
        last_restored: None,
        last_requested: ProcessingOrder::identity(),
        pending_restore: None,
    };
    (engine, controller)
}

/// Handle used by the UI / host thread
pub struct EngineController {
    shared: Arc<EngineShared>,
    order_tx: OrderSender,
    restore_rx: OrderReceiver,
    last_restored: Option<ProcessingOrder>,
    /// Newest order accepted by the order queue
    last_requested: ProcessingOrder,
    /// Restored order still waiting for room in the order queue
    pending_restore: Option<ProcessingOrder>,
}

impl EngineController {
    /// Queue a new order for the audio thread
    ///
    /// Returns `false` if the queue was full and the order was dropped.
    /// An accepted order supersedes any restore still waiting to be queued.
    pub fn request_order(&mut self, order: ProcessingOrder) -> bool {
        let queued = self.order_tx.push(order);
        if queued {
            self.last_requested = order;
            if self.pending_restore.take().is_some() {
                log::debug!("Pending restored order superseded by {}", order);
            }
        } else {
            log::debug!("Order queue full, dropped {}", order);
        }
        queued
    }

    /// Order that relative edits should start from
    ///
    /// Ahead of [`active_order`](Self::active_order) while requests are
    /// still queued.
    pub fn requested_order(&self) -> ProcessingOrder {
        self.pending_restore.unwrap_or(self.last_requested)
    }

    /// Restored order not yet accepted by the order queue
    pub fn pending_restore(&self) -> Option<ProcessingOrder> {
        self.pending_restore
    }

    /// Retry queueing a pending restore; the echo is requested once it lands
    fn flush_pending_restore(&mut self) {
        let Some(order) = self.pending_restore else {
            return;
        };
        if self.order_tx.push(order) {
            self.pending_restore = None;
            self.last_requested = order;
            self.request_order_echo();
        }
    }

    pub fn params(&self) -> &ParamStore {
        &self.shared.params
    }

    /// Set a plain parameter value, returning the value stored
    pub fn set_param(&self, id: ParamId, value: f32) -> f32 {
        self.shared.params.set(id, value)
    }

    pub fn set_param_normalized(&self, id: ParamId, normalized: f32) -> f32 {
        self.shared.params.set_normalized(id, normalized)
    }

    pub fn set_bypass(&self, effect: EffectId, bypassed: bool) {
        self.shared.params.set_bool(bypass_param(effect), bypassed);
    }

    pub fn is_bypassed(&self, effect: EffectId) -> bool {
        self.shared.params.get_bool(bypass_param(effect))
    }

    pub fn meters(&self) -> MeterSnapshot {
        self.shared.meters.snapshot()
    }

    /// Ask the audio thread to send its active order back once
    pub fn request_order_echo(&self) {
        self.shared.request_restore();
    }

    /// Drain the restore queue, returning the newest order if any arrived
    ///
    /// Also retries a restored order that found the order queue full.
    pub fn poll_restored_order(&mut self) -> Option<ProcessingOrder> {
        self.flush_pending_restore();
        let latest = self.restore_rx.pull_latest();
        if latest.is_some() {
            self.last_restored = latest;
        }
        latest
    }

    /// Newest order ever received through the restore queue
    pub fn last_restored_order(&self) -> Option<ProcessingOrder> {
        self.last_restored
    }

    /// Order most recently published by the audio thread
    pub fn active_order(&self) -> ProcessingOrder {
        self.shared.active_order()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn shared(&self) -> &Arc<EngineShared> {
        &self.shared
    }

    /// Serialise parameters and the active order
    pub fn get_state(&self) -> StateResult<Vec<u8>> {
        StateSnapshot::capture(&self.shared.params, &self.active_order()).to_bytes()
    }

    /// Restore a saved state
    ///
    /// Parameters apply immediately. The order is queued for the audio
    /// thread, which echoes it back through the restore queue on its next
    /// callback. If the order queue is full the order is held and retried
    /// from [`poll_restored_order`](Self::poll_restored_order). On error
    /// nothing is changed.
    pub fn set_state(&mut self, bytes: &[u8]) -> StateResult<ProcessingOrder> {
        let snapshot = StateSnapshot::from_bytes(bytes)?;
        let applied = snapshot.apply_params(&self.shared.params);
        let order = snapshot.order();

        self.pending_restore = Some(order);
        self.flush_pending_restore();
        if self.pending_restore.is_some() {
            log::debug!("Order queue full, restored order {} will be retried", order);
        }

        log::info!("Restored state: {} parameters, order {}", applied, order);
        Ok(order)
    }
}

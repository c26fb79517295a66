//! Audio engine - the per-callback block scheduler
//!
//! `process_block` runs once per host callback:
//!
//! ```text
//!  drain order queue ──► restore echo ──► input gain ──► pre RMS
//!        │
//!        ▼
//!  ┌─────────────── sub-block loop (≤ max_sub_block samples) ───────────────┐
//!  │ advance smoothers ─► update_from_params (L, R) ─► process L ─► process R │
//!  └─────────────────────────────────────────────────────────────────────────┘
//!        │
//!        ▼
//!  output gain ──► post RMS
//! ```
//!
//! # Real-Time Safety
//!
//! Everything the callback touches is allocated in [`AudioEngine::prepare`].
//! Malformed orders, full queues and the like are counted in
//! [`EngineStats`](super::EngineStats) for the control thread to report;
//! nothing here logs, locks, or returns an error.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::chain::{DispatchEntry, MonoChannelProcessor};
use super::order_queue::{OrderReceiver, OrderSender};
use super::shared::EngineShared;
use crate::config::EngineConfig;
use crate::effect::native::GainStage;
use crate::order::{ProcessingOrder, NUM_EFFECTS};
use crate::params::SmoothedParamBank;
use crate::types::{rms, StereoBuffer, SAMPLE_RATE};

/// Audio-thread half of the engine
///
/// Owns the smoothers, both channel processors and the active order. Move
/// it into the audio callback; talk to it through the matching
/// [`EngineController`](super::EngineController).
pub struct AudioEngine {
    shared: Arc<EngineShared>,
    order_rx: OrderReceiver,
    restore_tx: OrderSender,
    smoothers: SmoothedParamBank,
    channels: [MonoChannelProcessor; 2],
    input_gain: GainStage,
    output_gain: GainStage,
    active_order: ProcessingOrder,
    config: EngineConfig,
    sample_rate: f32,
    prepared: bool,
    largest_sub_block: usize,
}

impl AudioEngine {
    pub(super) fn new(
        shared: Arc<EngineShared>,
        order_rx: OrderReceiver,
        restore_tx: OrderSender,
        config: EngineConfig,
    ) -> Self {
        Self {
            shared,
            order_rx,
            restore_tx,
            smoothers: SmoothedParamBank::new(config.smoothing_style),
            channels: [
                MonoChannelProcessor::new(config.process_general_filter),
                MonoChannelProcessor::new(config.process_general_filter),
            ],
            input_gain: GainStage::input(),
            output_gain: GainStage::output(),
            active_order: ProcessingOrder::identity(),
            config,
            sample_rate: SAMPLE_RATE as f32,
            prepared: false,
            largest_sub_block: 0,
        }
    }

    /// Prepare for playback (host thread, before the first callback)
    ///
    /// Allocates delay lines, resets every module, and snaps all smoothers
    /// to the live parameter values. May be called again whenever the
    /// sample rate or block size changes.
    pub fn prepare(&mut self, sample_rate: u32, max_block_size: usize) {
        self.sample_rate = sample_rate as f32;
        for channel in &mut self.channels {
            channel.prepare(self.sample_rate, self.config.max_sub_block_size);
        }
        self.smoothers
            .initialize(self.sample_rate, self.config.smoothing_ramp_seconds, &self.shared.params);
        self.shared.publish_order(&self.active_order);
        self.prepared = true;

        log::info!(
            "AudioEngine prepared: {}Hz, max block {} (sub-blocks of {}), order {}",
            sample_rate,
            max_block_size,
            self.config.max_sub_block_size,
            self.active_order
        );
        if !self.config.process_general_filter {
            log::warn!(
                "General filter stage is excluded from processing (set process_general_filter to enable)"
            );
        }
    }

    /// Process one host callback in place
    pub fn process_block(&mut self, buffer: &mut StereoBuffer) {
        self.shared.stats.callbacks.fetch_add(1, Ordering::Relaxed);

        self.apply_pending_order();
        if self.shared.take_restore_request() && !self.restore_tx.push(self.active_order) {
            self.shared.stats.dropped_echoes.fetch_add(1, Ordering::Relaxed);
        }

        let len = buffer.len();
        if len == 0 || !self.prepared {
            return;
        }

        let params = &self.shared.params;
        self.input_gain.process(buffer, params, &mut self.smoothers);
        self.shared.meters.store_pre(rms(buffer.left()), rms(buffer.right()));

        let sub_block = self.config.max_sub_block_size.max(1);
        let (left, right) = buffer.channels_mut();
        let [left_chain, right_chain] = &mut self.channels;
        let mut start = 0;
        while start < len {
            let end = (start + sub_block).min(len);
            self.largest_sub_block = self.largest_sub_block.max(end - start);
            self.smoothers.retarget(end - start, params);
            left_chain.update_from_params(params, &self.smoothers);
            right_chain.update_from_params(params, &self.smoothers);
            left_chain.process(&mut left[start..end], &self.active_order);
            right_chain.process(&mut right[start..end], &self.active_order);
            start = end;
        }

        self.output_gain.process(buffer, params, &mut self.smoothers);
        self.shared.meters.store_post(rms(buffer.left()), rms(buffer.right()));
    }

    /// Drain the order queue, keeping the last well-formed order
    fn apply_pending_order(&mut self) {
        let mut latest = None;
        while let Some(order) = self.order_rx.pull() {
            if order.is_sentinel() {
                continue;
            }
            if order.is_permutation() {
                latest = Some(order);
            } else {
                self.shared.stats.rejected_orders.fetch_add(1, Ordering::Relaxed);
            }
        }

        if let Some(order) = latest {
            if order != self.active_order {
                self.active_order = order;
                self.shared.publish_order(&order);
                self.shared.stats.order_changes.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Order currently applied by the audio thread
    pub fn active_order(&self) -> ProcessingOrder {
        self.active_order
    }

    /// Dispatch table the left channel would use for the active order
    pub fn dispatch_table(&self) -> [DispatchEntry; NUM_EFFECTS] {
        self.channels[0].dispatch_table(&self.active_order)
    }

    /// Channel processor (0 = left, 1 = right)
    pub fn channel(&self, index: usize) -> Option<&MonoChannelProcessor> {
        self.channels.get(index)
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Longest sub-block processed since construction
    pub fn largest_sub_block(&self) -> usize {
        self.largest_sub_block
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }
}

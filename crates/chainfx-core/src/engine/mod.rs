//! Audio engine - channel processors, block scheduler, control handle
//!
//! This module contains the real-time side of ChainFx and its control API:
//! - MonoChannelProcessor: the five effect modules of one channel
//! - AudioEngine: per-callback scheduler (orders, smoothing, sub-blocks)
//! - EngineController: UI/host handle (params, orders, meters, state)
//! - Order queues: lock-free SPSC transport for processing orders

mod chain;
mod controller;
mod meter;
mod order_queue;
mod scheduler;
mod shared;

pub use chain::*;
pub use controller::*;
pub use meter::*;
pub use order_queue::*;
pub use scheduler::*;
pub use shared::*;

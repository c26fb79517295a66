//! ChainFx Core - Reorderable five-stage effects chain

pub mod config;
pub mod types;
pub mod effect;
pub mod order;
pub mod params;
pub mod engine;
pub mod state;

pub use types::*;

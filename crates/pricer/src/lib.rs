//! Pixel pricing engine
//!
//! Features:
//! - Periodic ETH/USD sampling on a fixed interval
//! - Inclusive delta band that suppresses noise-level updates
//! - Exact wei price per pixel
//! - Transient feed outages survive until a configurable limit

pub mod engine;
pub mod handle;

pub use engine::{is_within_delta, EngineConfig, EngineState, PriceSource, PricingEngine};
pub use handle::EngineHandle;

//! Core types and utilities for the pixel pricer
//!
//! This crate provides what every other component shares:
//! - Exact rational price helpers
//! - Decimal to wei fixed-point conversion
//! - Pricing configuration
//! - Error types

pub mod types;
pub mod fixed_point;
pub mod config;
pub mod errors;

pub use types::*;
pub use fixed_point::*;
pub use config::*;
pub use errors::*;

//! Core data types for the analytics engine
//!
//! Defines fundamental types:
//! - Contract: validated, immutable option quote
//! - ChainSnapshot: point-in-time keyed chain for one underlying
//! - Quote / MarketContext: solver inputs
//! - EngineError: error taxonomy

pub mod contract;
pub mod error;
pub mod quote;
pub mod snapshot;

pub use contract::*;
pub use error::*;
pub use quote::*;
pub use snapshot::*;

//! Metric calculators
//!
//! - Put-call ratio over snapshots (volume and open interest)
//! - Greeks from a quote and its solved volatility

pub mod greeks;
pub mod pcr;

pub use greeks::*;
pub use pcr::*;

//! # Options Analytics Engine
//!
//! Computational core that turns option-chain snapshots into risk metrics:
//! put-call ratios, implied volatilities, and Greeks, with rolling-window
//! aggregates maintained incrementally as snapshots stream in.
//!
//! ## Overview
//!
//! Data flows one way. Snapshots enter the chain model, feed the PCR
//! calculator and the implied-volatility solver, the solver's output feeds
//! the Greeks calculator, and all three metric producers write into the
//! aggregation layer, which is the engine's queryable state.
//!
//! ## Key Components
//!
//! - **Chain Model**: validated, immutable contracts keyed by
//!   (expiry, strike, type) within timestamped snapshots
//! - **PCR Calculator**: volume and open-interest put-call ratios with a
//!   tagged `Undefined` state for a zero call side
//! - **Implied Volatility Solver**: hybrid Newton-Raphson/bisection against
//!   a pluggable pricing-model capability
//! - **Greeks Calculator**: one-pass closed-form sensitivities at the
//!   solved volatility
//! - **Aggregation Layer**: per-(underlying, expiry) rolling windows with
//!   O(1) amortized updates and memoized solves
//!
//! ## Usage
//!
//! ```rust,no_run
//! use options_analytics::prelude::*;
//!
//! let engine = AnalyticsEngine::new();
//!
//! // Snapshots arrive from an upstream ingestion collaborator
//! # let snapshot: ChainSnapshot = unimplemented!();
//! let ctx = MarketContext::new(505.0, 0.05, 0.01);
//! let summary = engine.ingest(&snapshot, ctx).unwrap();
//!
//! // Query solved metrics as of any retained timestamp
//! let pcr = engine.pcr("QQQ", PcrKind::Volume, None, snapshot.timestamp);
//! ```
//!
//! ## What This Engine Does
//!
//! - Solves implied volatility deterministically, contract by contract
//! - Isolates degenerate contracts without aborting their snapshot
//! - Keeps window statistics incremental: no full-history replays
//! - Processes independent underlyings concurrently
//!
//! ## What This Engine Does NOT Do
//!
//! - Fetch market data or read files and sockets
//! - Persist anything; all state is in memory
//! - Execute trades or track positions
//! - Render reports or serve queries over the network

pub mod core;
pub mod engine;
pub mod metrics;
pub mod models;
pub mod vol;
pub mod window;

/// Prelude with commonly used types
pub mod prelude {
    // Core types
    pub use crate::core::{
        ChainSnapshot, Contract, ContractKey, EngineError, EngineResult, MarketContext,
        OptionType, Quote,
    };

    // Models
    pub use crate::models::{BlackScholes, ModelKind, PricingModel};

    // Solver
    pub use crate::vol::{
        InvalidQuote, IvSolver, SolveStatus, SolverConfig, VolatilityResult,
    };

    // Metric calculators
    pub use crate::metrics::{
        compute_greeks, open_interest_pcr, pcr, pcr_by_strike, volume_pcr, Greeks, GreeksResult,
        Pcr, PcrKind, StrikeFilter,
    };

    // Aggregation
    pub use crate::window::{Metric, MetricPoint, RollingWindow, WindowConfig, WindowStats};

    // Engine facade
    pub use crate::engine::{AnalyticsEngine, EngineConfig, IngestSummary};
}

// Re-export main types at crate root
pub use crate::core::{EngineError, EngineResult};
pub use crate::engine::{AnalyticsEngine, EngineConfig};

//! Analytics engine facade
//!
//! Owns per-underlying pipeline state and runs the full pass over each
//! arriving snapshot: per-contract volatility solves (parallel, memoized
//! against the previous snapshot), Greeks, put-call ratios, and rolling
//! window updates. Underlyings are independent; their state lives behind a
//! concurrent map with key-scoped locking, so snapshots for different
//! symbols can be ingested from different threads without coordination.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::{
    ChainSnapshot, Contract, ContractKey, EngineError, EngineResult, MarketContext, OptionType,
    Quote,
};
use crate::metrics::greeks::{compute_greeks, Greeks, GreeksResult};
use crate::metrics::pcr::{pcr, Pcr, PcrKind, StrikeFilter};
use crate::models::{ModelKind, PricingModel};
use crate::vol::{IvSolver, SolveStatus, SolverConfig, VolatilityResult};
use crate::window::{Metric, RollingWindow, WindowConfig, WindowStats};

/// Engine configuration, fixed at construction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Pricing model backing the solver and the Greeks
    pub model: ModelKind,
    /// Volatility solver tuning
    pub solver: SolverConfig,
    /// Rolling window retention
    pub window: WindowConfig,
}

/// Per-contract outcome counts for one ingested snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Contracts in the snapshot
    pub contracts: usize,
    /// Freshly solved to convergence
    pub solved: usize,
    /// Reused from the previous snapshot without re-solving
    pub reused: usize,
    /// Economically degenerate inputs
    pub invalid: usize,
    /// Solver exhausted its iteration cap
    pub did_not_converge: usize,
    /// No usable market price; nothing to solve
    pub skipped: usize,
}

/// Solve outcome recorded for one contract in one snapshot
#[derive(Debug, Clone, Copy)]
struct ContractRecord {
    market_price: f64,
    vol: VolatilityResult,
    greeks: GreeksResult,
}

/// Everything recorded for one snapshot timestamp
struct SnapshotRecord {
    ctx: MarketContext,
    contracts: HashMap<ContractKey, ContractRecord>,
    pcrs: HashMap<(Option<NaiveDate>, PcrKind), Pcr>,
}

/// Mutable pipeline state for one underlying
#[derive(Default)]
struct UnderlyingState {
    last_timestamp: Option<DateTime<Utc>>,
    history: BTreeMap<DateTime<Utc>, SnapshotRecord>,
    windows: HashMap<(Option<NaiveDate>, Metric), RollingWindow>,
}

/// The options analytics engine
pub struct AnalyticsEngine {
    config: EngineConfig,
    model: Arc<dyn PricingModel>,
    solver: IvSolver,
    states: DashMap<String, UnderlyingState>,
}

impl AnalyticsEngine {
    /// Create an engine with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with custom configuration
    pub fn with_config(config: EngineConfig) -> Self {
        let model = config.model.build();
        let solver = IvSolver::with_config(config.solver.clone());
        Self {
            config,
            model,
            solver,
            states: DashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ingest one snapshot for its underlying.
    ///
    /// Snapshots per underlying must arrive in strictly increasing timestamp
    /// order. Per-contract solve failures are recorded in that contract's
    /// result slot and never abort the rest of the snapshot.
    pub fn ingest(
        &self,
        snapshot: &ChainSnapshot,
        ctx: MarketContext,
    ) -> EngineResult<IngestSummary> {
        let mut state = self.states.entry(snapshot.underlying.clone()).or_default();

        if let Some(last) = state.last_timestamp {
            if snapshot.timestamp <= last {
                return Err(EngineError::OutOfOrderSnapshot {
                    underlying: snapshot.underlying.clone(),
                    timestamp: snapshot.timestamp,
                    last,
                });
            }
        }

        let as_of = snapshot.timestamp.date_naive();
        let previous = state
            .last_timestamp
            .and_then(|ts| state.history.get(&ts))
            .filter(|record| record.ctx == ctx);

        // Per-contract solves are independent pure computations
        let contracts: Vec<&Contract> = snapshot.contracts().collect();
        let solved: Vec<(ContractKey, Option<ContractRecord>, bool)> = contracts
            .par_iter()
            .map(|&contract| {
                let key = contract.key();
                let Some(quote) = Quote::from_contract(contract, &ctx, as_of) else {
                    return (key, None, false);
                };

                if let Some(prev) = previous.and_then(|p| p.contracts.get(&key)) {
                    if prev.market_price == quote.market_price {
                        return (key, Some(*prev), true);
                    }
                }

                let vol = self.solver.solve(self.model.as_ref(), &quote);
                let greeks = compute_greeks(self.model.as_ref(), &quote, &vol);
                (
                    key,
                    Some(ContractRecord {
                        market_price: quote.market_price,
                        vol,
                        greeks,
                    }),
                    false,
                )
            })
            .collect();

        let mut summary = IngestSummary {
            contracts: contracts.len(),
            ..Default::default()
        };
        let mut records = HashMap::with_capacity(solved.len());
        for (key, record, reused) in solved {
            match record {
                Some(record) => {
                    if reused {
                        summary.reused += 1;
                    } else {
                        match record.vol.status {
                            SolveStatus::Converged => summary.solved += 1,
                            SolveStatus::DidNotConverge => summary.did_not_converge += 1,
                            SolveStatus::Invalid(_) => summary.invalid += 1,
                        }
                    }
                    records.insert(key, record);
                }
                None => summary.skipped += 1,
            }
        }

        let pcrs = compute_pcrs(snapshot);
        let retention = self.config.window.retention();

        // Window updates: whole-chain PCR under expiry = None, everything
        // else per expiry
        for (&(expiry, kind), ratio) in &pcrs {
            if let Pcr::Value(v) = ratio {
                let metric = match kind {
                    PcrKind::Volume => Metric::VolumePcr,
                    PcrKind::OpenInterest => Metric::OpenInterestPcr,
                };
                state
                    .windows
                    .entry((expiry, metric))
                    .or_default()
                    .observe(snapshot.timestamp, *v, retention);
            }
        }
        for expiry in snapshot.expiries() {
            for (metric, value) in expiry_means(snapshot, expiry, &records) {
                state
                    .windows
                    .entry((Some(expiry), metric))
                    .or_default()
                    .observe(snapshot.timestamp, value, retention);
            }
        }

        debug!(
            underlying = %snapshot.underlying,
            reused = summary.reused,
            solved = summary.solved,
            "snapshot solves complete"
        );

        // Retire snapshot records that fell out of the retention window
        let cutoff = snapshot.timestamp - retention;
        state.history.retain(|ts, _| *ts >= cutoff);

        state.history.insert(
            snapshot.timestamp,
            SnapshotRecord {
                ctx,
                contracts: records,
                pcrs,
            },
        );
        state.last_timestamp = Some(snapshot.timestamp);

        info!(
            underlying = %snapshot.underlying,
            timestamp = %snapshot.timestamp,
            contracts = summary.contracts,
            invalid = summary.invalid,
            did_not_converge = summary.did_not_converge,
            "snapshot ingested"
        );

        Ok(summary)
    }

    /// Put-call ratio as of a timestamp. `expiry = None` is the whole chain.
    pub fn pcr(
        &self,
        underlying: &str,
        kind: PcrKind,
        expiry: Option<NaiveDate>,
        as_of: DateTime<Utc>,
    ) -> Option<Pcr> {
        let state = self.states.get(underlying)?;
        let (_, record) = state.history.range(..=as_of).next_back()?;
        record.pcrs.get(&(expiry, kind)).copied()
    }

    /// Solved volatility for one contract as of a timestamp
    pub fn implied_volatility(
        &self,
        underlying: &str,
        expiry: NaiveDate,
        strike: f64,
        option_type: OptionType,
        as_of: DateTime<Utc>,
    ) -> Option<VolatilityResult> {
        let state = self.states.get(underlying)?;
        let (_, record) = state.history.range(..=as_of).next_back()?;
        let key = ContractKey::new(expiry, strike, option_type);
        record.contracts.get(&key).map(|r| r.vol)
    }

    /// Greeks for one contract as of a timestamp
    pub fn greeks(
        &self,
        underlying: &str,
        expiry: NaiveDate,
        strike: f64,
        option_type: OptionType,
        as_of: DateTime<Utc>,
    ) -> Option<GreeksResult> {
        let state = self.states.get(underlying)?;
        let (_, record) = state.history.range(..=as_of).next_back()?;
        let key = ContractKey::new(expiry, strike, option_type);
        record.contracts.get(&key).map(|r| r.greeks)
    }

    /// Current-window aggregate for a metric series.
    /// `expiry = None` addresses the whole-chain PCR series.
    pub fn window_aggregate(
        &self,
        underlying: &str,
        expiry: Option<NaiveDate>,
        metric: Metric,
    ) -> Option<WindowStats> {
        let state = self.states.get(underlying)?;
        state.windows.get(&(expiry, metric))?.stats()
    }

    /// Metric value as of a timestamp, from the retained window
    pub fn metric_as_of(
        &self,
        underlying: &str,
        expiry: Option<NaiveDate>,
        metric: Metric,
        as_of: DateTime<Utc>,
    ) -> Option<f64> {
        let state = self.states.get(underlying)?;
        state.windows.get(&(expiry, metric))?.value_as_of(as_of)
    }

    /// Underlyings with ingested state
    pub fn underlyings(&self) -> Vec<String> {
        self.states.iter().map(|e| e.key().clone()).collect()
    }
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-expiry and whole-chain PCR for one snapshot
fn compute_pcrs(snapshot: &ChainSnapshot) -> HashMap<(Option<NaiveDate>, PcrKind), Pcr> {
    let mut out = HashMap::new();
    for kind in [PcrKind::Volume, PcrKind::OpenInterest] {
        out.insert((None, kind), pcr(snapshot, kind, None, &StrikeFilter::All));
        for expiry in snapshot.expiries() {
            out.insert(
                (Some(expiry), kind),
                pcr(snapshot, kind, Some(expiry), &StrikeFilter::All),
            );
        }
    }
    out
}

/// Mean IV and mean Greeks across one expiry's resolved contracts
fn expiry_means(
    snapshot: &ChainSnapshot,
    expiry: NaiveDate,
    records: &HashMap<ContractKey, ContractRecord>,
) -> Vec<(Metric, f64)> {
    let mut sigmas: Vec<f64> = Vec::new();
    let mut greeks: Vec<Greeks> = Vec::new();

    for contract in snapshot.by_expiry(expiry) {
        if let Some(record) = records.get(&contract.key()) {
            if let (SolveStatus::Converged, Some(sigma)) = (record.vol.status, record.vol.sigma) {
                sigmas.push(sigma);
            }
            if let GreeksResult::Value(g) = record.greeks {
                greeks.push(g);
            }
        }
    }

    let mut out = Vec::new();
    if !sigmas.is_empty() {
        out.push((
            Metric::MeanIv,
            sigmas.iter().sum::<f64>() / sigmas.len() as f64,
        ));
    }
    if !greeks.is_empty() {
        let n = greeks.len() as f64;
        let total = greeks.iter().fold(Greeks::default(), |acc, g| acc.add(g));
        out.push((Metric::MeanDelta, total.delta / n));
        out.push((Metric::MeanGamma, total.gamma / n));
        out.push((Metric::MeanTheta, total.theta / n));
        out.push((Metric::MeanVega, total.vega / n));
        out.push((Metric::MeanRho, total.rho / n));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BlackScholes;
    use chrono::{Duration, TimeZone};

    fn ts(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap() + Duration::minutes(minutes)
    }

    fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 2).unwrap()
    }

    /// Chain with one call priced exactly at the model price for sigma, plus
    /// a put for the ratio side
    fn snapshot_at(minutes: i64, sigma: f64, ctx: &MarketContext) -> ChainSnapshot {
        let quote = Quote {
            spot: ctx.spot,
            strike: 100.0,
            time_to_expiry: 0.5,
            rate: ctx.risk_free_rate,
            dividend_yield: ctx.dividend_yield,
            option_type: OptionType::Call,
            market_price: 0.0,
        };
        let call_price = BlackScholes.price(&quote, sigma);
        let put_price = BlackScholes.price(
            &Quote {
                option_type: OptionType::Put,
                ..quote
            },
            sigma,
        );

        // Expiry sits half a year past the snapshot date, matching the
        // 0.5-year quote the reference price was computed from
        let as_of = ts(minutes).date_naive();
        let days = (expiry() - as_of).num_days();
        assert!((days as f64 / 365.25 - 0.5).abs() < 0.01);

        ChainSnapshot::from_contracts(
            "QQQ",
            ts(minutes),
            vec![
                Contract::new(
                    "QQQ",
                    expiry(),
                    100.0,
                    OptionType::Call,
                    Some(call_price),
                    None,
                    None,
                    400,
                    1000,
                )
                .unwrap(),
                Contract::new(
                    "QQQ",
                    expiry(),
                    100.0,
                    OptionType::Put,
                    Some(put_price),
                    None,
                    None,
                    300,
                    2000,
                )
                .unwrap(),
            ],
        )
        .unwrap()
    }

    fn ctx() -> MarketContext {
        MarketContext::new(100.0, 0.01, 0.0)
    }

    #[test]
    fn test_ingest_and_query_roundtrip() {
        let engine = AnalyticsEngine::new();
        let snapshot = snapshot_at(0, 0.2, &ctx());

        let summary = engine.ingest(&snapshot, ctx()).unwrap();
        assert_eq!(summary.contracts, 2);
        assert_eq!(summary.skipped, 0);

        // The call was priced from sigma = 0.2 and must solve back to it
        let vol = engine
            .implied_volatility("QQQ", expiry(), 100.0, OptionType::Call, ts(0))
            .unwrap();
        assert!(vol.is_converged());
        assert!((vol.sigma.unwrap() - 0.2).abs() < 0.001);

        let greeks = engine
            .greeks("QQQ", expiry(), 100.0, OptionType::Call, ts(0))
            .unwrap();
        let g = greeks.value().unwrap();
        assert!(g.delta > 0.0 && g.delta < 1.0);

        let ratio = engine
            .pcr("QQQ", PcrKind::Volume, Some(expiry()), ts(0))
            .unwrap();
        assert!((ratio.value().unwrap() - 0.75).abs() < 1e-9);

        // Unknown keys answer None, not errors
        assert!(engine
            .implied_volatility("SPY", expiry(), 100.0, OptionType::Call, ts(0))
            .is_none());
        assert!(engine
            .implied_volatility("QQQ", expiry(), 101.0, OptionType::Call, ts(0))
            .is_none());
    }

    #[test]
    fn test_out_of_order_snapshot_rejected() {
        let engine = AnalyticsEngine::new();
        engine.ingest(&snapshot_at(10, 0.2, &ctx()), ctx()).unwrap();

        let err = engine
            .ingest(&snapshot_at(10, 0.2, &ctx()), ctx())
            .unwrap_err();
        assert!(matches!(err, EngineError::OutOfOrderSnapshot { .. }));

        let err = engine
            .ingest(&snapshot_at(5, 0.2, &ctx()), ctx())
            .unwrap_err();
        assert!(matches!(err, EngineError::OutOfOrderSnapshot { .. }));

        // Other underlyings are unaffected by QQQ's clock
        let mut other = snapshot_at(5, 0.2, &ctx());
        other.underlying = "SPY".to_string();
        assert!(engine.ingest(&other, ctx()).is_ok());
    }

    #[test]
    fn test_unchanged_contracts_are_reused() {
        let engine = AnalyticsEngine::new();

        let first = engine.ingest(&snapshot_at(0, 0.2, &ctx()), ctx()).unwrap();
        assert_eq!(first.reused, 0);

        // Same prices, same context, one minute later: both solves reused
        let second = engine.ingest(&snapshot_at(1, 0.2, &ctx()), ctx()).unwrap();
        assert_eq!(second.reused, 2);
        assert_eq!(second.solved + second.invalid + second.did_not_converge, 0);

        // A spot move invalidates the memo
        let moved = MarketContext::new(101.0, 0.01, 0.0);
        let third = engine.ingest(&snapshot_at(2, 0.2, &moved), moved).unwrap();
        assert_eq!(third.reused, 0);
    }

    #[test]
    fn test_as_of_returns_point_in_time_values() {
        let engine = AnalyticsEngine::new();
        engine.ingest(&snapshot_at(0, 0.2, &ctx()), ctx()).unwrap();
        engine.ingest(&snapshot_at(10, 0.3, &ctx()), ctx()).unwrap();

        let early = engine
            .implied_volatility("QQQ", expiry(), 100.0, OptionType::Call, ts(5))
            .unwrap();
        assert!((early.sigma.unwrap() - 0.2).abs() < 0.001);

        let late = engine
            .implied_volatility("QQQ", expiry(), 100.0, OptionType::Call, ts(10))
            .unwrap();
        assert!((late.sigma.unwrap() - 0.3).abs() < 0.001);

        // Before any snapshot there is nothing to answer with
        assert!(engine
            .implied_volatility("QQQ", expiry(), 100.0, OptionType::Call, ts(-1))
            .is_none());
    }

    #[test]
    fn test_window_aggregate_tracks_mean_iv() {
        let engine = AnalyticsEngine::new();
        engine.ingest(&snapshot_at(0, 0.2, &ctx()), ctx()).unwrap();
        engine.ingest(&snapshot_at(10, 0.3, &ctx()), ctx()).unwrap();
        engine.ingest(&snapshot_at(20, 0.4, &ctx()), ctx()).unwrap();

        let stats = engine
            .window_aggregate("QQQ", Some(expiry()), Metric::MeanIv)
            .unwrap();
        assert_eq!(stats.count, 3);
        assert!((stats.mean - 0.3).abs() < 0.001);
        assert!((stats.min - 0.2).abs() < 0.001);
        assert!((stats.max - 0.4).abs() < 0.001);

        // Whole-chain volume PCR series is keyed under expiry = None
        let chain_stats = engine
            .window_aggregate("QQQ", None, Metric::VolumePcr)
            .unwrap();
        assert_eq!(chain_stats.count, 3);
        assert!((chain_stats.latest - 0.75).abs() < 1e-9);

        assert_eq!(
            engine.metric_as_of("QQQ", None, Metric::VolumePcr, ts(15)),
            Some(0.75)
        );
    }

    #[test]
    fn test_degenerate_contract_is_isolated() {
        // One contract priced below intrinsic must not poison its siblings
        let engine = AnalyticsEngine::new();
        let context = MarketContext::new(150.0, 0.01, 0.0);

        let quote = Quote {
            spot: 150.0,
            strike: 150.0,
            time_to_expiry: 0.5,
            rate: 0.01,
            dividend_yield: 0.0,
            option_type: OptionType::Call,
            market_price: 0.0,
        };
        let fair_atm = BlackScholes.price(&quote, 0.25);

        let snapshot = ChainSnapshot::from_contracts(
            "SPY",
            ts(0),
            vec![
                // Deep ITM call priced below intrinsic: arbitrage violation
                Contract::new(
                    "SPY",
                    expiry(),
                    100.0,
                    OptionType::Call,
                    Some(45.0),
                    None,
                    None,
                    10,
                    10,
                )
                .unwrap(),
                Contract::new(
                    "SPY",
                    expiry(),
                    150.0,
                    OptionType::Call,
                    Some(fair_atm),
                    None,
                    None,
                    10,
                    10,
                )
                .unwrap(),
            ],
        )
        .unwrap();

        let summary = engine.ingest(&snapshot, context).unwrap();
        assert_eq!(summary.invalid, 1);
        assert_eq!(summary.solved, 1);

        let bad = engine
            .implied_volatility("SPY", expiry(), 100.0, OptionType::Call, ts(0))
            .unwrap();
        assert!(matches!(bad.status, SolveStatus::Invalid(_)));
        assert!(engine
            .greeks("SPY", expiry(), 100.0, OptionType::Call, ts(0))
            .unwrap()
            .is_unavailable());

        let good = engine
            .implied_volatility("SPY", expiry(), 150.0, OptionType::Call, ts(0))
            .unwrap();
        assert!(good.is_converged());
    }

    #[test]
    fn test_undefined_pcr_is_observable() {
        let engine = AnalyticsEngine::new();

        let snapshot = ChainSnapshot::from_contracts(
            "IWM",
            ts(0),
            vec![
                Contract::new("IWM", expiry(), 200.0, OptionType::Call, None, None, None, 0, 0)
                    .unwrap(),
                Contract::new(
                    "IWM",
                    expiry(),
                    200.0,
                    OptionType::Put,
                    Some(3.0),
                    None,
                    None,
                    500,
                    900,
                )
                .unwrap(),
            ],
        )
        .unwrap();
        engine.ingest(&snapshot, ctx()).unwrap();

        let ratio = engine
            .pcr("IWM", PcrKind::Volume, Some(expiry()), ts(0))
            .unwrap();
        assert!(ratio.is_undefined());

        // Undefined ratios never enter the window series
        assert!(engine
            .window_aggregate("IWM", Some(expiry()), Metric::VolumePcr)
            .is_none());
    }
}

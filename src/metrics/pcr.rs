//! Put-call ratio
//!
//! Aggregates put-side against call-side volume or open interest. A zero
//! call side makes the ratio undefined, and that is reported as a tagged
//! `Undefined`, never infinity or NaN.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::{ChainSnapshot, Contract, OptionType};

/// Which side count feeds the ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PcrKind {
    Volume,
    OpenInterest,
}

/// Put-call ratio outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Pcr {
    Value(f64),
    /// Call side is zero; the ratio does not exist
    Undefined,
}

impl Pcr {
    pub fn value(&self) -> Option<f64> {
        match self {
            Pcr::Value(v) => Some(*v),
            Pcr::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Pcr::Undefined)
    }
}

/// Strike filter applied before aggregation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StrikeFilter {
    /// Every strike
    All,
    /// A single strike
    Exact(f64),
    /// Inclusive strike band
    Range { lower: f64, upper: f64 },
}

impl StrikeFilter {
    pub fn matches(&self, strike: f64) -> bool {
        match self {
            StrikeFilter::All => true,
            StrikeFilter::Exact(target) => (strike - target).abs() < 1e-9,
            StrikeFilter::Range { lower, upper } => strike >= *lower && strike <= *upper,
        }
    }
}

/// Put-call ratio over a snapshot.
///
/// `expiry = None` aggregates the whole chain: totals are summed across all
/// expiries before dividing, so illiquid expiries carry their actual weight
/// instead of an equal per-expiry share.
pub fn pcr(
    snapshot: &ChainSnapshot,
    kind: PcrKind,
    expiry: Option<NaiveDate>,
    strikes: &StrikeFilter,
) -> Pcr {
    let (put_total, call_total) = match expiry {
        Some(expiry) => side_totals(snapshot.by_expiry(expiry), kind, strikes),
        None => side_totals(snapshot.contracts(), kind, strikes),
    };

    if call_total == 0 {
        return Pcr::Undefined;
    }
    Pcr::Value(put_total as f64 / call_total as f64)
}

/// Volume PCR, whole chain or one expiry
pub fn volume_pcr(snapshot: &ChainSnapshot, expiry: Option<NaiveDate>) -> Pcr {
    pcr(snapshot, PcrKind::Volume, expiry, &StrikeFilter::All)
}

/// Open-interest PCR, whole chain or one expiry
pub fn open_interest_pcr(snapshot: &ChainSnapshot, expiry: Option<NaiveDate>) -> Pcr {
    pcr(snapshot, PcrKind::OpenInterest, expiry, &StrikeFilter::All)
}

/// Per-strike PCR table for one expiry, ascending by strike.
///
/// Strikes where the call side is missing or zero report `Undefined` under
/// the same policy as the aggregate.
pub fn pcr_by_strike(snapshot: &ChainSnapshot, kind: PcrKind, expiry: NaiveDate) -> Vec<(f64, Pcr)> {
    snapshot
        .strikes(expiry)
        .into_iter()
        .map(|strike| {
            let (call, put) = snapshot.pair_at(expiry, strike);
            let call_side = call.map_or(0, |c| side_count(c, kind));
            let put_side = put.map_or(0, |p| side_count(p, kind));
            let ratio = if call_side == 0 {
                Pcr::Undefined
            } else {
                Pcr::Value(put_side as f64 / call_side as f64)
            };
            (strike, ratio)
        })
        .collect()
}

fn side_count(contract: &Contract, kind: PcrKind) -> u64 {
    match kind {
        PcrKind::Volume => contract.volume,
        PcrKind::OpenInterest => contract.open_interest,
    }
}

fn side_totals<'a>(
    contracts: impl Iterator<Item = &'a Contract>,
    kind: PcrKind,
    strikes: &StrikeFilter,
) -> (u64, u64) {
    let mut put_total = 0u64;
    let mut call_total = 0u64;
    for contract in contracts.filter(|c| strikes.matches(c.strike)) {
        let count = side_count(contract, kind);
        match contract.option_type {
            OptionType::Put => put_total += count,
            OptionType::Call => call_total += count,
        }
    }
    (put_total, call_total)
}

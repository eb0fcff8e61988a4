//! Chain snapshots
//!
//! A snapshot is a point-in-time, immutable set of quoted contracts for one
//! underlying, keyed by (expiry, strike, type). Duplicate keys within one
//! snapshot are an upstream data defect and reject the snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::contract::{Contract, ContractKey, OptionType};
use super::error::{EngineError, EngineResult};

/// Point-in-time option chain for one underlying
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSnapshot {
    /// Underlying symbol
    pub underlying: String,
    /// Snapshot timestamp (assigned upstream, strictly increasing per underlying)
    pub timestamp: DateTime<Utc>,
    /// Contracts keyed by (expiry, strike, type)
    contracts: BTreeMap<ContractKey, Contract>,
}

impl ChainSnapshot {
    pub fn new(underlying: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            underlying: underlying.into(),
            timestamp,
            contracts: BTreeMap::new(),
        }
    }

    /// Build a snapshot from a batch of contracts.
    ///
    /// Fails on the first key collision; the snapshot as a whole is rejected.
    pub fn from_contracts(
        underlying: impl Into<String>,
        timestamp: DateTime<Utc>,
        contracts: impl IntoIterator<Item = Contract>,
    ) -> EngineResult<Self> {
        let mut snapshot = Self::new(underlying, timestamp);
        for contract in contracts {
            snapshot.insert(contract)?;
        }
        Ok(snapshot)
    }

    /// Insert a contract, rejecting duplicate (expiry, strike, type) keys.
    pub fn insert(&mut self, contract: Contract) -> EngineResult<()> {
        let key = contract.key();
        if self.contracts.contains_key(&key) {
            return Err(EngineError::duplicate_key(format!(
                "{} {} {:?} strike {}",
                self.underlying,
                key.expiry,
                key.option_type,
                key.strike()
            )));
        }
        self.contracts.insert(key, contract);
        Ok(())
    }

    /// Number of contracts in the snapshot
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// All contracts in key order
    pub fn contracts(&self) -> impl Iterator<Item = &Contract> {
        self.contracts.values()
    }

    /// Contract at an exact key, if present
    pub fn get(&self, key: &ContractKey) -> Option<&Contract> {
        self.contracts.get(key)
    }

    /// Contracts for one expiry, in strike order.
    ///
    /// Borrowing range scan over the key order; call again to restart.
    pub fn by_expiry(&self, expiry: NaiveDate) -> impl Iterator<Item = &Contract> {
        self.contracts
            .range(ContractKey::expiry_floor(expiry)..=ContractKey::expiry_ceil(expiry))
            .map(|(_, c)| c)
    }

    /// Contracts at one strike across all expiries
    pub fn by_strike(&self, strike: f64) -> impl Iterator<Item = &Contract> + '_ {
        self.contracts
            .values()
            .filter(move |c| (c.strike - strike).abs() < 1e-9)
    }

    /// Distinct expiries present, ascending
    pub fn expiries(&self) -> Vec<NaiveDate> {
        let mut out: Vec<NaiveDate> = Vec::new();
        for key in self.contracts.keys() {
            if out.last() != Some(&key.expiry) {
                out.push(key.expiry);
            }
        }
        out
    }

    /// Distinct strikes for one expiry, ascending
    pub fn strikes(&self, expiry: NaiveDate) -> Vec<f64> {
        let mut out: Vec<f64> = Vec::new();
        for contract in self.by_expiry(expiry) {
            if out.last().map_or(true, |s| (s - contract.strike).abs() > 1e-9) {
                out.push(contract.strike);
            }
        }
        out
    }

    /// Call and put at a strike for one expiry
    pub fn pair_at(&self, expiry: NaiveDate, strike: f64) -> (Option<&Contract>, Option<&Contract>) {
        let call = self.get(&ContractKey::new(expiry, strike, OptionType::Call));
        let put = self.get(&ContractKey::new(expiry, strike, OptionType::Put));
        (call, put)
    }
}

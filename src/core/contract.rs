//! Option contract definitions
//!
//! Canonical, validated representation of a quoted option contract within a
//! chain snapshot. Contracts are immutable once built; a new snapshot carries
//! new contract instances.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult};

/// Option type (Call or Put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Payoff direction: +1 for call, -1 for put
    pub fn phi(&self) -> f64 {
        match self {
            OptionType::Call => 1.0,
            OptionType::Put => -1.0,
        }
    }

    /// Intrinsic value at given spot
    pub fn intrinsic(&self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionType::Call => (spot - strike).max(0.0),
            OptionType::Put => (strike - spot).max(0.0),
        }
    }
}

/// Strike prices are keyed as integer ticks (price * 10^4, rounded) so keys
/// are exact under `Ord` and `Hash`.
const STRIKE_TICKS: f64 = 10_000.0;

/// Identity of a contract within one snapshot: (expiry, strike, type).
///
/// Ordering is (expiry, strike, type), which lets a `BTreeMap` answer
/// lookup-by-expiry as a contiguous range scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContractKey {
    pub expiry: NaiveDate,
    strike_ticks: i64,
    pub option_type: OptionType,
}

impl ContractKey {
    pub fn new(expiry: NaiveDate, strike: f64, option_type: OptionType) -> Self {
        Self {
            expiry,
            strike_ticks: (strike * STRIKE_TICKS).round() as i64,
            option_type,
        }
    }

    /// Strike price reconstructed from ticks
    pub fn strike(&self) -> f64 {
        self.strike_ticks as f64 / STRIKE_TICKS
    }

    /// Smallest key for an expiry (used as a range bound)
    pub(crate) fn expiry_floor(expiry: NaiveDate) -> Self {
        Self {
            expiry,
            strike_ticks: i64::MIN,
            option_type: OptionType::Call,
        }
    }

    /// Largest key for an expiry (used as a range bound)
    pub(crate) fn expiry_ceil(expiry: NaiveDate) -> Self {
        Self {
            expiry,
            strike_ticks: i64::MAX,
            option_type: OptionType::Put,
        }
    }
}

/// A quoted option contract within a snapshot
///
/// Built through [`Contract::new`], which validates the raw quote fields.
/// All fields are read-only after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    /// Underlying symbol (e.g., "QQQ", "SPY")
    pub underlying: String,
    /// Expiration date
    pub expiry: NaiveDate,
    /// Strike price
    pub strike: f64,
    /// Option type (Call/Put)
    pub option_type: OptionType,
    /// Last traded price
    pub last: Option<f64>,
    /// Bid price
    pub bid: Option<f64>,
    /// Ask price
    pub ask: Option<f64>,
    /// Trading volume
    pub volume: u64,
    /// Open interest
    pub open_interest: u64,
    /// Implied volatility on record (set once solved, if ever)
    pub implied_vol: Option<f64>,
}

impl Contract {
    /// Build a contract from raw quote fields.
    ///
    /// Sizes arrive signed because upstream feeds deliver them that way;
    /// negative volume or open interest fails with a validation error, as do
    /// non-positive or non-finite strikes and negative prices.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        underlying: impl Into<String>,
        expiry: NaiveDate,
        strike: f64,
        option_type: OptionType,
        last: Option<f64>,
        bid: Option<f64>,
        ask: Option<f64>,
        volume: i64,
        open_interest: i64,
    ) -> EngineResult<Self> {
        if !strike.is_finite() || strike <= 0.0 {
            return Err(EngineError::validation(format!(
                "strike must be positive and finite, got {}",
                strike
            )));
        }
        if volume < 0 {
            return Err(EngineError::validation(format!(
                "negative volume {} for strike {}",
                volume, strike
            )));
        }
        if open_interest < 0 {
            return Err(EngineError::validation(format!(
                "negative open interest {} for strike {}",
                open_interest, strike
            )));
        }
        for (name, price) in [("last", last), ("bid", bid), ("ask", ask)] {
            if let Some(p) = price {
                if !p.is_finite() || p < 0.0 {
                    return Err(EngineError::validation(format!(
                        "{} price must be non-negative and finite, got {}",
                        name, p
                    )));
                }
            }
        }

        Ok(Self {
            underlying: underlying.into(),
            expiry,
            strike,
            option_type,
            last,
            bid,
            ask,
            volume: volume as u64,
            open_interest: open_interest as u64,
            implied_vol: None,
        })
    }

    /// Snapshot-local identity key
    pub fn key(&self) -> ContractKey {
        ContractKey::new(self.expiry, self.strike, self.option_type)
    }

    /// Mid price from bid/ask, falling back to last
    pub fn market_price(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(b), Some(a)) => Some((b + a) / 2.0),
            _ => self.last,
        }
    }

    /// Time to expiry in years from given date
    pub fn time_to_expiry(&self, from: NaiveDate) -> f64 {
        let days = (self.expiry - from).num_days();
        days as f64 / 365.25
    }

    /// Is this option in the money?
    pub fn is_itm(&self, spot: f64) -> bool {
        match self.option_type {
            OptionType::Call => spot > self.strike,
            OptionType::Put => spot < self.strike,
        }
    }

    /// Is this option at the money (within relative tolerance)?
    pub fn is_atm(&self, spot: f64, tolerance: f64) -> bool {
        (self.strike - spot).abs() / spot < tolerance
    }
}

/// Third Friday of a month, the standard monthly listing date.
pub fn third_friday(year: i32, month: u32) -> NaiveDate {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .expect("valid year/month for expiry calculation");
    let days_until_friday = (Weekday::Fri.num_days_from_monday() as i64
        - first.weekday().num_days_from_monday() as i64
        + 7)
        % 7;
    first + chrono::Duration::days(days_until_friday + 14)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 20).unwrap()
    }

    #[test]
    fn test_option_type() {
        assert_eq!(OptionType::Call.phi(), 1.0);
        assert_eq!(OptionType::Put.phi(), -1.0);

        assert_eq!(OptionType::Call.intrinsic(110.0, 100.0), 10.0);
        assert_eq!(OptionType::Put.intrinsic(90.0, 100.0), 10.0);
        assert_eq!(OptionType::Call.intrinsic(90.0, 100.0), 0.0);
    }

    #[test]
    fn test_valid_contract() {
        let c = Contract::new(
            "QQQ",
            expiry(),
            500.0,
            OptionType::Call,
            Some(10.2),
            Some(10.0),
            Some(10.5),
            1200,
            5000,
        )
        .unwrap();

        assert_eq!(c.volume, 1200);
        assert_eq!(c.open_interest, 5000);
        assert!((c.market_price().unwrap() - 10.25).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_strike() {
        let err = Contract::new(
            "QQQ",
            expiry(),
            0.0,
            OptionType::Call,
            None,
            None,
            None,
            0,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = Contract::new(
            "QQQ",
            expiry(),
            -100.0,
            OptionType::Put,
            None,
            None,
            None,
            0,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_rejects_negative_sizes() {
        let err = Contract::new(
            "QQQ",
            expiry(),
            500.0,
            OptionType::Call,
            None,
            None,
            None,
            -1,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = Contract::new(
            "QQQ",
            expiry(),
            500.0,
            OptionType::Call,
            None,
            None,
            None,
            0,
            -10,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_market_price_fallback() {
        let c = Contract::new(
            "QQQ",
            expiry(),
            500.0,
            OptionType::Call,
            Some(9.8),
            None,
            Some(10.5),
            0,
            0,
        )
        .unwrap();

        // One-sided book falls back to last
        assert_eq!(c.market_price(), Some(9.8));
    }

    #[test]
    fn test_key_roundtrip() {
        let key = ContractKey::new(expiry(), 512.5, OptionType::Put);
        assert!((key.strike() - 512.5).abs() < 1e-9);

        // Keys for the same expiry sort inside the expiry range bounds
        assert!(ContractKey::expiry_floor(expiry()) <= key);
        assert!(key <= ContractKey::expiry_ceil(expiry()));
    }

    #[test]
    fn test_third_friday() {
        // November 2024: Fridays were 1, 8, 15, 22, 29
        assert_eq!(
            third_friday(2024, 11),
            NaiveDate::from_ymd_opt(2024, 11, 15).unwrap()
        );
        // June 2025: Fridays were 6, 13, 20, 27
        assert_eq!(
            third_friday(2025, 6),
            NaiveDate::from_ymd_opt(2025, 6, 20).unwrap()
        );
        assert_eq!(third_friday(2025, 6).weekday(), Weekday::Fri);
    }

    #[test]
    fn test_moneyness() {
        let c = Contract::new(
            "QQQ",
            expiry(),
            500.0,
            OptionType::Call,
            None,
            None,
            None,
            0,
            0,
        )
        .unwrap();

        assert!(c.is_atm(500.0, 0.01));
        assert!(c.is_itm(510.0));
        assert!(!c.is_itm(490.0));
    }
}

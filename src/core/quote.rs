//! Solver inputs
//!
//! A `Quote` is the minimal pricing input handed to the volatility solver:
//! one contract's market price plus the deterministic model inputs. It is
//! derived from a contract and the snapshot's market context.

use serde::{Deserialize, Serialize};

use super::contract::{Contract, OptionType};

/// Market context supplied alongside a snapshot by the ingestion collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    /// Underlying spot price
    pub spot: f64,
    /// Continuously compounded risk-free rate
    pub risk_free_rate: f64,
    /// Continuous dividend yield
    pub dividend_yield: f64,
}

impl MarketContext {
    pub fn new(spot: f64, risk_free_rate: f64, dividend_yield: f64) -> Self {
        Self {
            spot,
            risk_free_rate,
            dividend_yield,
        }
    }
}

/// Minimal pricing input for one contract
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Underlying spot price
    pub spot: f64,
    /// Strike price
    pub strike: f64,
    /// Time to expiry in years (>= 0; zero only at the expiry boundary)
    pub time_to_expiry: f64,
    /// Continuously compounded risk-free rate
    pub rate: f64,
    /// Continuous dividend yield
    pub dividend_yield: f64,
    /// Option type
    pub option_type: OptionType,
    /// Observed market price of the option
    pub market_price: f64,
}

impl Quote {
    /// Derive a quote from a contract plus market context.
    ///
    /// Returns `None` when the contract has no usable market price (empty
    /// book and no last trade); such contracts are skipped, not errors.
    pub fn from_contract(
        contract: &Contract,
        ctx: &MarketContext,
        as_of: chrono::NaiveDate,
    ) -> Option<Self> {
        let market_price = contract.market_price()?;
        Some(Self {
            spot: ctx.spot,
            strike: contract.strike,
            time_to_expiry: contract.time_to_expiry(as_of).max(0.0),
            rate: ctx.risk_free_rate,
            dividend_yield: ctx.dividend_yield,
            option_type: contract.option_type,
            market_price,
        })
    }

    /// Forward price under the quote's carry
    pub fn forward(&self) -> f64 {
        self.spot * ((self.rate - self.dividend_yield) * self.time_to_expiry).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_from_contract() {
        let expiry = NaiveDate::from_ymd_opt(2025, 12, 19).unwrap();
        let as_of = NaiveDate::from_ymd_opt(2025, 6, 19).unwrap();
        let contract = Contract::new(
            "QQQ",
            expiry,
            500.0,
            OptionType::Call,
            None,
            Some(10.0),
            Some(10.4),
            50,
            100,
        )
        .unwrap();

        let ctx = MarketContext::new(505.0, 0.05, 0.01);
        let quote = Quote::from_contract(&contract, &ctx, as_of).unwrap();

        assert_eq!(quote.market_price, 10.2);
        assert_eq!(quote.spot, 505.0);
        // Half a year out, within a day either side
        assert!(quote.time_to_expiry > 0.49 && quote.time_to_expiry < 0.51);
    }

    #[test]
    fn test_no_price_no_quote() {
        let expiry = NaiveDate::from_ymd_opt(2025, 12, 19).unwrap();
        let as_of = NaiveDate::from_ymd_opt(2025, 6, 19).unwrap();
        let contract =
            Contract::new("QQQ", expiry, 500.0, OptionType::Call, None, None, None, 0, 0).unwrap();

        let ctx = MarketContext::new(505.0, 0.05, 0.0);
        assert!(Quote::from_contract(&contract, &ctx, as_of).is_none());
    }

    #[test]
    fn test_forward_carry() {
        let quote = Quote {
            spot: 100.0,
            strike: 100.0,
            time_to_expiry: 0.5,
            rate: 0.05,
            dividend_yield: 0.01,
            option_type: OptionType::Call,
            market_price: 5.0,
        };

        // Positive carry puts the forward above spot
        assert!(quote.forward() > 100.0);
        assert!((quote.forward() - 100.0 * (0.04_f64 * 0.5).exp()).abs() < 1e-12);
    }
}

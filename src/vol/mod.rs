//! Implied volatility solver
//!
//! Inverts a pricing model to recover the volatility that reproduces an
//! observed market price. Hybrid root search: Newton-Raphson while vega is
//! healthy and the iterate stays inside the bracket, bisection steps
//! otherwise. The solver sees the model only through the [`PricingModel`]
//! capability, so any model exposing price and vega plugs in unchanged.
//!
//! Economically degenerate inputs (expired, priced under intrinsic, priced
//! over the no-arbitrage cap) are reported as `Invalid` without searching.
//! The search itself is fully deterministic.

use serde::{Deserialize, Serialize};

use crate::core::{OptionType, Quote};
use crate::models::PricingModel;

/// Solver tuning, supplied at engine construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Absolute price tolerance for convergence
    /// Default: 1e-4
    pub price_tolerance: f64,

    /// Optional relative tolerance; convergence also accepted when
    /// |residual| < relative_tolerance * market_price
    /// Default: None
    pub relative_tolerance: Option<f64>,

    /// Iteration cap across Newton and bisection steps
    /// Default: 100
    pub max_iterations: u32,

    /// Lower volatility bracket bound
    /// Default: 1e-6
    pub bracket_lo: f64,

    /// Upper volatility bracket bound
    /// Default: 5.0
    pub bracket_hi: f64,

    /// Below this |vega| the Newton step is abandoned for bisection
    /// Default: 1e-8
    pub vega_floor: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            price_tolerance: 1e-4,
            relative_tolerance: None,
            max_iterations: 100,
            bracket_lo: 1e-6,
            bracket_hi: 5.0,
            vega_floor: 1e-8,
        }
    }
}

impl SolverConfig {
    /// Tight settings: an order of magnitude tighter price tolerance
    pub fn tight() -> Self {
        Self {
            price_tolerance: 1e-5,
            ..Default::default()
        }
    }

    /// Fast settings: looser tolerance, smaller cap
    pub fn fast() -> Self {
        Self {
            price_tolerance: 1e-3,
            max_iterations: 32,
            ..Default::default()
        }
    }
}

/// Why a quote could not be solved at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidQuote {
    /// Time to expiry <= 0; the contract is at or past expiry
    Expired,
    /// Market price <= 0
    NonPositivePrice,
    /// Market price below discounted intrinsic value
    BelowIntrinsic,
    /// Market price above the no-arbitrage cap (call: spot carry, put:
    /// discounted strike)
    AboveUpperBound,
}

/// Outcome classification of one solve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SolveStatus {
    Converged,
    DidNotConverge,
    Invalid(InvalidQuote),
}

/// Result of solving one quote. Produced once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityResult {
    /// Solved volatility when converged; best iterate when the search
    /// exhausted its cap; absent for invalid inputs
    pub sigma: Option<f64>,
    pub status: SolveStatus,
    /// Iterations consumed
    pub iterations: u32,
    /// |model price - market price| at the reported sigma
    pub residual: f64,
}

impl VolatilityResult {
    pub fn converged(sigma: f64, iterations: u32, residual: f64) -> Self {
        Self {
            sigma: Some(sigma),
            status: SolveStatus::Converged,
            iterations,
            residual,
        }
    }

    pub fn did_not_converge(best_sigma: f64, iterations: u32, residual: f64) -> Self {
        Self {
            sigma: Some(best_sigma),
            status: SolveStatus::DidNotConverge,
            iterations,
            residual,
        }
    }

    pub fn invalid(reason: InvalidQuote) -> Self {
        Self {
            sigma: None,
            status: SolveStatus::Invalid(reason),
            iterations: 0,
            residual: f64::NAN,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self.status, SolveStatus::Converged)
    }
}

/// Implied-volatility solver bound to a configuration
pub struct IvSolver {
    config: SolverConfig,
}

impl IvSolver {
    pub fn new() -> Self {
        Self {
            config: SolverConfig::default(),
        }
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve for the volatility reproducing the quote's market price.
    pub fn solve(&self, model: &dyn PricingModel, quote: &Quote) -> VolatilityResult {
        if let Some(reason) = self.validate(quote) {
            return VolatilityResult::invalid(reason);
        }

        let cfg = &self.config;
        let target = quote.market_price;

        // Bracket maintained by price monotonicity in sigma
        let mut lo = cfg.bracket_lo;
        let mut hi = cfg.bracket_hi;

        let mut sigma = initial_guess(quote).clamp(lo, hi);
        let mut best_sigma = sigma;
        let mut best_residual = f64::INFINITY;
        let mut iterations = 0;

        for iteration in 1..=cfg.max_iterations {
            iterations = iteration;
            let price = model.price(quote, sigma);
            let diff = price - target;
            let residual = diff.abs();

            if residual < best_residual {
                best_residual = residual;
                best_sigma = sigma;
            }

            if self.converged(residual, target) {
                return VolatilityResult::converged(sigma, iteration, residual);
            }

            // Tighten the bracket around the root
            if diff > 0.0 {
                hi = sigma;
            } else {
                lo = sigma;
            }

            let vega = model.vega(quote, sigma);
            let newton = if vega.abs() < cfg.vega_floor {
                None
            } else {
                let candidate = sigma - diff / vega;
                // A Newton iterate outside the open bracket is not trusted
                (candidate > lo && candidate < hi).then_some(candidate)
            };

            sigma = newton.unwrap_or_else(|| 0.5 * (lo + hi));

            if hi - lo < f64::EPSILON {
                break;
            }
        }

        VolatilityResult::did_not_converge(best_sigma, iterations, best_residual)
    }

    fn converged(&self, residual: f64, target: f64) -> bool {
        if residual < self.config.price_tolerance {
            return true;
        }
        match self.config.relative_tolerance {
            Some(rel) => residual < rel * target.abs(),
            None => false,
        }
    }

    /// No-arbitrage screening before any search
    fn validate(&self, quote: &Quote) -> Option<InvalidQuote> {
        if quote.time_to_expiry <= 0.0 {
            return Some(InvalidQuote::Expired);
        }
        if quote.market_price <= 0.0 {
            return Some(InvalidQuote::NonPositivePrice);
        }

        let t = quote.time_to_expiry;
        let df = (-quote.rate * t).exp();
        let carry = (-quote.dividend_yield * t).exp();

        // Discounted intrinsic on the forward is the model's zero-vol price
        let lower = df * quote.option_type.intrinsic(quote.forward(), quote.strike);
        if quote.market_price < lower - 1e-12 {
            return Some(InvalidQuote::BelowIntrinsic);
        }

        let upper = match quote.option_type {
            OptionType::Call => quote.spot * carry,
            OptionType::Put => quote.strike * df,
        };
        if quote.market_price > upper + 1e-12 {
            return Some(InvalidQuote::AboveUpperBound);
        }

        None
    }
}

impl Default for IvSolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Brenner-Subrahmanyam ATM approximation, the deterministic starting point
fn initial_guess(quote: &Quote) -> f64 {
    let approx = quote.market_price / (0.4 * quote.spot * quote.time_to_expiry.sqrt());
    if approx.is_finite() && approx > 0.0 {
        approx
    } else {
        0.2
    }
}

//! Risk sensitivities
//!
//! Greeks are only meaningful relative to a solved volatility, so the
//! calculator takes the paired [`VolatilityResult`] and reports
//! `Unavailable` whenever that solve did not converge.

use serde::{Deserialize, Serialize};

use crate::core::Quote;
use crate::models::PricingModel;
use crate::vol::{SolveStatus, VolatilityResult};

/// Option sensitivities
///
/// Theta is per calendar day; vega and rho are per 1% move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    /// Delta: dV/dS
    pub delta: f64,
    /// Gamma: d2V/dS2
    pub gamma: f64,
    /// Theta: dV/dt
    pub theta: f64,
    /// Vega: dV/dsigma
    pub vega: f64,
    /// Rho: dV/dr
    pub rho: f64,
}

impl Greeks {
    pub fn new(delta: f64, gamma: f64, theta: f64, vega: f64, rho: f64) -> Self {
        Self {
            delta,
            gamma,
            theta,
            vega,
            rho,
        }
    }

    /// Scale by a factor (e.g., position size)
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            delta: self.delta * factor,
            gamma: self.gamma * factor,
            theta: self.theta * factor,
            vega: self.vega * factor,
            rho: self.rho * factor,
        }
    }

    /// Sum with another set (e.g., across legs)
    pub fn add(&self, other: &Greeks) -> Self {
        Self {
            delta: self.delta + other.delta,
            gamma: self.gamma + other.gamma,
            theta: self.theta + other.theta,
            vega: self.vega + other.vega,
            rho: self.rho + other.rho,
        }
    }
}

/// Greeks outcome for one contract
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GreeksResult {
    /// Sensitivities at the converged volatility
    Value(Greeks),
    /// No converged volatility to differentiate at
    Unavailable,
}

impl GreeksResult {
    pub fn value(&self) -> Option<Greeks> {
        match self {
            GreeksResult::Value(g) => Some(*g),
            GreeksResult::Unavailable => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, GreeksResult::Unavailable)
    }
}

/// Compute all five Greeks for a quote at its solved volatility.
///
/// The model computes them in one pass from shared intermediate terms, so
/// the set is internally consistent at a single sigma.
pub fn compute_greeks(
    model: &dyn PricingModel,
    quote: &Quote,
    vol: &VolatilityResult,
) -> GreeksResult {
    match (vol.status, vol.sigma) {
        (SolveStatus::Converged, Some(sigma)) => GreeksResult::Value(model.greeks(quote, sigma)),
        _ => GreeksResult::Unavailable,
    }
}

//! Pricing models
//!
//! The solver and the Greeks calculator are written against the
//! [`PricingModel`] capability rather than any concrete formula, so a model
//! is anything that can price a quote at a volatility and differentiate that
//! price with respect to volatility.

pub mod black_scholes;

pub use black_scholes::BlackScholes;

use serde::{Deserialize, Serialize};

use crate::core::Quote;
use crate::metrics::greeks::Greeks;

/// Capability required of a pricing model.
///
/// `price` and `vega` drive the implied-volatility root search; `greeks`
/// produces all five sensitivities in one pass from the same intermediate
/// terms so they stay mutually consistent.
pub trait PricingModel: Send + Sync {
    /// Theoretical price of the quote's contract at volatility `sigma`
    fn price(&self, quote: &Quote, sigma: f64) -> f64;

    /// d(price)/d(sigma) at volatility `sigma`
    fn vega(&self, quote: &Quote, sigma: f64) -> f64;

    /// All five sensitivities at volatility `sigma`, computed together
    fn greeks(&self, quote: &Quote, sigma: f64) -> Greeks;
}

/// Pricing-model choice, supplied at engine construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    /// Black-Scholes-Merton with continuous dividend yield
    #[default]
    BlackScholes,
}

impl ModelKind {
    /// Instantiate the selected model
    pub fn build(&self) -> std::sync::Arc<dyn PricingModel> {
        match self {
            ModelKind::BlackScholes => std::sync::Arc::new(BlackScholes),
        }
    }
}

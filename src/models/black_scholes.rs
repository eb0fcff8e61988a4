//! Black-Scholes-Merton model
//!
//! Provides:
//! - European option pricing with continuous dividend yield
//! - Vega for the volatility root search
//! - One-pass closed-form Greeks
//!
//! The formulas work off the forward, so dividend yield flows through d1/d2
//! and every sensitivity consistently.

use std::f64::consts::PI;

use statrs::distribution::{ContinuousCDF, Normal};

use super::PricingModel;
use crate::core::{OptionType, Quote};
use crate::metrics::greeks::Greeks;

/// Standard normal CDF
pub fn norm_cdf(x: f64) -> f64 {
    let normal = Normal::new(0.0, 1.0).unwrap();
    normal.cdf(x)
}

/// Standard normal PDF
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Black-Scholes d1 parameter
pub fn d1(spot: f64, strike: f64, rate: f64, div: f64, vol: f64, time: f64) -> f64 {
    let forward = spot * ((rate - div) * time).exp();
    ((forward / strike).ln() + 0.5 * vol * vol * time) / (vol * time.sqrt())
}

/// Black-Scholes d2 parameter
pub fn d2(spot: f64, strike: f64, rate: f64, div: f64, vol: f64, time: f64) -> f64 {
    d1(spot, strike, rate, div, vol, time) - vol * time.sqrt()
}

/// Black-Scholes-Merton pricing model
#[derive(Debug, Clone, Copy, Default)]
pub struct BlackScholes;

impl PricingModel for BlackScholes {
    fn price(&self, quote: &Quote, sigma: f64) -> f64 {
        let (spot, strike, rate, div, time) = unpack(quote);

        if time <= 0.0 {
            return quote.option_type.intrinsic(spot, strike);
        }

        if sigma <= 0.0 {
            // Zero vol: discounted intrinsic on the forward
            let forward = spot * ((rate - div) * time).exp();
            let df = (-rate * time).exp();
            return df * quote.option_type.intrinsic(forward, strike);
        }

        let d1 = d1(spot, strike, rate, div, sigma, time);
        let d2 = d2(spot, strike, rate, div, sigma, time);
        let df = (-rate * time).exp();
        let forward = spot * ((rate - div) * time).exp();

        match quote.option_type {
            OptionType::Call => df * (forward * norm_cdf(d1) - strike * norm_cdf(d2)),
            OptionType::Put => df * (strike * norm_cdf(-d2) - forward * norm_cdf(-d1)),
        }
    }

    fn vega(&self, quote: &Quote, sigma: f64) -> f64 {
        let (spot, strike, rate, div, time) = unpack(quote);

        if time <= 0.0 || sigma <= 0.0 {
            return 0.0;
        }

        let d1 = d1(spot, strike, rate, div, sigma, time);
        spot * (-div * time).exp() * norm_pdf(d1) * time.sqrt()
    }

    fn greeks(&self, quote: &Quote, sigma: f64) -> Greeks {
        let (spot, strike, rate, div, time) = unpack(quote);

        if time <= 0.0 || sigma <= 0.0 {
            // At expiry or zero vol the option behaves like its payoff
            let delta = match quote.option_type {
                OptionType::Call => {
                    if spot > strike {
                        1.0
                    } else {
                        0.0
                    }
                }
                OptionType::Put => {
                    if spot < strike {
                        -1.0
                    } else {
                        0.0
                    }
                }
            };
            return Greeks::new(delta, 0.0, 0.0, 0.0, 0.0);
        }

        let d1 = d1(spot, strike, rate, div, sigma, time);
        let d2 = d2(spot, strike, rate, div, sigma, time);
        let df = (-rate * time).exp();
        let div_factor = (-div * time).exp();
        let sqrt_t = time.sqrt();
        let pdf_d1 = norm_pdf(d1);

        let delta = match quote.option_type {
            OptionType::Call => div_factor * norm_cdf(d1),
            OptionType::Put => div_factor * (norm_cdf(d1) - 1.0),
        };

        // Gamma and vega are type-independent
        let gamma = div_factor * pdf_d1 / (spot * sigma * sqrt_t);
        let vega = spot * div_factor * pdf_d1 * sqrt_t / 100.0;

        // Theta per day
        let term1 = -spot * div_factor * pdf_d1 * sigma / (2.0 * sqrt_t);
        let theta = match quote.option_type {
            OptionType::Call => {
                term1 - rate * strike * df * norm_cdf(d2) + div * spot * div_factor * norm_cdf(d1)
            }
            OptionType::Put => {
                term1 + rate * strike * df * norm_cdf(-d2) - div * spot * div_factor * norm_cdf(-d1)
            }
        };
        let theta_per_day = theta / 365.0;

        // Rho per 1% rate move
        let rho = match quote.option_type {
            OptionType::Call => strike * time * df * norm_cdf(d2) / 100.0,
            OptionType::Put => -strike * time * df * norm_cdf(-d2) / 100.0,
        };

        Greeks::new(delta, gamma, theta_per_day, vega, rho)
    }
}

fn unpack(quote: &Quote) -> (f64, f64, f64, f64, f64) {
    (
        quote.spot,
        quote.strike,
        quote.rate,
        quote.dividend_yield,
        quote.time_to_expiry,
    )
}

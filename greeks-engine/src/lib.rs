// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Black-Scholes pricing, implied-volatility inversion and display-scaled Greeks.

use core_types::{round2, OptionKind};
use libm::erf;
use std::f64::consts::SQRT_2;

pub const MIN_VOL: f64 = 1e-4;
pub const MAX_VOL: f64 = 5.0;
pub const FALLBACK_VOL: f64 = 0.15;
const IV_TOLERANCE: f64 = 1e-4;
const IV_MAX_ITERS: usize = 100;
const VEGA_FLOOR: f64 = 1e-8;
// A 1e-3 vol error must move the price by well over the tolerance, else the
// residual cannot tell volatilities apart.
const VOL_RESOLUTION: f64 = 1e-3;
const MIN_RELIABLE_VEGA: f64 = 10.0 * IV_TOLERANCE / VOL_RESOLUTION;
const INV_SQRT_TWO_PI: f64 = 0.3989422804014327;
const DAYS_PER_YEAR: f64 = 365.0;

/// Raw Black-Scholes outputs: price plus per-unit sensitivities (theta per year, vega per 1.0 vol).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GreeksResult {
    pub price: f64,
    pub delta: f64,
    pub gamma: f64,
    pub vega: f64,
    pub theta: f64,
}

/// Display convention: gamma x100, theta per calendar day, vega per vol point, all to 2 dp.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplayGreeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
}

impl From<&GreeksResult> for DisplayGreeks {
    fn from(raw: &GreeksResult) -> Self {
        Self {
            delta: round2(raw.delta),
            gamma: round2(raw.gamma * 100.0),
            theta: round2(raw.theta / DAYS_PER_YEAR),
            vega: round2(raw.vega / 100.0),
        }
    }
}

/// Price and Greeks. `None` when any of spot, strike, vol or tau is non-positive or the math degenerates.
pub fn bs_price_and_greeks(
    kind: OptionKind,
    spot: f64,
    strike: f64,
    rate: f64,
    vol: f64,
    tau: f64,
) -> Option<GreeksResult> {
    if !(spot > 0.0 && strike > 0.0 && vol > 0.0 && tau > 0.0) {
        return None;
    }
    let sqrt_tau = tau.sqrt();
    let denom = vol * sqrt_tau;
    if !denom.is_finite() || denom <= 0.0 {
        return None;
    }
    let log_term = (spot / strike).ln();
    if !log_term.is_finite() {
        return None;
    }
    let d1 = (log_term + (rate + 0.5 * vol * vol) * tau) / denom;
    let d2 = d1 - denom;
    let disc_r = (-rate * tau).exp();
    let pdf_d1 = norm_pdf(d1);
    let gamma = pdf_d1 / (spot * denom);
    let vega = spot * pdf_d1 * sqrt_tau;
    if !gamma.is_finite() || !vega.is_finite() {
        return None;
    }
    let decay = -spot * pdf_d1 * vol / (2.0 * sqrt_tau);
    let (price, delta, theta) = match kind {
        OptionKind::Call => {
            let nd1 = norm_cdf(d1);
            let nd2 = norm_cdf(d2);
            (
                spot * nd1 - strike * disc_r * nd2,
                nd1,
                decay - rate * strike * disc_r * nd2,
            )
        }
        OptionKind::Put => {
            let nneg_d1 = norm_cdf(-d1);
            let nneg_d2 = norm_cdf(-d2);
            (
                strike * disc_r * nneg_d2 - spot * nneg_d1,
                norm_cdf(d1) - 1.0,
                decay + rate * strike * disc_r * nneg_d2,
            )
        }
    };
    Some(GreeksResult {
        price,
        delta,
        gamma,
        vega,
        theta,
    })
}

pub fn bs_price(
    kind: OptionKind,
    spot: f64,
    strike: f64,
    rate: f64,
    vol: f64,
    tau: f64,
) -> Option<f64> {
    bs_price_and_greeks(kind, spot, strike, rate, vol, tau).map(|res| res.price)
}

/// Display-scaled Greeks at a known volatility.
pub fn display_greeks(
    kind: OptionKind,
    spot: f64,
    strike: f64,
    rate: f64,
    vol: f64,
    tau: f64,
) -> Option<DisplayGreeks> {
    bs_price_and_greeks(kind, spot, strike, rate, vol, tau).map(|res| DisplayGreeks::from(&res))
}

/// Inverts Black-Scholes for volatility in (MIN_VOL, MAX_VOL).
///
/// Newton steps on analytic vega, kept inside a shrinking bisection bracket.
/// `None` when the target is outside the attainable price range, the search
/// does not converge within the iteration cap, or the price is too insensitive
/// to volatility at the solution (deep ITM or near-worthless OTM near expiry).
pub fn try_solve_implied_vol(
    target: f64,
    kind: OptionKind,
    spot: f64,
    strike: f64,
    rate: f64,
    tau: f64,
) -> Option<f64> {
    if !(target.is_finite() && target > 0.0 && spot > 0.0 && strike > 0.0 && tau > 0.0) {
        return None;
    }
    let floor = bs_price(kind, spot, strike, rate, MIN_VOL, tau)?;
    let ceiling = bs_price(kind, spot, strike, rate, MAX_VOL, tau)?;
    if target < floor - IV_TOLERANCE || target > ceiling + IV_TOLERANCE {
        return None;
    }

    let (mut lo, mut hi) = (MIN_VOL, MAX_VOL);
    let mut sigma = initial_guess(target, spot, tau);
    for _ in 0..IV_MAX_ITERS {
        let res = bs_price_and_greeks(kind, spot, strike, rate, sigma, tau)?;
        let diff = res.price - target;
        if diff.abs() < IV_TOLERANCE {
            return (res.vega >= MIN_RELIABLE_VEGA).then_some(sigma);
        }
        if diff > 0.0 {
            hi = sigma;
        } else {
            lo = sigma;
        }
        let newton = if res.vega > VEGA_FLOOR {
            sigma - diff / res.vega
        } else {
            f64::NAN
        };
        sigma = if newton.is_finite() && newton > lo && newton < hi {
            newton
        } else {
            0.5 * (lo + hi)
        };
        if hi - lo < f64::EPSILON {
            break;
        }
    }
    None
}

/// Implied volatility, or [`FALLBACK_VOL`] when no reliable value exists.
pub fn solve_implied_vol(
    target: f64,
    kind: OptionKind,
    spot: f64,
    strike: f64,
    rate: f64,
    tau: f64,
) -> f64 {
    try_solve_implied_vol(target, kind, spot, strike, rate, tau).unwrap_or(FALLBACK_VOL)
}

// Brenner-Subrahmanyam ATM approximation.
fn initial_guess(target: f64, spot: f64, tau: f64) -> f64 {
    let guess = (2.0 * std::f64::consts::PI / tau).sqrt() * target / spot;
    if guess.is_finite() {
        guess.clamp(0.05, 2.0)
    } else {
        0.3
    }
}

fn norm_pdf(x: f64) -> f64 {
    INV_SQRT_TWO_PI * (-0.5 * x * x).exp()
}

fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

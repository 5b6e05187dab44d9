// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Turns a raw option chain into per-strike rows with IV, Greeks, activity percentiles and PCR.

pub mod mock;

use core_types::config::PricingConfig;
use core_types::{round2, ActivityPercentiles, Contract, Greeks, OptionKind, Row};
use greeks_engine::{display_greeks, try_solve_implied_vol};
use log::debug;
use thiserror::Error;

const DAYS_PER_YEAR: f64 = 365.0;
const STRIKE_EPSILON: f64 = 1e-9;

pub use mock::{base_price_for, mock_quote, mock_snapshot, MOCK_STRIKES};

#[derive(Debug, Error, PartialEq)]
pub enum AggregationError {
    #[error("insufficient side data: {calls} calls, {puts} puts")]
    InsufficientSideData { calls: usize, puts: usize },
    #[error("call/put sides differ in length: {calls} calls, {puts} puts")]
    MismatchedSides { calls: usize, puts: usize },
    #[error("strikes misaligned at position {position}: call {call_strike}, put {put_strike}")]
    MisalignedStrike {
        position: usize,
        call_strike: f64,
        put_strike: f64,
    },
    #[error("duplicate strike {strike}")]
    DuplicateStrike { strike: f64 },
}

/// Aggregation output; the cache adds symbol, expiry, strike count and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedChain {
    pub spot: f64,
    pub rows: Vec<Row>,
    pub pcr: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ChainAggregator {
    pricing: PricingConfig,
}

impl ChainAggregator {
    pub fn new(pricing: PricingConfig) -> Self {
        Self { pricing }
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    pub fn aggregate(
        &self,
        symbol: &str,
        spot: f64,
        contracts: &[Contract],
        days_to_expiry: i64,
        lot_size: u32,
    ) -> Result<AggregatedChain, AggregationError> {
        let (calls, puts) = split_sides(contracts);
        if calls.is_empty() || puts.is_empty() {
            return Err(AggregationError::InsufficientSideData {
                calls: calls.len(),
                puts: puts.len(),
            });
        }
        if calls.len() != puts.len() {
            return Err(AggregationError::MismatchedSides {
                calls: calls.len(),
                puts: puts.len(),
            });
        }
        check_strikes(&calls, &puts)?;

        let call_max = SideMaxima::of(&calls);
        let put_max = SideMaxima::of(&puts);
        let tau = days_to_expiry.max(1) as f64 / DAYS_PER_YEAR;
        let rows = calls
            .iter()
            .zip(puts.iter())
            .map(|(call, put)| Row {
                strike: call.strike,
                call: Some(call.in_lots(lot_size)),
                put: Some(put.in_lots(lot_size)),
                call_greeks: self.price_side(call, spot, tau),
                put_greeks: self.price_side(put, spot, tau),
                call_activity: call_max.percentiles(call),
                put_activity: put_max.percentiles(put),
            })
            .collect::<Vec<_>>();
        let pcr = put_call_ratio(&calls, &puts);
        debug!(
            "[{}] aggregated {} strikes (spot={}, dte={}, lot={}, pcr={})",
            symbol,
            rows.len(),
            spot,
            days_to_expiry,
            lot_size,
            pcr
        );
        Ok(AggregatedChain { spot, rows, pcr })
    }

    /// IV (percent) and display Greeks for one side; degenerate when inputs cannot be priced.
    pub fn price_side(&self, contract: &Contract, spot: f64, tau: f64) -> Greeks {
        let price = contract.last_price;
        let strike = contract.strike;
        if !(price > 0.0 && spot > 0.0 && strike > 0.0 && tau > 0.0) {
            return Greeks::DEGENERATE;
        }
        let rate = self.pricing.risk_free_rate;
        let sigma = try_solve_implied_vol(price, contract.kind, spot, strike, rate, tau)
            .unwrap_or(self.pricing.fallback_volatility);
        match display_greeks(contract.kind, spot, strike, rate, sigma, tau) {
            Some(greeks) => Greeks {
                implied_vol: round2(sigma * 100.0),
                delta: greeks.delta,
                gamma: greeks.gamma,
                theta: greeks.theta,
                vega: greeks.vega,
            },
            None => Greeks::DEGENERATE,
        }
    }
}

fn split_sides(contracts: &[Contract]) -> (Vec<&Contract>, Vec<&Contract>) {
    let (mut calls, mut puts): (Vec<&Contract>, Vec<&Contract>) = contracts
        .iter()
        .partition(|contract| contract.kind == OptionKind::Call);
    calls.sort_by(|a, b| a.strike.total_cmp(&b.strike));
    puts.sort_by(|a, b| a.strike.total_cmp(&b.strike));
    (calls, puts)
}

fn check_strikes(calls: &[&Contract], puts: &[&Contract]) -> Result<(), AggregationError> {
    for (position, (call, put)) in calls.iter().zip(puts.iter()).enumerate() {
        if (call.strike - put.strike).abs() > STRIKE_EPSILON {
            return Err(AggregationError::MisalignedStrike {
                position,
                call_strike: call.strike,
                put_strike: put.strike,
            });
        }
    }
    for pair in calls.windows(2) {
        if (pair[1].strike - pair[0].strike).abs() <= STRIKE_EPSILON {
            return Err(AggregationError::DuplicateStrike {
                strike: pair[0].strike,
            });
        }
    }
    Ok(())
}

/// Same-side maxima of raw (pre lot-size) open interest and volume.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SideMaxima {
    oi: u64,
    volume: u64,
}

impl SideMaxima {
    pub(crate) fn of(side: &[&Contract]) -> Self {
        side.iter().fold(Self::default(), |acc, contract| Self {
            oi: acc.oi.max(contract.open_interest),
            volume: acc.volume.max(contract.volume),
        })
    }

    pub(crate) fn percentiles(&self, contract: &Contract) -> ActivityPercentiles {
        ActivityPercentiles {
            oi_pct: percent_of_max(contract.open_interest, self.oi),
            volume_pct: percent_of_max(contract.volume, self.volume),
        }
    }
}

fn percent_of_max(value: u64, max: u64) -> f64 {
    if max == 0 {
        return 0.0;
    }
    round2(100.0 * value as f64 / max as f64).clamp(0.0, 100.0)
}

/// Total put OI over total call OI, rounded to 2 dp; 0 without call OI.
pub fn put_call_ratio(calls: &[&Contract], puts: &[&Contract]) -> f64 {
    let call_oi: u128 = calls.iter().map(|c| u128::from(c.open_interest)).sum();
    let put_oi: u128 = puts.iter().map(|c| u128::from(c.open_interest)).sum();
    if call_oi == 0 {
        return 0.0;
    }
    round2(put_oi as f64 / call_oi as f64)
}

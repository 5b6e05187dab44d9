// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Synthetic chains for when neither live nor cached data exists.

use chrono::Utc;
use core_types::{round2, Contract, Greeks, OptionKind, Provenance, QuoteSummary, Row, Snapshot};
use rand::Rng;

use crate::{put_call_ratio, SideMaxima};

pub const MOCK_STRIKES: usize = 11;
const STRIKE_STEP: f64 = 50.0;
const INDEX_BASE_PRICE: f64 = 24_000.0;
const OTHER_BASE_PRICE: f64 = 50_000.0;
const QUOTE_JITTER: f64 = 200.0;

/// Index-like symbols (anything containing NIFTY) centre on 24000, everything else on 50000.
pub fn base_price_for(symbol: &str) -> f64 {
    if symbol.to_ascii_uppercase().contains("NIFTY") {
        INDEX_BASE_PRICE
    } else {
        OTHER_BASE_PRICE
    }
}

/// Quote within +/-200 points of the base price, with the base as previous close.
pub fn mock_quote<R: Rng>(symbol: &str, rng: &mut R) -> QuoteSummary {
    let base = base_price_for(symbol);
    let last_price = base + rng.gen_range(-QUOTE_JITTER..=QUOTE_JITTER);
    let change = last_price - base;
    QuoteSummary::from_change(last_price, change, change / base * 100.0)
}

/// Eleven strikes around the base price with random activity and degenerate Greeks.
pub fn mock_snapshot<R: Rng>(
    symbol: &str,
    expiry: &str,
    strike_count: u32,
    rng: &mut R,
) -> Snapshot {
    let base = base_price_for(symbol);
    let half = (MOCK_STRIKES / 2) as i64;
    let mut calls = Vec::with_capacity(MOCK_STRIKES);
    let mut puts = Vec::with_capacity(MOCK_STRIKES);
    for offset in -half..=half {
        let strike = base + offset as f64 * STRIKE_STEP;
        calls.push(mock_contract(OptionKind::Call, strike, rng));
        puts.push(mock_contract(OptionKind::Put, strike, rng));
    }
    let call_refs: Vec<&Contract> = calls.iter().collect();
    let put_refs: Vec<&Contract> = puts.iter().collect();
    let call_max = SideMaxima::of(&call_refs);
    let put_max = SideMaxima::of(&put_refs);
    let pcr = put_call_ratio(&call_refs, &put_refs);
    let rows = calls
        .iter()
        .zip(puts.iter())
        .map(|(call, put)| Row {
            strike: call.strike,
            call: Some(call.clone()),
            put: Some(put.clone()),
            call_greeks: Greeks::DEGENERATE,
            put_greeks: Greeks::DEGENERATE,
            call_activity: call_max.percentiles(call),
            put_activity: put_max.percentiles(put),
        })
        .collect();
    let quote = mock_quote(symbol, rng);
    Snapshot {
        symbol: symbol.to_string(),
        expiry: expiry.to_string(),
        strike_count,
        fetched_at: Utc::now(),
        spot: quote.last_price,
        quote: Some(quote),
        rows,
        pcr,
        provenance: Provenance::Mock,
    }
}

fn mock_contract<R: Rng>(kind: OptionKind, strike: f64, rng: &mut R) -> Contract {
    Contract {
        strike,
        kind,
        last_price: round2(rng.gen_range(10.0..500.0)),
        price_change: round2(rng.gen_range(-50.0..50.0)),
        open_interest: rng.gen_range(1_000..=50_000),
        oi_change: rng.gen_range(-100..=100),
        volume: rng.gen_range(100..=5_000),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn base_price_follows_symbol_family() {
        assert_eq!(base_price_for("NSE:NIFTY50-INDEX"), 24_000.0);
        assert_eq!(base_price_for("nse:niftybank-index"), 24_000.0);
        assert_eq!(base_price_for("BSE:SENSEX-INDEX"), 50_000.0);
    }

    #[test]
    fn mock_snapshot_is_internally_consistent() {
        let mut rng = StdRng::seed_from_u64(7);
        let snap = mock_snapshot("NSE:NIFTY50-INDEX", "30-10-2025", 10, &mut rng);
        assert!(snap.is_mock());
        assert_eq!(snap.rows.len(), MOCK_STRIKES);
        assert_eq!(snap.rows[0].strike, 23_750.0);
        assert_eq!(snap.rows[MOCK_STRIKES - 1].strike, 24_250.0);
        assert!(snap.rows.windows(2).all(|w| w[0].strike < w[1].strike));
        assert!((snap.spot - 24_000.0).abs() <= 200.0);
        assert_eq!(snap.quote.unwrap().previous_close, 24_000.0);

        let call_oi: u64 = snap.rows.iter().map(|r| r.call.as_ref().unwrap().open_interest).sum();
        let put_oi: u64 = snap.rows.iter().map(|r| r.put.as_ref().unwrap().open_interest).sum();
        assert_eq!(snap.pcr, round2(put_oi as f64 / call_oi as f64));
        for row in &snap.rows {
            assert!(row.call_greeks.is_degenerate() && row.put_greeks.is_degenerate());
            for pct in [
                row.call_activity.oi_pct,
                row.call_activity.volume_pct,
                row.put_activity.oi_pct,
                row.put_activity.volume_pct,
            ] {
                assert!((0.0..=100.0).contains(&pct));
            }
        }
        assert!(snap.rows.iter().any(|r| r.call_activity.oi_pct == 100.0));
    }

    #[test]
    fn mock_quote_stays_near_base() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let quote = mock_quote("RELIANCE", &mut rng);
            assert!((quote.last_price - 50_000.0).abs() <= 200.0);
            assert!(quote.change_percent.abs() <= 0.4);
        }
    }
}

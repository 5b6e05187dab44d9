// Copyright (c) James Kassemi, SC, US. All rights reserved.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Option side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    /// Exchange code used by the provider (`CE` / `PE`).
    pub fn code(self) -> &'static str {
        match self {
            OptionKind::Call => "CE",
            OptionKind::Put => "PE",
        }
    }
}

impl FromStr for OptionKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CE" | "C" | "CALL" => Ok(OptionKind::Call),
            "PE" | "P" | "PUT" => Ok(OptionKind::Put),
            other => Err(format!("unknown option kind '{other}'")),
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One contract of the chain as delivered by the quote source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub strike: f64,
    pub kind: OptionKind,
    pub last_price: f64,
    pub price_change: f64,
    pub open_interest: u64,
    pub oi_change: i64,
    pub volume: u64,
}

impl Contract {
    /// Copy with OI, OI change and volume expressed in lots.
    ///
    /// Counts truncate; the signed OI change floors, so `-5 / 2` yields `-3`.
    pub fn in_lots(&self, lot_size: u32) -> Contract {
        let lot = u64::from(lot_size.max(1));
        Contract {
            open_interest: self.open_interest / lot,
            oi_change: self.oi_change.div_euclid(lot as i64),
            volume: self.volume / lot,
            ..self.clone()
        }
    }
}

/// Greeks for one contract. `implied_vol` is in percent, the rest use display scaling.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Greeks {
    pub implied_vol: f64,
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
}

impl Greeks {
    /// All-zero value used whenever pricing inputs are unusable.
    pub const DEGENERATE: Greeks = Greeks {
        implied_vol: 0.0,
        delta: 0.0,
        gamma: 0.0,
        theta: 0.0,
        vega: 0.0,
    };

    pub fn is_degenerate(&self) -> bool {
        *self == Self::DEGENERATE
    }
}

/// Open interest and volume as a percentage of the same-side maximum.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActivityPercentiles {
    pub oi_pct: f64,
    pub volume_pct: f64,
}

/// Combined call/put view of one strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub strike: f64,
    pub call: Option<Contract>,
    pub put: Option<Contract>,
    pub call_greeks: Greeks,
    pub put_greeks: Greeks,
    pub call_activity: ActivityPercentiles,
    pub put_activity: ActivityPercentiles,
}

/// Headline quote for the underlying.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QuoteSummary {
    pub last_price: f64,
    pub previous_close: f64,
    pub change_points: f64,
    pub change_percent: f64,
}

impl QuoteSummary {
    /// Builds a summary from a last price and its point/percent change.
    pub fn from_change(last_price: f64, change_points: f64, change_percent: f64) -> Self {
        Self {
            last_price,
            previous_close: last_price - change_points,
            change_points: round2(change_points),
            change_percent: round2(change_percent),
        }
    }
}

/// Raw option chain as returned by a quote source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OptionChain {
    pub spot: f64,
    pub quote: Option<QuoteSummary>,
    pub contracts: Vec<Contract>,
}

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Live,
    Mock,
}

/// Per-strike analytics for one (symbol, expiry, strike count) selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub symbol: String,
    pub expiry: String,
    pub strike_count: u32,
    pub fetched_at: DateTime<Utc>,
    pub spot: f64,
    pub quote: Option<QuoteSummary>,
    pub rows: Vec<Row>,
    pub pcr: f64,
    pub provenance: Provenance,
}

impl Snapshot {
    pub fn is_mock(&self) -> bool {
        self.provenance == Provenance::Mock
    }
}

/// Half-away-from-zero rounding to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Provider response payloads and their conversion into the domain model.

use core_types::{Contract, OptionChain, OptionKind, QuoteSummary};
use log::debug;
use serde::Deserialize;

use crate::QuoteSourceError;

const OK_CODE: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ChainResponse {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<ChainData>,
}

#[derive(Debug, Deserialize)]
pub struct ChainData {
    #[serde(rename = "optionsChain", default)]
    pub options_chain: Vec<ChainEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ChainEntry {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub option_type: Option<String>,
    #[serde(default)]
    pub strike_price: Option<f64>,
    #[serde(default)]
    pub ltp: Option<f64>,
    #[serde(default)]
    pub ltpch: Option<f64>,
    #[serde(default)]
    pub ltpchp: Option<f64>,
    #[serde(default)]
    pub oi: Option<f64>,
    #[serde(default)]
    pub oich: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl ChainEntry {
    fn is_underlying(&self) -> bool {
        self.option_type
            .as_deref()
            .map(|t| t.trim().is_empty())
            .unwrap_or(true)
    }

    fn to_contract(&self) -> Option<Contract> {
        let kind = self.option_type.as_deref()?.parse::<OptionKind>().ok()?;
        Some(Contract {
            strike: self.strike_price?,
            kind,
            last_price: self.ltp.unwrap_or_default().max(0.0),
            price_change: self.ltpch.unwrap_or_default(),
            open_interest: count(self.oi),
            oi_change: self.oich.unwrap_or_default() as i64,
            volume: count(self.volume),
        })
    }
}

fn count(value: Option<f64>) -> u64 {
    value.filter(|v| v.is_finite()).unwrap_or_default().max(0.0) as u64
}

impl ChainResponse {
    /// The first entry without an option type is the underlying; its LTP is the spot.
    pub fn into_chain(self, symbol: &str) -> Result<OptionChain, QuoteSourceError> {
        if self.code != OK_CODE {
            return Err(QuoteSourceError::Provider {
                code: self.code,
                message: self.message.unwrap_or_default(),
            });
        }
        let entries = self.data.map(|d| d.options_chain).unwrap_or_default();
        if entries.is_empty() {
            return Err(QuoteSourceError::EmptyChain(symbol.to_string()));
        }
        let underlying = entries
            .iter()
            .find(|entry| entry.is_underlying())
            .ok_or_else(|| QuoteSourceError::Decode("missing underlying entry".to_string()))?;
        let spot = underlying.ltp.unwrap_or_default();
        let quote = QuoteSummary::from_change(
            spot,
            underlying.ltpch.unwrap_or_default(),
            underlying.ltpchp.unwrap_or_default(),
        );
        let mut contracts = Vec::with_capacity(entries.len());
        for entry in entries.iter().filter(|entry| !entry.is_underlying()) {
            match entry.to_contract() {
                Some(contract) => contracts.push(contract),
                None => debug!(
                    "[{}] skipping unusable chain entry {:?}",
                    symbol, entry.symbol
                ),
            }
        }
        if contracts.is_empty() {
            return Err(QuoteSourceError::EmptyChain(symbol.to_string()));
        }
        Ok(OptionChain {
            spot,
            quote: Some(quote),
            contracts,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct QuotesResponse {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub d: Vec<QuoteEntry>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteEntry {
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub v: Option<QuoteValues>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteValues {
    #[serde(default)]
    pub lp: Option<f64>,
    #[serde(default)]
    pub ch: Option<f64>,
    #[serde(default)]
    pub chp: Option<f64>,
}

impl QuotesResponse {
    pub fn into_quote(self, symbol: &str) -> Result<QuoteSummary, QuoteSourceError> {
        if self.code != OK_CODE {
            return Err(QuoteSourceError::Provider {
                code: self.code,
                message: self.message.unwrap_or_default(),
            });
        }
        let values = self
            .d
            .into_iter()
            .find(|entry| entry.n.as_deref().map_or(true, |n| n == symbol))
            .and_then(|entry| entry.v)
            .ok_or_else(|| QuoteSourceError::Decode(format!("no quote for {symbol}")))?;
        let last_price = values
            .lp
            .filter(|lp| lp.is_finite() && *lp > 0.0)
            .ok_or_else(|| QuoteSourceError::Decode(format!("no last price for {symbol}")))?;
        Ok(QuoteSummary::from_change(
            last_price,
            values.ch.unwrap_or_default(),
            values.chp.unwrap_or_default(),
        ))
    }
}

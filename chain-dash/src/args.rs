// Copyright (c) James Kassemi, SC, US. All rights reserved.
use core_types::SymbolCatalog;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgsError {
    #[error("usage: chain-dash <symbol> [expiry DD-MM-YYYY] [strike_count]")]
    Usage,
    #[error("invalid strike count {0:?}")]
    StrikeCount(String),
    #[error("no expiry given and none listed for {0}")]
    NoExpiry(String),
}

/// Command line selection before catalog and config defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashArgs {
    pub symbol: String,
    pub expiry: Option<String>,
    pub strike_count: Option<u32>,
}

/// Fully resolved selection to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub symbol: String,
    pub expiry: String,
    pub strike_count: u32,
}

impl DashArgs {
    pub fn parse<I>(args: I) -> Result<Self, ArgsError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let symbol = args
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ArgsError::Usage)?;
        let expiry = args.next().map(|s| s.trim().to_string());
        let strike_count = match args.next() {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => Some(n),
                _ => return Err(ArgsError::StrikeCount(raw)),
            },
            None => None,
        };
        if args.next().is_some() {
            return Err(ArgsError::Usage);
        }
        Ok(Self {
            symbol,
            expiry,
            strike_count,
        })
    }

    pub fn resolve(
        self,
        catalog: &SymbolCatalog,
        default_strike_count: u32,
    ) -> Result<Selection, ArgsError> {
        let expiry = match self.expiry {
            Some(expiry) => expiry,
            None => catalog
                .expiries_for(&self.symbol)
                .first()
                .cloned()
                .ok_or_else(|| ArgsError::NoExpiry(self.symbol.clone()))?,
        };
        Ok(Selection {
            symbol: self.symbol,
            expiry,
            strike_count: self.strike_count.unwrap_or(default_strike_count).max(1),
        })
    }
}

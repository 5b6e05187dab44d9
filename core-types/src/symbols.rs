// Copyright (c) James Kassemi, SC, US. All rights reserved.
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Symbol to lot-size lookup. Implementations must return at least 1.
pub trait LotSizes: Send + Sync {
    fn lot_size_of(&self, symbol: &str) -> u32;
}

/// Operator-maintained symbol metadata (lot sizes and recognized expiries).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolCatalog {
    #[serde(default)]
    pub lot_sizes: HashMap<String, u32>,
    #[serde(default)]
    pub expiry_dates: HashMap<String, Vec<String>>,
}

#[derive(Debug, Error)]
pub enum SymbolCatalogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog json: {0}")]
    Json(#[from] serde_json::Error),
}

impl SymbolCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SymbolCatalogError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, SymbolCatalogError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn expiries_for(&self, symbol: &str) -> &[String] {
        self.expiry_dates
            .get(symbol)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn with_lot_size(mut self, symbol: impl Into<String>, lot_size: u32) -> Self {
        self.lot_sizes.insert(symbol.into(), lot_size);
        self
    }
}

impl LotSizes for SymbolCatalog {
    fn lot_size_of(&self, symbol: &str) -> u32 {
        self.lot_sizes.get(symbol).copied().unwrap_or(1).max(1)
    }
}

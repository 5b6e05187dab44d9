// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Shared data model, configuration, expiry handling and symbol metadata for the option chain engine.

pub mod config;
pub mod expiry;
pub mod retry;
pub mod symbols;
pub mod types;

pub use config::AppConfig;
pub use symbols::{LotSizes, SymbolCatalog};
pub use types::{
    round2, ActivityPercentiles, Contract, Greeks, OptionChain, OptionKind, Provenance,
    QuoteSummary, Row, Snapshot,
};

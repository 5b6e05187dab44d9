// Copyright (c) James Kassemi, SC, US. All rights reserved.
use std::sync::Arc;

use chain_aggregator::mock_quote;
use core_types::expiry::expiry_timestamp;
use core_types::{QuoteSummary, Snapshot};
use log::warn;
use quote_source::QuoteSource;

use crate::cache::{CacheKey, SnapshotCache};

/// Entry point for callers: cached snapshots and headline quotes for a symbol.
#[derive(Clone)]
pub struct OptionChainService {
    source: Arc<dyn QuoteSource>,
    cache: SnapshotCache,
}

impl OptionChainService {
    pub fn new(source: Arc<dyn QuoteSource>, cache: SnapshotCache) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// Never fails: live, last good, or mock, in that order of preference.
    pub async fn get_snapshot(
        &self,
        symbol: &str,
        expiry: &str,
        strike_count: u32,
    ) -> Arc<Snapshot> {
        let key = CacheKey::new(symbol, expiry, strike_count);
        let source = Arc::clone(&self.source);
        let selection = key.clone();
        self.cache
            .get(&key, move || async move {
                let expiry_ts = expiry_timestamp(&selection.expiry)?;
                source
                    .fetch_option_chain(&selection.symbol, expiry_ts, selection.strike_count)
                    .await
            })
            .await
    }

    /// Live quote, or a synthetic one near the symbol's base price.
    pub async fn get_quote(&self, symbol: &str) -> QuoteSummary {
        match self.source.fetch_quote(symbol).await {
            Ok(quote) => quote,
            Err(err) => {
                warn!("[{}] quote fetch failed, serving mock quote: {}", symbol, err);
                mock_quote(symbol, &mut rand::thread_rng())
            }
        }
    }
}

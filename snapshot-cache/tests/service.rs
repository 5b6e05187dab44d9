// Copyright (c) James Kassemi, SC, US. All rights reserved.
use std::sync::Arc;
use std::time::Duration;

use chain_aggregator::ChainAggregator;
use core_types::config::PricingConfig;
use core_types::{Contract, OptionChain, OptionKind, QuoteSummary, SymbolCatalog};
use parking_lot::Mutex;
use quote_source::{QuoteSource, QuoteSourceError, UnavailableQuoteSource};
use snapshot_cache::{CacheKey, OptionChainService, SnapshotCache};

const SYMBOL: &str = "NSE:NIFTY50-INDEX";
const EXPIRY: &str = "30-10-2025";

#[derive(Default)]
struct RecordingSource {
    requests: Mutex<Vec<(String, i64, u32)>>,
}

#[async_trait::async_trait]
impl QuoteSource for RecordingSource {
    async fn fetch_option_chain(
        &self,
        symbol: &str,
        expiry_ts: i64,
        strike_count: u32,
    ) -> Result<OptionChain, QuoteSourceError> {
        self.requests
            .lock()
            .push((symbol.to_string(), expiry_ts, strike_count));
        let side = |kind, strike: f64, ltp| Contract {
            strike,
            kind,
            last_price: ltp,
            price_change: 0.0,
            open_interest: 7_500,
            oi_change: -150,
            volume: 15_000,
        };
        Ok(OptionChain {
            spot: 24_000.0,
            quote: Some(QuoteSummary::from_change(24_000.0, 120.0, 0.5)),
            contracts: vec![
                side(OptionKind::Call, 23_950.0, 180.0),
                side(OptionKind::Put, 23_950.0, 95.0),
                side(OptionKind::Call, 24_000.0, 150.0),
                side(OptionKind::Put, 24_000.0, 120.0),
            ],
        })
    }

    async fn fetch_quote(&self, _symbol: &str) -> Result<QuoteSummary, QuoteSourceError> {
        Ok(QuoteSummary::from_change(24_000.0, 120.0, 0.5))
    }
}

fn service(source: Arc<dyn QuoteSource>) -> OptionChainService {
    let lots = SymbolCatalog::default().with_lot_size(SYMBOL, 75);
    let cache = SnapshotCache::new(
        Duration::from_secs(2),
        ChainAggregator::new(PricingConfig::default()),
        Arc::new(lots),
    );
    OptionChainService::new(source, cache)
}

#[tokio::test]
async fn live_snapshot_passes_expiry_timestamp_upstream() {
    let source = Arc::new(RecordingSource::default());
    let svc = service(source.clone());

    let snap = svc.get_snapshot(SYMBOL, EXPIRY, 10).await;
    assert!(!snap.is_mock());
    assert_eq!(snap.rows.len(), 2);
    assert_eq!(snap.pcr, 1.0);
    assert_eq!(snap.quote.unwrap().change_points, 120.0);
    let call = snap.rows[1].call.as_ref().unwrap();
    assert_eq!(call.open_interest, 100);
    assert_eq!(call.oi_change, -2);
    assert_eq!(call.volume, 200);
    assert!(snap.rows[1].call_greeks.implied_vol > 0.0);

    let again = svc.get_snapshot(SYMBOL, EXPIRY, 10).await;
    assert!(Arc::ptr_eq(&snap, &again));
    assert_eq!(
        *source.requests.lock(),
        vec![(SYMBOL.to_string(), 1_761_818_400, 10)]
    );
}

#[tokio::test]
async fn invalid_expiry_never_reaches_upstream() {
    let source = Arc::new(RecordingSource::default());
    let svc = service(source.clone());

    let snap = svc.get_snapshot(SYMBOL, "2025-10-30", 10).await;
    assert!(snap.is_mock());
    assert!(source.requests.lock().is_empty());
    assert!(svc
        .cache()
        .entry(&CacheKey::new(SYMBOL, "2025-10-30", 10))
        .is_none());
}

#[tokio::test]
async fn unavailable_source_falls_back_to_mocks() {
    let svc = service(Arc::new(UnavailableQuoteSource::new("no credentials")));

    let snap = svc.get_snapshot("BSE:SENSEX-INDEX", EXPIRY, 10).await;
    assert!(snap.is_mock());
    assert_eq!(snap.rows.first().unwrap().strike, 49_750.0);

    let quote = svc.get_quote("BSE:SENSEX-INDEX").await;
    assert!((quote.last_price - 50_000.0).abs() <= 200.0);
    assert_eq!(quote.previous_close, 50_000.0);
}

#[tokio::test]
async fn live_quote_is_passed_through() {
    let svc = service(Arc::new(RecordingSource::default()));
    let quote = svc.get_quote(SYMBOL).await;
    assert_eq!(quote.last_price, 24_000.0);
    assert_eq!(quote.previous_close, 23_880.0);
}

// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! TTL cache of aggregated snapshots with one upstream refresh per key at a time.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chain_aggregator::{mock_snapshot, AggregationError, ChainAggregator};
use chrono::Utc;
use core_types::expiry::{days_to_expiry, exchange_today};
use core_types::{LotSizes, OptionChain, Provenance, Snapshot};
use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use quote_source::QuoteSourceError;
use thiserror::Error;
use tokio::time::Instant;

use crate::metrics::CacheMetrics;

/// Identity of a cached snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub expiry: String,
    pub strike_count: u32,
}

impl CacheKey {
    pub fn new(symbol: impl Into<String>, expiry: impl Into<String>, strike_count: u32) -> Self {
        Self {
            symbol: symbol.into(),
            expiry: expiry.into(),
            strike_count,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.symbol, self.expiry, self.strike_count)
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub snapshot: Arc<Snapshot>,
    pub stored_at: Instant,
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] QuoteSourceError),
    #[error("aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),
}

type SharedRefresh = Shared<BoxFuture<'static, Arc<Snapshot>>>;

#[derive(Default)]
struct KeySlot {
    entry: RwLock<Option<CacheEntry>>,
    inflight: Mutex<Option<SharedRefresh>>,
}

impl KeySlot {
    fn fresh(&self, ttl: Duration) -> Option<Arc<Snapshot>> {
        self.entry
            .read()
            .as_ref()
            .filter(|entry| entry.stored_at.elapsed() < ttl)
            .map(|entry| Arc::clone(&entry.snapshot))
    }

    fn last_known(&self) -> Option<Arc<Snapshot>> {
        self.entry
            .read()
            .as_ref()
            .map(|entry| Arc::clone(&entry.snapshot))
    }

    fn store(&self, snapshot: Arc<Snapshot>) {
        *self.entry.write() = Some(CacheEntry {
            snapshot,
            stored_at: Instant::now(),
        });
    }
}

struct CacheInner {
    ttl: Duration,
    aggregator: ChainAggregator,
    lot_sizes: Arc<dyn LotSizes>,
    slots: Mutex<HashMap<CacheKey, Arc<KeySlot>>>,
    metrics: CacheMetrics,
}

/// Snapshot cache keyed by (symbol, expiry, strike count).
///
/// Fresh entries are served without touching upstream. A stale or missing entry
/// triggers a single refresh task per key; concurrent callers await that task.
/// The task runs detached, so a caller that stops waiting does not cancel it.
/// When a refresh fails the previous snapshot is served unchanged, or a mock
/// snapshot if the key has never been populated. Mocks are never stored.
#[derive(Clone)]
pub struct SnapshotCache {
    inner: Arc<CacheInner>,
}

impl SnapshotCache {
    pub fn new(ttl: Duration, aggregator: ChainAggregator, lot_sizes: Arc<dyn LotSizes>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                ttl,
                aggregator,
                lot_sizes,
                slots: Mutex::new(HashMap::new()),
                metrics: CacheMetrics::new(),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.inner.metrics.clone()
    }

    /// Stored entry for `key`, fresh or not.
    pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        let slot = self.inner.slots.lock().get(key).cloned()?;
        let entry = slot.entry.read().clone();
        entry
    }

    pub fn len(&self) -> usize {
        self.inner
            .slots
            .lock()
            .values()
            .filter(|slot| slot.entry.read().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a snapshot for `key`, calling `fetch` only when the entry is stale or
    /// missing and no refresh for the key is already running.
    pub async fn get<F, Fut>(&self, key: &CacheKey, fetch: F) -> Arc<Snapshot>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<OptionChain, QuoteSourceError>> + Send + 'static,
    {
        let metrics = &self.inner.metrics;
        metrics.record_request();
        let slot = self.slot(key);
        if let Some(snapshot) = slot.fresh(self.inner.ttl) {
            metrics.record_fresh_hit();
            debug!("[{}] cache hit", key);
            return snapshot;
        }

        let refresh = {
            let mut inflight = slot.inflight.lock();
            // A refresh may have landed between the first check and taking the lock.
            if let Some(snapshot) = slot.fresh(self.inner.ttl) {
                metrics.record_fresh_hit();
                return snapshot;
            }
            match inflight.as_ref() {
                Some(pending) => {
                    metrics.record_coalesced();
                    debug!("[{}] joining in-flight refresh", key);
                    pending.clone()
                }
                None => {
                    let pending = self.spawn_refresh(key.clone(), Arc::clone(&slot), fetch);
                    *inflight = Some(pending.clone());
                    pending
                }
            }
        };
        refresh.await
    }

    fn slot(&self, key: &CacheKey) -> Arc<KeySlot> {
        let mut slots = self.inner.slots.lock();
        if let Some(slot) = slots.get(key) {
            return Arc::clone(slot);
        }
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    // Caller holds the slot's inflight lock; the task clears it once the entry is settled.
    fn spawn_refresh<F, Fut>(&self, key: CacheKey, slot: Arc<KeySlot>, fetch: F) -> SharedRefresh
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<OptionChain, QuoteSourceError>> + Send + 'static,
    {
        self.inner.metrics.record_upstream_fetch();
        debug!("[{}] refreshing from upstream", key);
        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let task_slot = Arc::clone(&slot);
        let handle = tokio::spawn(async move {
            let snapshot = inner.refresh(&task_key, &task_slot, fetch).await;
            task_slot.inflight.lock().take();
            snapshot
        });

        let inner = Arc::clone(&self.inner);
        async move {
            match handle.await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    error!("[{}] refresh task failed: {}", key, err);
                    inner.metrics.record_refresh_failed();
                    slot.inflight.lock().take();
                    inner.fallback(&key, &slot)
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl CacheInner {
    async fn refresh<F, Fut>(&self, key: &CacheKey, slot: &KeySlot, fetch: F) -> Arc<Snapshot>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<OptionChain, QuoteSourceError>>,
    {
        match self.fetch_and_aggregate(key, fetch).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                slot.store(Arc::clone(&snapshot));
                self.metrics.record_refresh_success();
                info!(
                    "[{}] stored snapshot: {} strikes, spot={}, pcr={}",
                    key,
                    snapshot.rows.len(),
                    snapshot.spot,
                    snapshot.pcr
                );
                snapshot
            }
            Err(err) => {
                self.metrics.record_refresh_failed();
                warn!("[{}] refresh failed: {}", key, err);
                self.fallback(key, slot)
            }
        }
    }

    async fn fetch_and_aggregate<F, Fut>(
        &self,
        key: &CacheKey,
        fetch: F,
    ) -> Result<Snapshot, RefreshError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<OptionChain, QuoteSourceError>>,
    {
        let chain = fetch().await?;
        let now = Utc::now();
        let days = days_to_expiry(
            &key.expiry,
            exchange_today(now),
            self.aggregator.pricing().default_days_to_expiry,
        );
        let lot_size = self.lot_sizes.lot_size_of(&key.symbol);
        let aggregated = self.aggregator.aggregate(
            &key.symbol,
            chain.spot,
            &chain.contracts,
            days,
            lot_size,
        )?;
        Ok(Snapshot {
            symbol: key.symbol.clone(),
            expiry: key.expiry.clone(),
            strike_count: key.strike_count,
            fetched_at: now,
            spot: aggregated.spot,
            quote: chain.quote,
            rows: aggregated.rows,
            pcr: aggregated.pcr,
            provenance: Provenance::Live,
        })
    }

    fn fallback(&self, key: &CacheKey, slot: &KeySlot) -> Arc<Snapshot> {
        match slot.last_known() {
            Some(previous) => {
                self.metrics.record_stale_served();
                warn!(
                    "[{}] serving last good snapshot from {}",
                    key, previous.fetched_at
                );
                previous
            }
            None => {
                self.metrics.record_mock_served();
                warn!("[{}] no snapshot available, serving mock data", key);
                Arc::new(mock_snapshot(
                    &key.symbol,
                    &key.expiry,
                    key.strike_count,
                    &mut rand::thread_rng(),
                ))
            }
        }
    }
}

// Copyright (c) James Kassemi, SC, US. All rights reserved.
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

#[derive(Default)]
struct CacheMetricsInner {
    requests: AtomicU64,
    fresh_hits: AtomicU64,
    upstream_fetches: AtomicU64,
    refresh_success: AtomicU64,
    refresh_failed: AtomicU64,
    stale_served: AtomicU64,
    mock_served: AtomicU64,
    coalesced_waiters: AtomicU64,
}

/// Shared counters for snapshot requests and upstream refreshes.
#[derive(Clone, Default)]
pub struct CacheMetrics {
    inner: Arc<CacheMetricsInner>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheMetricsSnapshot {
    pub requests: u64,
    pub fresh_hits: u64,
    pub upstream_fetches: u64,
    pub refresh_success: u64,
    pub refresh_failed: u64,
    pub stale_served: u64,
    pub mock_served: u64,
    pub coalesced_waiters: u64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.inner.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fresh_hit(&self) {
        self.inner.fresh_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_fetch(&self) {
        self.inner.upstream_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh_success(&self) {
        self.inner.refresh_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh_failed(&self) {
        self.inner.refresh_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_served(&self) {
        self.inner.stale_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mock_served(&self) {
        self.inner.mock_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_coalesced(&self) {
        self.inner.coalesced_waiters.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            requests: self.inner.requests.load(Ordering::Relaxed),
            fresh_hits: self.inner.fresh_hits.load(Ordering::Relaxed),
            upstream_fetches: self.inner.upstream_fetches.load(Ordering::Relaxed),
            refresh_success: self.inner.refresh_success.load(Ordering::Relaxed),
            refresh_failed: self.inner.refresh_failed.load(Ordering::Relaxed),
            stale_served: self.inner.stale_served.load(Ordering::Relaxed),
            mock_served: self.inner.mock_served.load(Ordering::Relaxed),
            coalesced_waiters: self.inner.coalesced_waiters.load(Ordering::Relaxed),
        }
    }
}

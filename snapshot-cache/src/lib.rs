// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Snapshot caching and the request-facing option chain service.

pub mod cache;
pub mod metrics;
pub mod service;

pub use cache::{CacheEntry, CacheKey, RefreshError, SnapshotCache};
pub use metrics::{CacheMetrics, CacheMetricsSnapshot};
pub use service::OptionChainService;

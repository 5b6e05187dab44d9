// Copyright (c) James Kassemi, SC, US. All rights reserved.
mod args;

use std::{env, process, sync::Arc, time::Duration};

use args::{ArgsError, DashArgs, Selection};
use chain_aggregator::ChainAggregator;
use config::ConfigError;
use core_types::{AppConfig, Snapshot, SymbolCatalog};
use log::{info, warn};
use quote_source::{HttpQuoteSource, QuoteSource, QuoteSourceError, UnavailableQuoteSource};
use snapshot_cache::{CacheMetrics, OptionChainService, SnapshotCache};
use thiserror::Error;
use tokio::time::{interval, MissedTickBehavior};
use tracing_subscriber::EnvFilter;

const STATUS_LOG_INTERVAL_SECS: u64 = 30;

#[tokio::main]
async fn main() {
    init_logging();
    if let Err(err) = run().await {
        eprintln!("chain-dash failed: {err}");
        process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), AppError> {
    let args = DashArgs::parse(env::args().skip(1))?;
    let config = AppConfig::load()?;
    let catalog = load_catalog(&config);
    let selection = args.resolve(&catalog, config.dashboard.strike_count)?;

    let source = build_source(&config)?;
    let cache = SnapshotCache::new(
        config.cache.ttl(),
        ChainAggregator::new(config.pricing.clone()),
        Arc::new(catalog),
    );
    let metrics = cache.metrics();
    let service = OptionChainService::new(source, cache);

    info!(
        "chain-dash polling [{}|{}|{}] every {:?} (cache ttl {:?})",
        selection.symbol,
        selection.expiry,
        selection.strike_count,
        config.dashboard.poll_interval(),
        config.cache.ttl()
    );
    poll(&service, &selection, &config, &metrics).await?;
    log_metrics(&metrics);
    Ok(())
}

fn load_catalog(config: &AppConfig) -> SymbolCatalog {
    let path = &config.symbols.catalog_path;
    match SymbolCatalog::load(path) {
        Ok(catalog) => catalog,
        Err(err) => {
            warn!("symbol catalog {} unavailable ({}); lot sizes default to 1", path, err);
            SymbolCatalog::default()
        }
    }
}

fn build_source(config: &AppConfig) -> Result<Arc<dyn QuoteSource>, AppError> {
    if config.source.has_credentials() {
        info!("using live quote source at {}", config.source.base_url);
        Ok(Arc::new(HttpQuoteSource::new(&config.source)?))
    } else {
        warn!("no access token configured; serving mock snapshots");
        Ok(Arc::new(UnavailableQuoteSource::new("no access token configured")))
    }
}

async fn poll(
    service: &OptionChainService,
    selection: &Selection,
    config: &AppConfig,
    metrics: &CacheMetrics,
) -> Result<(), AppError> {
    let mut ticker = interval(config.dashboard.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut status = interval(Duration::from_secs(STATUS_LOG_INTERVAL_SECS));
    status.tick().await;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => {
                res.map_err(AppError::Signal)?;
                info!("shutdown signal received");
                return Ok(());
            }
            _ = ticker.tick() => {
                let snapshot = service
                    .get_snapshot(&selection.symbol, &selection.expiry, selection.strike_count)
                    .await;
                print_snapshot(&snapshot)?;
            }
            _ = status.tick() => log_metrics(metrics),
        }
    }
}

fn print_snapshot(snapshot: &Snapshot) -> Result<(), AppError> {
    println!("{}", serde_json::to_string(snapshot)?);
    Ok(())
}

fn log_metrics(metrics: &CacheMetrics) {
    let snap = metrics.snapshot();
    info!(
        "cache: requests={} hits={} fetches={} ok={} failed={} stale={} mock={} coalesced={}",
        snap.requests,
        snap.fresh_hits,
        snap.upstream_fetches,
        snap.refresh_success,
        snap.refresh_failed,
        snap.stale_served,
        snap.mock_served,
        snap.coalesced_waiters
    );
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Args(#[from] ArgsError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] QuoteSourceError),
    #[error("failed to write snapshot: {0}")]
    Output(#[from] serde_json::Error),
    #[error("failed while waiting for shutdown signal: {0}")]
    Signal(std::io::Error),
}

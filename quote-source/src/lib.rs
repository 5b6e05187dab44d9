// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Quote source interface plus the provider-backed and offline implementations.

pub mod http;
pub mod wire;

use std::time::Duration;

use core_types::expiry::ExpiryError;
use core_types::{OptionChain, QuoteSummary};
use thiserror::Error;

pub use http::HttpQuoteSource;

/// Upstream market data. Implementations own auth, transport retries and timeouts.
#[async_trait::async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_option_chain(
        &self,
        symbol: &str,
        expiry_ts: i64,
        strike_count: u32,
    ) -> Result<OptionChain, QuoteSourceError>;

    async fn fetch_quote(&self, symbol: &str) -> Result<QuoteSummary, QuoteSourceError>;
}

#[derive(Debug, Error)]
pub enum QuoteSourceError {
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("http status {0}")]
    Http(u16),
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("provider error {code}: {message}")]
    Provider { code: i64, message: String },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("empty option chain for {0}")]
    EmptyChain(String),
    #[error("invalid expiry: {0}")]
    Expiry(#[from] ExpiryError),
    #[error("quote source unavailable: {0}")]
    Unavailable(String),
}

impl QuoteSourceError {
    /// Failures worth another attempt: timeouts, connection trouble, throttling and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            QuoteSourceError::Timeout(_) => true,
            QuoteSourceError::Http(status) => *status == 429 || *status >= 500,
            QuoteSourceError::Request(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }
}

/// Source that never answers; the engine then serves cached or mock snapshots.
#[derive(Debug, Clone)]
pub struct UnavailableQuoteSource {
    reason: String,
}

impl UnavailableQuoteSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl QuoteSource for UnavailableQuoteSource {
    async fn fetch_option_chain(
        &self,
        _symbol: &str,
        _expiry_ts: i64,
        _strike_count: u32,
    ) -> Result<OptionChain, QuoteSourceError> {
        Err(QuoteSourceError::Unavailable(self.reason.clone()))
    }

    async fn fetch_quote(&self, _symbol: &str) -> Result<QuoteSummary, QuoteSourceError> {
        Err(QuoteSourceError::Unavailable(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(QuoteSourceError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(QuoteSourceError::Http(503).is_transient());
        assert!(QuoteSourceError::Http(429).is_transient());
        assert!(!QuoteSourceError::Http(401).is_transient());
        assert!(!QuoteSourceError::Provider {
            code: -16,
            message: "token expired".into()
        }
        .is_transient());
        assert!(!QuoteSourceError::EmptyChain("X".into()).is_transient());
    }

    #[tokio::test]
    async fn unavailable_source_always_fails() {
        let source = UnavailableQuoteSource::new("no credentials");
        let err = source
            .fetch_option_chain("NSE:NIFTY50-INDEX", 1_761_818_400, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteSourceError::Unavailable(ref r) if r == "no credentials"));
        assert!(source.fetch_quote("NSE:NIFTY50-INDEX").await.is_err());
    }
}

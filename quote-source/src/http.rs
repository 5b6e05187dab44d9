// Copyright (c) James Kassemi, SC, US. All rights reserved.
use std::time::Duration;

use core_types::config::SourceConfig;
use core_types::retry::RetryPolicy;
use core_types::{OptionChain, QuoteSummary};
use log::{debug, warn};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tokio::time::timeout;

use crate::wire::{ChainResponse, QuotesResponse};
use crate::{QuoteSource, QuoteSourceError};

const OPTION_CHAIN_PATH: &str = "/data/options-chain-v3";
const QUOTES_PATH: &str = "/data/quotes";

/// REST client for the market-data provider. Each attempt, connect through body,
/// is bounded by `timeout` and surfaces as [`QuoteSourceError::Timeout`].
pub struct HttpQuoteSource {
    client: Client,
    base_url: Url,
    authorization: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpQuoteSource {
    pub fn new(config: &SourceConfig) -> Result<Self, QuoteSourceError> {
        let timeout = config.timeout();
        let client = Client::builder().connect_timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: Url::parse(&config.base_url)?,
            authorization: authorization_header(&config.client_id, &config.access_token),
            timeout,
            retry: RetryPolicy::from(&config.retry),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn chain_url(&self, symbol: &str, expiry_ts: i64, strike_count: u32) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(OPTION_CHAIN_PATH);
        url.query_pairs_mut()
            .append_pair("symbol", symbol)
            .append_pair("strikecount", &strike_count.to_string())
            .append_pair("timestamp", &expiry_ts.to_string());
        url
    }

    fn quotes_url(&self, symbol: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(QUOTES_PATH);
        url.query_pairs_mut().append_pair("symbols", symbol);
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, QuoteSourceError> {
        self.retry
            .retry_if(
                |attempt| {
                    let url = url.clone();
                    async move {
                        if attempt > 0 {
                            debug!("retrying {} (attempt {})", url.path(), attempt + 1);
                        }
                        self.get_once(url).await
                    }
                },
                QuoteSourceError::is_transient,
            )
            .await
    }

    async fn get_once<T: DeserializeOwned>(&self, url: Url) -> Result<T, QuoteSourceError> {
        timeout(self.timeout, self.send(url))
            .await
            .map_err(|_| QuoteSourceError::Timeout(self.timeout))?
    }

    async fn send<T: DeserializeOwned>(&self, url: Url) -> Result<T, QuoteSourceError> {
        let resp = self
            .client
            .get(url)
            .header(AUTHORIZATION, &self.authorization)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(QuoteSourceError::Http(resp.status().as_u16()));
        }
        resp.json::<T>()
            .await
            .map_err(|err| QuoteSourceError::Decode(err.to_string()))
    }
}

#[async_trait::async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn fetch_option_chain(
        &self,
        symbol: &str,
        expiry_ts: i64,
        strike_count: u32,
    ) -> Result<OptionChain, QuoteSourceError> {
        let url = self.chain_url(symbol, expiry_ts, strike_count);
        let response: ChainResponse = self.get_json(url).await.map_err(|err| {
            warn!("[{}] option chain request failed: {}", symbol, err);
            err
        })?;
        response.into_chain(symbol)
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<QuoteSummary, QuoteSourceError> {
        let url = self.quotes_url(symbol);
        let response: QuotesResponse = self.get_json(url).await?;
        response.into_quote(symbol)
    }
}

fn authorization_header(client_id: &str, access_token: &str) -> String {
    format!("{}:{}", client_id.trim(), access_token.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::Instant;

    const QUOTE_BODY: &str =
        r#"{"code": 200, "d": [{"n": "NSE:SBIN-EQ", "v": {"lp": 10.0, "ch": 0.5, "chp": 5.26}}]}"#;

    enum Reply {
        Status(u16, &'static str),
        Hang,
    }

    /// One scripted reply per accepted connection; returns the base URL and a connection counter.
    async fn scripted_server(replies: Vec<Reply>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            let mut replies = replies.into_iter();
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(answer(stream, replies.next()));
            }
        });
        (format!("http://{addr}"), hits)
    }

    async fn answer(mut stream: TcpStream, reply: Option<Reply>) {
        let mut request: Vec<u8> = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        match reply {
            Some(Reply::Status(status, body)) => {
                let response = format!(
                    "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    reason(status),
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
            Some(Reply::Hang) | None => tokio::time::sleep(Duration::from_secs(30)).await,
        }
    }

    fn reason(status: u16) -> &'static str {
        match status {
            200 => "OK",
            401 => "Unauthorized",
            503 => "Service Unavailable",
            _ => "Unknown",
        }
    }

    fn local_source(base_url: String, timeout_ms: u64) -> HttpQuoteSource {
        let config = SourceConfig {
            base_url,
            client_id: "APP-100".to_string(),
            access_token: "tok".to_string(),
            timeout_ms,
            ..SourceConfig::default()
        };
        HttpQuoteSource::new(&config)
            .unwrap()
            .with_retry(RetryPolicy::new(2, 20, 20, 0.0))
    }

    #[tokio::test]
    async fn server_error_is_retried_until_success() {
        let (base_url, hits) = scripted_server(vec![
            Reply::Status(503, r#"{"code": 503}"#),
            Reply::Status(200, QUOTE_BODY),
        ])
        .await;
        let quote = local_source(base_url, 2_000)
            .fetch_quote("NSE:SBIN-EQ")
            .await
            .unwrap();
        assert_eq!(quote.last_price, 10.0);
        assert_eq!(quote.change_points, 0.5);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn hung_server_times_out_each_attempt() {
        let (base_url, hits) = scripted_server(vec![Reply::Hang, Reply::Hang]).await;
        let started = Instant::now();
        let err = local_source(base_url, 200)
            .fetch_quote("NSE:SBIN-EQ")
            .await
            .unwrap_err();
        assert!(
            matches!(err, QuoteSourceError::Timeout(d) if d == Duration::from_millis(200)),
            "unexpected error {err:?}"
        );
        assert!(started.elapsed() >= Duration::from_millis(400));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (base_url, hits) = scripted_server(vec![
            Reply::Status(401, r#"{"code": -16}"#),
            Reply::Status(200, QUOTE_BODY),
        ])
        .await;
        let err = local_source(base_url, 2_000)
            .fetch_quote("NSE:SBIN-EQ")
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteSourceError::Http(401)), "unexpected error {err:?}");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    fn source() -> HttpQuoteSource {
        let config = SourceConfig {
            base_url: "https://api.example.test".to_string(),
            client_id: "APP-100".to_string(),
            access_token: " tok ".to_string(),
            ..SourceConfig::default()
        };
        HttpQuoteSource::new(&config).unwrap()
    }

    #[test]
    fn chain_url_carries_selection() {
        let url = source().chain_url("NSE:NIFTY50-INDEX", 1_761_818_400, 10);
        assert_eq!(url.path(), OPTION_CHAIN_PATH);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("symbol".to_string(), "NSE:NIFTY50-INDEX".to_string()),
                ("strikecount".to_string(), "10".to_string()),
                ("timestamp".to_string(), "1761818400".to_string()),
            ]
        );
    }

    #[test]
    fn quotes_url_and_auth() {
        let src = source();
        assert_eq!(src.quotes_url("NSE:SBIN-EQ").query(), Some("symbols=NSE%3ASBIN-EQ"));
        assert_eq!(src.authorization, "APP-100:tok");
    }

    #[test]
    fn rejects_bad_base_url() {
        let config = SourceConfig {
            base_url: "not a url".to_string(),
            ..SourceConfig::default()
        };
        assert!(matches!(
            HttpQuoteSource::new(&config),
            Err(QuoteSourceError::Url(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_fetch_failure() {
        let config = SourceConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            access_token: "tok".to_string(),
            timeout_ms: 500,
            ..SourceConfig::default()
        };
        let src = HttpQuoteSource::new(&config)
            .unwrap()
            .with_retry(RetryPolicy::none());
        assert!(src
            .fetch_option_chain("NSE:NIFTY50-INDEX", 1_761_818_400, 5)
            .await
            .is_err());
    }
}

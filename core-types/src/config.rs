// Copyright (c) James Kassemi, SC, US. All rights reserved.
use std::time::Duration;

use config::{Config, ConfigError};
use log::warn;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "chain-dash.toml";
pub const ENV_PREFIX: &str = "CHAIN_DASH";

/// Layered application config: optional `chain-dash.toml`, then `CHAIN_DASH_*` env vars.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub symbols: SymbolsConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry: RetrySettings,
}

impl SourceConfig {
    /// A live source needs an access token; without one the engine runs on mock data.
    pub fn has_credentials(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            client_id: String::new(),
            access_token: String::new(),
            timeout_ms: default_timeout_ms(),
            retry: RetrySettings::default(),
        }
    }
}

fn default_base_url() -> String {
    "https://api-t1.fyers.in".to_string()
}

fn default_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_jitter_pct")]
    pub jitter_pct: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_pct: default_jitter_pct(),
        }
    }
}

fn default_max_attempts() -> usize {
    2
}

fn default_base_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    1_000
}

fn default_jitter_pct() -> f64 {
    0.2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    #[serde(default = "default_fallback_volatility")]
    pub fallback_volatility: f64,
    #[serde(default = "default_days_to_expiry")]
    pub default_days_to_expiry: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: default_risk_free_rate(),
            fallback_volatility: default_fallback_volatility(),
            default_days_to_expiry: default_days_to_expiry(),
        }
    }
}

fn default_risk_free_rate() -> f64 {
    0.10
}

fn default_fallback_volatility() -> f64 {
    0.15
}

fn default_days_to_expiry() -> i64 {
    7
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms.max(1))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
        }
    }
}

fn default_ttl_ms() -> u64 {
    2_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolsConfig {
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
}

impl Default for SymbolsConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
        }
    }
}

fn default_catalog_path() -> String {
    "symbol.json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_strike_count")]
    pub strike_count: u32,
}

impl DashboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(100))
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            strike_count: default_strike_count(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_strike_count() -> u32 {
    10
}

impl PricingConfig {
    /// Replaces unusable values with defaults instead of failing startup.
    pub fn sanitized(mut self) -> Self {
        if !self.risk_free_rate.is_finite() {
            warn!(
                "pricing.risk_free_rate {} is not finite; using {}",
                self.risk_free_rate,
                default_risk_free_rate()
            );
            self.risk_free_rate = default_risk_free_rate();
        }
        if !(self.fallback_volatility.is_finite() && self.fallback_volatility > 0.0) {
            warn!(
                "pricing.fallback_volatility {} is not positive; using {}",
                self.fallback_volatility,
                default_fallback_volatility()
            );
            self.fallback_volatility = default_fallback_volatility();
        }
        if self.default_days_to_expiry < 1 {
            warn!(
                "pricing.default_days_to_expiry {} is below 1; using 1",
                self.default_days_to_expiry
            );
            self.default_days_to_expiry = 1;
        }
        self
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(Self::environment())
            .build()?;
        Self::from_settings(settings)
    }

    /// `CHAIN_DASH_<SECTION>__<FIELD>` variables, e.g. `CHAIN_DASH_SOURCE__ACCESS_TOKEN`.
    pub fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
    }

    pub fn from_settings(settings: Config) -> Result<Self, ConfigError> {
        let mut config: Self = settings.try_deserialize()?;
        config.pricing = config.pricing.sanitized();
        Ok(config)
    }
}

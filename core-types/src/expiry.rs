// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Expiry date handling for exchange-listed options (DD-MM-YYYY, IST close at 15:30).

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;

pub const EXPIRY_FORMAT: &str = "%d-%m-%Y";
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;
const CLOSE_HOUR: u32 = 15;
const CLOSE_MINUTE: u32 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpiryError {
    #[error("invalid expiry date '{0}' (expected DD-MM-YYYY)")]
    Invalid(String),
    #[error("expiry date '{0}' has no representable close time")]
    Unrepresentable(String),
}

fn exchange_offset() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).expect("IST offset is within range")
}

pub fn parse_expiry(expiry: &str) -> Result<NaiveDate, ExpiryError> {
    NaiveDate::parse_from_str(expiry.trim(), EXPIRY_FORMAT)
        .map_err(|_| ExpiryError::Invalid(expiry.to_string()))
}

/// Unix timestamp of the 15:30 IST close on the expiry date.
pub fn expiry_timestamp(expiry: &str) -> Result<i64, ExpiryError> {
    let date = parse_expiry(expiry)?;
    let close = NaiveTime::from_hms_opt(CLOSE_HOUR, CLOSE_MINUTE, 0)
        .ok_or_else(|| ExpiryError::Unrepresentable(expiry.to_string()))?;
    exchange_offset()
        .from_local_datetime(&date.and_time(close))
        .single()
        .map(|dt| dt.timestamp())
        .ok_or_else(|| ExpiryError::Unrepresentable(expiry.to_string()))
}

/// Calendar date on the exchange at the given instant.
pub fn exchange_today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&exchange_offset()).date_naive()
}

/// Whole days until expiry, never below 1; `default_days` when the date does not parse.
pub fn days_to_expiry(expiry: &str, today: NaiveDate, default_days: i64) -> i64 {
    match parse_expiry(expiry) {
        Ok(date) => (date - today).num_days().max(1),
        Err(_) => default_days.max(1),
    }
}

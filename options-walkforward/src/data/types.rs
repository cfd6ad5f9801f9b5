//! Core data types for the backtester.
//!
//! Daily price bars come from the bar provider and are never mutated after
//! loading. Prices are kept as `f64` because every consumer downstream
//! (indicators, premium estimation) works in floating point.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Option type that profits from a move in the signal's direction.
    pub fn for_signal(signal: f64) -> Self {
        if signal > 0.0 {
            Self::Call
        } else {
            Self::Put
        }
    }
}

/// One trading day of OHLCV data for the underlying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: i64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Bar where open, high, low and close are all the same price.
    pub fn flat(date: NaiveDate, price: f64, volume: i64) -> Self {
        Self::new(date, price, price, price, price, volume)
    }
}

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Check whether a date falls inside the window (both ends inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar days spanned, counting both ends.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

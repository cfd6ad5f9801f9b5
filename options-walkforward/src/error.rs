//! Errors that abort a walk-forward run.
//!
//! Everything else (an exhausted date range, a rejected trade, a zero
//! denominator in a metric) is absorbed where it happens and shows up only
//! as loop termination, a rejection count or a sentinel metric value.

use chrono::NaiveDate;
use thiserror::Error;

use crate::data::LoaderError;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("No bars available for {symbol} between {start} and {end}")]
    DataUnavailable {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Run cancelled before completion")]
    Cancelled,
}

pub type RunResult<T> = Result<T, BacktestError>;

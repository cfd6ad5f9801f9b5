//! Historical bar providers.
//!
//! The walk-forward runner only talks to the [`BarProvider`] trait. Two
//! implementations ship with the crate:
//! - [`ParquetBarLoader`] reads one parquet file per symbol from a data
//!   directory (`{data_dir}/bars/{SYMBOL}.parquet`) with the schema
//!   `date, open, high, low, close, volume`
//! - [`InMemoryBars`] serves pre-built bars (tests, embedding in other tools)

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;

use super::types::PriceBar;

/// Expected columns in a bar parquet file.
pub const BAR_COLUMNS: &[&str] = &["date", "open", "high", "low", "close", "volume"];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of daily price history.
///
/// Implementations return bars for `[start, end]` in ascending date order.
/// Non-trading days may be omitted; an empty vector means no data.
pub trait BarProvider: Send + Sync {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, LoaderError>;
}

/// Parquet-backed bar provider.
pub struct ParquetBarLoader {
    data_dir: String,
}

impl ParquetBarLoader {
    /// Create a loader pointing at a data directory.
    pub fn new(data_dir: &str) -> Self {
        Self {
            data_dir: data_dir.to_string(),
        }
    }

    /// Path to a symbol's parquet file.
    fn parquet_path(&self, symbol: &str) -> String {
        format!("{}/bars/{}.parquet", self.data_dir, symbol.to_uppercase())
    }

    /// List symbols with a bar file in the data directory.
    pub fn available_symbols(&self) -> Result<Vec<String>, LoaderError> {
        let dir_path = format!("{}/bars", self.data_dir);
        let path = Path::new(&dir_path);

        if !path.exists() {
            return Ok(vec![]);
        }

        let mut symbols = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if let Some(symbol) = name.strip_suffix(".parquet") {
                symbols.push(symbol.to_string());
            }
        }
        symbols.sort();
        Ok(symbols)
    }

    /// Load the full parquet file for a symbol as a DataFrame.
    pub fn load_dataframe(&self, symbol: &str) -> Result<DataFrame, LoaderError> {
        let path = self.parquet_path(symbol);
        if !Path::new(&path).exists() {
            return Err(LoaderError::FileNotFound(path));
        }
        let lf = LazyFrame::scan_parquet(&path, ScanArgsParquet::default())?;
        let df = lf
            .select(BAR_COLUMNS.iter().map(|c| col(*c)).collect::<Vec<_>>())
            .collect()?;
        Ok(df)
    }
}

impl BarProvider for ParquetBarLoader {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, LoaderError> {
        let df = self.load_dataframe(symbol)?;
        let bars = dataframe_to_bars(&df)?
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect();
        Ok(sort_and_dedup(bars))
    }
}

/// Convert a bar DataFrame into price bars.
///
/// The date column may be stored as a string (`%Y-%m-%d`), a date or a
/// datetime; it is cast to string and the date prefix parsed. Numeric
/// columns are cast so integer-typed price files load too.
fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<PriceBar>, LoaderError> {
    let date_col = df.column("date")?.cast(&DataType::String)?;
    let open_col = df.column("open")?.cast(&DataType::Float64)?;
    let high_col = df.column("high")?.cast(&DataType::Float64)?;
    let low_col = df.column("low")?.cast(&DataType::Float64)?;
    let close_col = df.column("close")?.cast(&DataType::Float64)?;
    let volume_col = df.column("volume")?.cast(&DataType::Int64)?;

    let dates = date_col.str()?;
    let opens = open_col.f64()?;
    let highs = high_col.f64()?;
    let lows = low_col.f64()?;
    let closes = close_col.f64()?;
    let volumes = volume_col.i64()?;

    let mut bars = Vec::with_capacity(df.height());

    for idx in 0..df.height() {
        let date = dates
            .get(idx)
            .and_then(|s| s.get(..10))
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .ok_or_else(|| LoaderError::InvalidData(format!("Invalid date in row {}", idx)))?;

        let close = closes
            .get(idx)
            .ok_or_else(|| LoaderError::InvalidData(format!("Missing close on {}", date)))?;

        bars.push(PriceBar {
            date,
            open: opens.get(idx).unwrap_or(close),
            high: highs.get(idx).unwrap_or(close),
            low: lows.get(idx).unwrap_or(close),
            close,
            volume: volumes.get(idx).unwrap_or(0),
        });
    }

    Ok(bars)
}

/// Sort bars ascending by date and keep the first bar of any duplicated date.
pub fn sort_and_dedup(mut bars: Vec<PriceBar>) -> Vec<PriceBar> {
    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    bars
}

/// Bar provider backed by in-memory series.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBars {
    series: HashMap<String, Vec<PriceBar>>,
}

impl InMemoryBars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the bar series for a symbol.
    pub fn with_symbol(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.series
            .insert(symbol.to_uppercase(), sort_and_dedup(bars));
        self
    }
}

impl BarProvider for InMemoryBars {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, LoaderError> {
        Ok(self
            .series
            .get(&symbol.to_uppercase())
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start && b.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

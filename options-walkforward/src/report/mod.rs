//! Walk-forward reports.
//!
//! Assembles evaluated periods into the final result and persists it as JSON.

pub mod export;
pub mod results;

pub use export::ExportError;
pub use results::{BacktestPeriod, BacktestResults};

//! Performance metrics module.
//!
//! Provides trade-level performance calculations:
//! - Win rate, profit factor
//! - Total return, average win/loss
//! - Maximum drawdown of cumulative P&L
//! - Per-trade Sharpe ratio
//! - Walk-forward consistency score

pub mod calculator;

pub use calculator::{MetricsCalculator, PerformanceMetrics};

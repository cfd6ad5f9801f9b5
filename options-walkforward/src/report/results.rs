//! Walk-forward results and their aggregation.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::backtest::{BacktestTrade, ScanStats};
use crate::data::{DateWindow, OptionType};
use crate::metrics::{MetricsCalculator, PerformanceMetrics};
use crate::walkforward::WalkForwardConfig;

/// One evaluated walk-forward period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestPeriod {
    /// Period number (1-indexed).
    pub period_num: usize,
    pub training_window: DateWindow,
    pub test_window: DateWindow,
    /// Trades in the test window, in entry order.
    pub trades: Vec<BacktestTrade>,
    pub period_metrics: PerformanceMetrics,
    pub stats: ScanStats,
}

impl BacktestPeriod {
    pub fn new(
        period_num: usize,
        training_window: DateWindow,
        test_window: DateWindow,
        trades: Vec<BacktestTrade>,
        stats: ScanStats,
    ) -> Self {
        let period_metrics = MetricsCalculator::calculate(&trades);
        Self {
            period_num,
            training_window,
            test_window,
            trades,
            period_metrics,
            stats,
        }
    }

    /// Period P&L as a float, for consistency scoring.
    pub fn total_return(&self) -> f64 {
        self.period_metrics.total_return.to_f64().unwrap_or(0.0)
    }
}

/// Complete walk-forward result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResults {
    pub symbol: String,
    pub strategy_name: String,
    /// Overall date range.
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub periods: Vec<BacktestPeriod>,
    /// Metrics over the distinct trades of every period.
    pub aggregate_metrics: PerformanceMetrics,
    pub consistency_score: f64,
    /// Scan counters summed over all periods.
    pub stats: ScanStats,
    pub config: WalkForwardConfig,
}

impl BacktestResults {
    /// Assemble the final report from evaluated periods.
    pub fn aggregate(
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        periods: Vec<BacktestPeriod>,
        config: WalkForwardConfig,
    ) -> Self {
        let trades = unique_trades(&periods);
        let aggregate_metrics = MetricsCalculator::calculate(&trades);

        let period_returns: Vec<f64> = periods.iter().map(|p| p.total_return()).collect();
        let consistency_score = MetricsCalculator::consistency_score(&period_returns);

        let mut stats = ScanStats::default();
        for period in &periods {
            stats.merge(&period.stats);
        }

        Self {
            symbol: symbol.to_uppercase(),
            strategy_name: config.strategy_name.clone(),
            start_date,
            end_date,
            periods,
            aggregate_metrics,
            consistency_score,
            stats,
            config,
        }
    }

    /// Distinct trades across all periods in chronological order.
    pub fn all_trades(&self) -> Vec<BacktestTrade> {
        unique_trades(&self.periods)
    }

    /// Periods that recorded at least one trade.
    pub fn active_periods(&self) -> usize {
        self.periods.iter().filter(|p| !p.trades.is_empty()).count()
    }

    /// Get summary string.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Walk-Forward Results: {} ({})\n\
             ====================\n\
             Date Range: {} to {}\n\
             Periods: {} ({} with trades)\n\
             Consistency Score: {:.2}\n\
             Candidates: {} (recorded: {}, rejected: {})\n\
             \n",
            self.symbol,
            self.strategy_name,
            self.start_date,
            self.end_date,
            self.periods.len(),
            self.active_periods(),
            self.consistency_score,
            self.stats.candidates,
            self.stats.trades_recorded,
            self.stats.total_rejected(),
        );
        out.push_str(&self.aggregate_metrics.summary());

        if !self.periods.is_empty() {
            out.push_str("\n\n| Period | Test Window             | Trades | Return    |\n");
            out.push_str("|--------|-------------------------|--------|-----------|\n");
            for period in &self.periods {
                out.push_str(&format!(
                    "| {:>6} | {} - {} | {:>6} | {:>9.2} |\n",
                    period.period_num,
                    period.test_window.start,
                    period.test_window.end,
                    period.trades.len(),
                    period.period_metrics.total_return,
                ));
            }
        }

        out
    }
}

/// Distinct trades from overlapping test windows.
///
/// When several windows entered on the same day, the copy held longest wins;
/// the others had their exit cut short by a window end.
fn unique_trades(periods: &[BacktestPeriod]) -> Vec<BacktestTrade> {
    let mut by_key: HashMap<(NaiveDate, OptionType), &BacktestTrade> = HashMap::new();
    for trade in periods.iter().flat_map(|p| p.trades.iter()) {
        by_key
            .entry(trade.key())
            .and_modify(|kept| {
                if trade.exit_date > kept.exit_date {
                    *kept = trade;
                }
            })
            .or_insert(trade);
    }

    let mut trades: Vec<BacktestTrade> = by_key.into_values().cloned().collect();
    trades.sort_by_key(|t| (t.entry_date, t.exit_date));
    trades
}

//! Performance metrics calculator.
//!
//! Calculates trade statistics for a single test period or for the union of
//! all periods in a walk-forward run.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::backtest::BacktestTrade;

/// Performance metrics over a set of trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    // Basic statistics
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,

    // P&L metrics
    pub total_return: Decimal,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    #[serde(with = "infinite_f64")]
    pub profit_factor: f64,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    pub largest_winner: Decimal,
    pub largest_loser: Decimal,

    // Risk metrics
    pub max_drawdown: Decimal,
    pub sharpe_ratio: f64,

    // Time metrics
    pub avg_days_held: f64,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: 0.0,
            total_return: Decimal::ZERO,
            gross_profit: Decimal::ZERO,
            gross_loss: Decimal::ZERO,
            profit_factor: 0.0,
            avg_win: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            largest_winner: Decimal::ZERO,
            largest_loser: Decimal::ZERO,
            max_drawdown: Decimal::ZERO,
            sharpe_ratio: 0.0,
            avg_days_held: 0.0,
        }
    }
}

impl PerformanceMetrics {
    /// Generate a summary report.
    pub fn summary(&self) -> String {
        let profit_factor = if self.profit_factor.is_infinite() {
            "inf".to_string()
        } else {
            format!("{:.2}", self.profit_factor)
        };

        format!(
            "Trades: {} (W: {}, L: {})\n\
             Win Rate: {:.1}%\n\
             Profit Factor: {}\n\
             \n\
             Total Return: ${:.2}\n\
             Avg Winner: ${:.2}\n\
             Avg Loser: ${:.2}\n\
             Largest Win: ${:.2}\n\
             Largest Loss: ${:.2}\n\
             \n\
             Max Drawdown: ${:.2}\n\
             Sharpe Ratio: {:.2}\n\
             Avg Days Held: {:.1}",
            self.total_trades,
            self.winning_trades,
            self.losing_trades,
            self.win_rate * 100.0,
            profit_factor,
            self.total_return,
            self.avg_win,
            self.avg_loss,
            self.largest_winner,
            self.largest_loser,
            self.max_drawdown,
            self.sharpe_ratio,
            self.avg_days_held,
        )
    }
}

/// Metrics calculator.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Calculate all metrics from trades in chronological order.
    pub fn calculate(trades: &[BacktestTrade]) -> PerformanceMetrics {
        if trades.is_empty() {
            return PerformanceMetrics::default();
        }

        // Basic counts
        let total_trades = trades.len();
        let winning_trades = trades.iter().filter(|t| t.is_winner()).count();
        let losing_trades = total_trades - winning_trades;
        let win_rate = winning_trades as f64 / total_trades as f64;

        // P&L calculations
        let total_return: Decimal = trades.iter().map(|t| t.pnl()).sum();
        let gross_profit: Decimal = trades
            .iter()
            .filter(|t| t.is_winner())
            .map(|t| t.pnl())
            .sum();
        let gross_loss: Decimal = trades
            .iter()
            .filter(|t| !t.is_winner())
            .map(|t| t.pnl())
            .sum();

        let avg_win = Self::average(gross_profit, winning_trades);
        let avg_loss = Self::average(gross_loss, losing_trades);

        let largest_winner = trades
            .iter()
            .filter(|t| t.is_winner())
            .map(|t| t.pnl())
            .max()
            .unwrap_or(Decimal::ZERO);

        let largest_loser = trades
            .iter()
            .filter(|t| !t.is_winner())
            .map(|t| t.pnl())
            .min()
            .unwrap_or(Decimal::ZERO);

        let returns: Vec<f64> = trades.iter().map(|t| t.profit_loss_pct).collect();

        PerformanceMetrics {
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            total_return,
            gross_profit,
            gross_loss,
            profit_factor: Self::calculate_profit_factor(gross_profit, gross_loss),
            avg_win,
            avg_loss,
            largest_winner,
            largest_loser,
            max_drawdown: Self::max_drawdown(trades),
            sharpe_ratio: Self::calculate_sharpe(&returns),
            avg_days_held: trades.iter().map(|t| t.days_held as f64).sum::<f64>()
                / total_trades as f64,
        }
    }

    /// Calculate profit factor.
    ///
    /// Infinite when there are winners and no losses, 0 when nothing was won.
    pub fn calculate_profit_factor(gross_profit: Decimal, gross_loss: Decimal) -> f64 {
        if gross_profit <= Decimal::ZERO {
            return 0.0;
        }
        if gross_loss.is_zero() {
            return f64::INFINITY;
        }
        let profit = gross_profit.to_f64().unwrap_or(0.0);
        let loss = gross_loss.abs().to_f64().unwrap_or(0.0);
        profit / loss
    }

    /// Largest peak-to-trough decline of the cumulative P&L curve.
    ///
    /// The curve starts at 0 before the first trade, so a losing first trade
    /// counts as drawdown.
    pub fn max_drawdown(trades: &[BacktestTrade]) -> Decimal {
        let mut equity = Decimal::ZERO;
        let mut peak = Decimal::ZERO;
        let mut max_drawdown = Decimal::ZERO;

        for trade in trades {
            equity += trade.pnl();
            if equity > peak {
                peak = equity;
            }
            let drawdown = peak - equity;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }

        max_drawdown
    }

    /// Per-trade Sharpe ratio: mean over population stdev of returns.
    pub fn calculate_sharpe(returns: &[f64]) -> f64 {
        if returns.is_empty() {
            return 0.0;
        }
        let std = returns.population_std_dev();
        if !std.is_finite() || std == 0.0 {
            return 0.0;
        }
        returns.mean() / std
    }

    /// How stable per-period returns are, in [0, 1].
    ///
    /// `1 - stdev / (|mean| + 1)` clamped to [0, 1]; 0.5 with fewer than
    /// two periods.
    pub fn consistency_score(period_returns: &[f64]) -> f64 {
        if period_returns.len() < 2 {
            return 0.5;
        }
        let mean = period_returns.mean();
        let std = period_returns.population_std_dev();
        if !std.is_finite() || !mean.is_finite() {
            return 0.5;
        }
        (1.0 - std / (mean.abs() + 1.0)).clamp(0.0, 1.0)
    }

    fn average(total: Decimal, count: usize) -> Decimal {
        if count == 0 {
            return Decimal::ZERO;
        }
        (total / Decimal::from(count as u64)).round_dp(4)
    }
}

/// Serializes `f64::INFINITY` as the string `"inf"`; JSON has no infinity.
mod infinite_f64 {
    use serde::{Deserialize, Deserializer, Serializer};

    const INF: &str = "inf";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() && value.is_sign_positive() {
            serializer.serialize_str(INF)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(n),
            Repr::Text(s) if s == INF => Ok(f64::INFINITY),
            Repr::Text(s) => Err(serde::de::Error::custom(format!(
                "invalid profit factor: {}",
                s
            ))),
        }
    }
}

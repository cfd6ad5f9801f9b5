//! Trade simulation over a test window.
//!
//! For each candidate from the entry scanner:
//! 1. Pick direction and strike from the signal (call above spot, put below)
//! 2. Price the entry at the target DTE
//! 3. Size the position against the investment budget
//! 4. Price the exit after the holding period with the remaining DTE
//! 5. Record the trade, or count the rejection and move on

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{DateWindow, OptionType};
use crate::indicators::AugmentedBar;
use crate::pricing::PremiumModel;
use crate::signals::SignalFrame;

use super::trade::{
    contracts_for_budget, position_pnl, BacktestTrade, EntryRule, EntryScanner, RejectionReason,
    ScanStats, TradeCandidate,
};

/// Decimal places kept for prices and premiums.
const PRICE_DP: u32 = 4;

/// Configuration for trade simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeConfig {
    /// Minimum |combined_signal| for an entry.
    pub strength_threshold: f64,

    /// Minimum combined confidence for an entry.
    pub min_confidence: f64,

    /// Maximum capital per trade.
    pub max_investment: Decimal,

    /// Days to expiry of the option bought at entry.
    pub target_dte: i64,

    /// Bars held before exit (truncated at the window end).
    pub holding_bars: usize,

    /// Call strike as a multiple of spot.
    pub call_strike_mult: f64,

    /// Put strike as a multiple of spot.
    pub put_strike_mult: f64,

    /// Volatility used when the bar has no volatility estimate yet.
    pub default_volatility: f64,

    /// Premium approximation constants.
    pub premium_model: PremiumModel,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            strength_threshold: 0.3,
            min_confidence: 0.8,
            max_investment: Decimal::from(400),
            target_dte: 21,
            holding_bars: 7,
            call_strike_mult: 1.02,
            put_strike_mult: 0.98,
            default_volatility: 0.30,
            premium_model: PremiumModel::default(),
        }
    }
}

impl TradeConfig {
    fn entry_rule(&self) -> EntryRule {
        EntryRule {
            strength_threshold: self.strength_threshold,
            min_confidence: self.min_confidence,
            holding_bars: self.holding_bars,
        }
    }
}

/// Trades and counters from simulating one window.
#[derive(Debug, Clone, Default)]
pub struct WindowOutcome {
    pub trades: Vec<BacktestTrade>,
    pub stats: ScanStats,
}

/// Simulates option trades from signal frames.
#[derive(Debug, Clone, Default)]
pub struct TradeSimulator {
    config: TradeConfig,
}

impl TradeSimulator {
    pub fn new(config: TradeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TradeConfig {
        &self.config
    }

    /// Simulate trades for the bars whose dates fall inside `window`.
    ///
    /// `bars` and `frames` are index-aligned and cover the full history; only
    /// bars inside the window are scanned, and exits never leave it.
    pub fn simulate_window(
        &self,
        bars: &[AugmentedBar],
        frames: &[SignalFrame],
        window: DateWindow,
    ) -> WindowOutcome {
        let Some((first, last)) = window_indices(bars, window) else {
            return WindowOutcome::default();
        };
        self.simulate_range(bars, frames, first, last)
    }

    /// Simulate trades over `bars[first..=last]`.
    pub fn simulate_range(
        &self,
        bars: &[AugmentedBar],
        frames: &[SignalFrame],
        first: usize,
        last: usize,
    ) -> WindowOutcome {
        let mut outcome = WindowOutcome::default();
        let mut scanner = EntryScanner::new(frames, self.config.entry_rule(), first, last);

        for candidate in scanner.by_ref() {
            outcome.stats.candidates += 1;
            match self.simulate_trade(bars, frames, candidate) {
                Ok(trade) => {
                    outcome.stats.trades_recorded += 1;
                    outcome.trades.push(trade);
                }
                Err(reason) => {
                    debug!(
                        "Rejected entry on {}: {:?}",
                        bars[candidate.entry_index].bar.date, reason
                    );
                    outcome.stats.record_rejection(&reason);
                }
            }
        }

        outcome.stats.bars_scanned = scanner.bars_scanned();
        outcome
    }

    /// Turn a candidate into a trade, or explain why it cannot be one.
    pub fn simulate_trade(
        &self,
        bars: &[AugmentedBar],
        frames: &[SignalFrame],
        candidate: TradeCandidate,
    ) -> Result<BacktestTrade, RejectionReason> {
        let TradeCandidate {
            entry_index,
            exit_index,
        } = candidate;

        if exit_index <= entry_index {
            return Err(RejectionReason::NoHoldingRoom);
        }

        let cfg = &self.config;
        let entry_bar = &bars[entry_index];
        let exit_bar = &bars[exit_index];
        let frame = &frames[entry_index];

        let entry_spot = entry_bar.bar.close;
        let exit_spot = exit_bar.bar.close;
        let option_type = OptionType::for_signal(frame.combined_signal);
        let strike_mult = match option_type {
            OptionType::Call => cfg.call_strike_mult,
            OptionType::Put => cfg.put_strike_mult,
        };
        let strike = to_price(entry_spot * strike_mult).ok_or(RejectionReason::InvalidPremium)?;
        let strike_f64 = strike.to_f64().unwrap_or(0.0);

        let entry_premium = to_price(cfg.premium_model.premium(
            entry_spot,
            strike_f64,
            cfg.target_dte,
            self.volatility(entry_bar),
            option_type,
        ))
        .filter(|p| *p > Decimal::ZERO)
        .ok_or(RejectionReason::InvalidPremium)?;

        let contracts = contracts_for_budget(cfg.max_investment, entry_premium);
        if contracts < 1 {
            return Err(RejectionReason::InsufficientCapital {
                premium: entry_premium,
            });
        }

        let days_held = days_between(entry_bar.bar.date, exit_bar.bar.date);
        let remaining_dte = (cfg.target_dte - days_held).max(0);
        let exit_premium = to_price(cfg.premium_model.premium(
            exit_spot,
            strike_f64,
            remaining_dte,
            self.volatility(exit_bar),
            option_type,
        ))
        .ok_or(RejectionReason::InvalidPremium)?;

        let mut trade = BacktestTrade {
            entry_date: entry_bar.bar.date,
            exit_date: exit_bar.bar.date,
            option_type,
            strike,
            entry_premium,
            exit_premium,
            contracts,
            profit_loss: position_pnl(entry_premium, exit_premium, contracts),
            profit_loss_pct: 0.0,
            predicted_move: frame.combined_signal,
            actual_move: if entry_spot != 0.0 {
                exit_spot / entry_spot - 1.0
            } else {
                0.0
            },
            signal_confidence: frame.combined_confidence,
            entry_spot,
            exit_spot,
            days_held,
        };
        trade.profit_loss_pct = (trade.profit_loss / trade.cost_basis())
            .to_f64()
            .unwrap_or(0.0);
        Ok(trade)
    }

    /// Volatility input for the premium model at a bar.
    fn volatility(&self, bar: &AugmentedBar) -> f64 {
        bar.indicators
            .volatility_20
            .filter(|v| v.is_finite())
            .unwrap_or(self.config.default_volatility)
    }
}

/// First and last index of bars inside the window, if any.
pub fn window_indices(bars: &[AugmentedBar], window: DateWindow) -> Option<(usize, usize)> {
    let first = bars.partition_point(|b| b.bar.date < window.start);
    let end = bars.partition_point(|b| b.bar.date <= window.end);
    (first < end).then(|| (first, end - 1))
}

fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

fn to_price(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64_retain(value).map(|d| d.round_dp(PRICE_DP))
}

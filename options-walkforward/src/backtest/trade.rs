//! Simulated option trades.
//!
//! Handles the trade lifecycle inside a test window:
//! - Entry scanning (two-state machine over bar indices)
//! - Trade records (immutable once created)
//! - Rejection bookkeeping for candidates that never become trades

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::OptionType;
use crate::signals::SignalFrame;

/// Shares per option contract.
pub const CONTRACT_MULTIPLIER: i64 = 100;

/// A completed simulated option trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestTrade {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub option_type: OptionType,
    pub strike: Decimal,
    /// Premium per share at entry.
    pub entry_premium: Decimal,
    /// Premium per share at exit.
    pub exit_premium: Decimal,
    pub contracts: u32,
    pub profit_loss: Decimal,
    /// P&L as a fraction of capital deployed.
    pub profit_loss_pct: f64,
    /// Combined signal at entry.
    pub predicted_move: f64,
    /// Underlying return from entry to exit.
    pub actual_move: f64,
    pub signal_confidence: f64,
    pub entry_spot: f64,
    pub exit_spot: f64,
    /// Calendar days between entry and exit.
    pub days_held: i64,
}

impl BacktestTrade {
    /// Check if trade was profitable.
    pub fn is_winner(&self) -> bool {
        self.profit_loss > Decimal::ZERO
    }

    /// Get realized P&L.
    pub fn pnl(&self) -> Decimal {
        self.profit_loss
    }

    /// Capital deployed at entry.
    pub fn cost_basis(&self) -> Decimal {
        self.entry_premium * Decimal::from(self.contracts) * Decimal::from(CONTRACT_MULTIPLIER)
    }

    /// Whether the trade's direction matched the underlying's move.
    pub fn direction_correct(&self) -> bool {
        match self.option_type {
            OptionType::Call => self.actual_move > 0.0,
            OptionType::Put => self.actual_move < 0.0,
        }
    }

    /// Identity used to merge trades that overlapping test windows simulated
    /// more than once. The exit is left out because a window ending inside the
    /// holding period truncates it.
    pub fn key(&self) -> (NaiveDate, OptionType) {
        (self.entry_date, self.option_type)
    }
}

/// Profit and loss for a position held from entry to exit premium.
pub fn position_pnl(entry_premium: Decimal, exit_premium: Decimal, contracts: u32) -> Decimal {
    (exit_premium - entry_premium) * Decimal::from(contracts) * Decimal::from(CONTRACT_MULTIPLIER)
}

/// Contracts affordable with a budget at a per-share premium.
pub fn contracts_for_budget(max_investment: Decimal, premium: Decimal) -> u32 {
    if premium <= Decimal::ZERO {
        return 0;
    }
    let per_contract = premium * Decimal::from(CONTRACT_MULTIPLIER);
    (max_investment / per_contract)
        .floor()
        .to_u32()
        .unwrap_or(0)
}

/// Why an entry candidate did not become a trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// Budget does not cover one contract.
    InsufficientCapital { premium: Decimal },
    /// Entry on the window's last bar leaves nothing to exit into.
    NoHoldingRoom,
    /// Premium estimate was zero or not finite.
    InvalidPremium,
}

/// Counters for one scan of a test window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanStats {
    pub bars_scanned: usize,
    pub candidates: usize,
    pub trades_recorded: usize,
    pub rejected_insufficient_capital: usize,
    pub rejected_no_holding_room: usize,
    pub rejected_invalid_premium: usize,
}

impl ScanStats {
    pub fn record_rejection(&mut self, reason: &RejectionReason) {
        match reason {
            RejectionReason::InsufficientCapital { .. } => self.rejected_insufficient_capital += 1,
            RejectionReason::NoHoldingRoom => self.rejected_no_holding_room += 1,
            RejectionReason::InvalidPremium => self.rejected_invalid_premium += 1,
        }
    }

    pub fn total_rejected(&self) -> usize {
        self.rejected_insufficient_capital
            + self.rejected_no_holding_room
            + self.rejected_invalid_premium
    }

    pub fn merge(&mut self, other: &ScanStats) {
        self.bars_scanned += other.bars_scanned;
        self.candidates += other.candidates;
        self.trades_recorded += other.trades_recorded;
        self.rejected_insufficient_capital += other.rejected_insufficient_capital;
        self.rejected_no_holding_room += other.rejected_no_holding_room;
        self.rejected_invalid_premium += other.rejected_invalid_premium;
    }
}

/// Entry/exit bar indices for a candidate trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeCandidate {
    pub entry_index: usize,
    pub exit_index: usize,
}

/// Scanner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Looking for an entry at `cursor`.
    Scanning,
    /// A candidate occupies bars up to and including `until`.
    InTrade { until: usize },
}

/// Entry thresholds for the scanner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryRule {
    pub strength_threshold: f64,
    pub min_confidence: f64,
    pub holding_bars: usize,
}

impl EntryRule {
    pub fn is_entry(&self, frame: &SignalFrame) -> bool {
        frame.combined_signal.abs() >= self.strength_threshold
            && frame.combined_confidence >= self.min_confidence
    }
}

/// Lazily yields non-overlapping entry/exit candidates over an index range.
///
/// Every candidate consumes bars up to its exit index, whether or not the
/// caller turns it into a trade; scanning resumes at `exit_index + 1`.
pub struct EntryScanner<'a> {
    frames: &'a [SignalFrame],
    rule: EntryRule,
    last: usize,
    cursor: usize,
    state: ScanState,
    scanned: usize,
}

impl<'a> EntryScanner<'a> {
    /// Scan `frames[first..=last]`.
    pub fn new(frames: &'a [SignalFrame], rule: EntryRule, first: usize, last: usize) -> Self {
        Self {
            frames,
            rule,
            last: last.min(frames.len().saturating_sub(1)),
            cursor: first,
            state: ScanState::Scanning,
            scanned: 0,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Bars examined for an entry so far.
    pub fn bars_scanned(&self) -> usize {
        self.scanned
    }
}

impl Iterator for EntryScanner<'_> {
    type Item = TradeCandidate;

    fn next(&mut self) -> Option<Self::Item> {
        if let ScanState::InTrade { until } = self.state {
            self.cursor = until + 1;
            self.state = ScanState::Scanning;
        }

        if self.frames.is_empty() {
            return None;
        }

        while self.cursor <= self.last {
            let i = self.cursor;
            self.scanned += 1;

            if self.rule.is_entry(&self.frames[i]) {
                let exit_index = (i + self.rule.holding_bars).min(self.last);
                self.state = ScanState::InTrade { until: exit_index };
                return Some(TradeCandidate {
                    entry_index: i,
                    exit_index,
                });
            }
            self.cursor += 1;
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::SubSignal;
    use rust_decimal_macros::dec;

    fn frame(signal: f64, confidence: f64) -> SignalFrame {
        let neutral = SubSignal {
            signal: 0.0,
            confidence: 0.0,
        };
        SignalFrame {
            combined_signal: signal,
            combined_confidence: confidence,
            technical: neutral,
            momentum: neutral,
            volatility: neutral,
            volume: neutral,
        }
    }

    fn rule() -> EntryRule {
        EntryRule {
            strength_threshold: 0.3,
            min_confidence: 0.5,
            holding_bars: 7,
        }
    }

    #[test]
    fn test_contracts_for_budget() {
        assert_eq!(contracts_for_budget(dec!(400), dec!(2.5)), 1);
        assert_eq!(contracts_for_budget(dec!(400), dec!(1.0)), 4);
        assert_eq!(contracts_for_budget(dec!(400), dec!(4.01)), 0);
        assert_eq!(contracts_for_budget(dec!(400), Decimal::ZERO), 0);
    }

    #[test]
    fn test_position_pnl() {
        assert_eq!(position_pnl(dec!(2.50), dec!(3.75), 2), dec!(250));
        assert_eq!(position_pnl(dec!(2.50), dec!(1.00), 1), dec!(-150));
    }

    #[test]
    fn test_scanner_skips_weak_and_unconfident_frames() {
        let frames = vec![frame(0.2, 0.9), frame(0.5, 0.4), frame(-0.3, 0.5)];
        let candidates: Vec<_> = EntryScanner::new(&frames, rule(), 0, 2).collect();
        assert_eq!(
            candidates,
            vec![TradeCandidate {
                entry_index: 2,
                exit_index: 2
            }]
        );
    }

    #[test]
    fn test_scanner_consumes_holding_period() {
        let frames = vec![frame(0.5, 0.6); 20];
        let candidates: Vec<_> = EntryScanner::new(&frames, rule(), 0, 19).collect();

        let pairs: Vec<_> = candidates
            .iter()
            .map(|c| (c.entry_index, c.exit_index))
            .collect();
        assert_eq!(pairs, vec![(0, 7), (8, 15), (16, 19)]);
    }

    #[test]
    fn test_scanner_state_transitions() {
        let frames = vec![frame(0.0, 0.0), frame(0.5, 0.6), frame(0.0, 0.0)];
        let mut scanner = EntryScanner::new(&frames, rule(), 0, 2);
        assert_eq!(scanner.state(), ScanState::Scanning);

        let first = scanner.next().unwrap();
        assert_eq!(first.entry_index, 1);
        assert_eq!(scanner.state(), ScanState::InTrade { until: 2 });

        assert!(scanner.next().is_none());
        assert_eq!(scanner.state(), ScanState::Scanning);
        assert_eq!(scanner.bars_scanned(), 2);
    }

    #[test]
    fn test_scan_stats_rejections() {
        let mut stats = ScanStats::default();
        stats.record_rejection(&RejectionReason::NoHoldingRoom);
        stats.record_rejection(&RejectionReason::InsufficientCapital { premium: dec!(5) });
        assert_eq!(stats.total_rejected(), 2);

        let mut total = ScanStats::default();
        total.merge(&stats);
        total.merge(&stats);
        assert_eq!(total.rejected_no_holding_room, 2);
    }
}

//! Option trade simulation over test windows.
//!
//! - Entry scanning (non-overlapping, one position at a time)
//! - Premium-based trade records with rejection accounting
//! - Long calls on bullish signals, long puts on bearish ones

pub mod simulator;
pub mod trade;

pub use simulator::{window_indices, TradeConfig, TradeSimulator, WindowOutcome};
pub use trade::{
    contracts_for_budget, position_pnl, BacktestTrade, EntryRule, EntryScanner, RejectionReason,
    ScanState, ScanStats, TradeCandidate, CONTRACT_MULTIPLIER,
};

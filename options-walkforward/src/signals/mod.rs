//! Signal simulation module.
//!
//! Turns per-bar indicators into a directional score and a confidence using
//! four weighted sources:
//! - Technical: RSI extremes and Bollinger band breaks
//! - Momentum: close/SMA20/SMA50 alignment
//! - Volatility: expansion above the trailing mean (confidence only)
//! - Volume: surges above the 20-bar average (confidence only)

pub mod simulator;

pub use simulator::{SignalConfig, SignalFrame, SignalSimulator, SignalWeights, SubSignal};

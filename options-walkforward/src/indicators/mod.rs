//! Technical indicator module.
//!
//! Derives per-bar indicators from trailing windows only:
//! - RSI(14), SMA(20), SMA(50)
//! - Bollinger bands (20, 2 sigma)
//! - Annualized 20-bar volatility and its 50-bar mean
//! - Volume ratio against the 20-bar average

pub mod calculator;

pub use calculator::{AugmentedBar, IndicatorAugmenter, IndicatorConfig, IndicatorSet};

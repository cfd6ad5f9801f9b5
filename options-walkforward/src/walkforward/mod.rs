//! Walk-forward validation module.
//!
//! Slides rolling train/test windows across a date range:
//! - Train: 90 days (history the signals are allowed to have seen)
//! - Test: the following 30 days (trades are simulated here only)
//! - Step: half the test length, so test windows overlap

pub mod periods;
pub mod runner;

pub use periods::{WalkForwardWindow, WalkForwardWindows, WindowSpec};
pub use runner::{run_walk_forward, WalkForwardConfig, WalkForwardRunner};

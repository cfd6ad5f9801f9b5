//! Walk-forward runner.
//!
//! Loads bars once (with indicator warm-up before the requested start),
//! computes indicators and signal frames over the whole history, then slides
//! train/test windows across the range and simulates trades in each test
//! window. Indicators only look backward, so computing them once is the same
//! as recomputing them per window.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backtest::{TradeConfig, TradeSimulator};
use crate::data::BarProvider;
use crate::error::{BacktestError, RunResult};
use crate::indicators::{AugmentedBar, IndicatorAugmenter, IndicatorConfig};
use crate::report::{BacktestPeriod, BacktestResults};
use crate::signals::{SignalConfig, SignalFrame, SignalSimulator};
use crate::validation::BarIntegrityValidator;

use super::periods::{WalkForwardWindow, WalkForwardWindows, WindowSpec};

/// Configuration for a walk-forward run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    /// Name recorded in the results.
    pub strategy_name: String,

    /// Training window length in calendar days.
    pub training_days: i64,

    /// Test window length in calendar days.
    pub testing_days: i64,

    /// Cursor step as a fraction of `testing_days`.
    pub step_fraction: f64,

    /// Calendar days of history loaded before the start for indicator warm-up.
    pub warmup_days: i64,

    /// Evaluate periods on the rayon pool.
    pub parallel: bool,

    pub indicators: IndicatorConfig,
    pub signals: SignalConfig,
    pub trading: TradeConfig,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            strategy_name: "signal_options".to_string(),
            training_days: 90,
            testing_days: 30,
            step_fraction: 0.5,
            warmup_days: 100,
            parallel: false,
            indicators: IndicatorConfig::default(),
            signals: SignalConfig::default(),
            trading: TradeConfig::default(),
        }
    }
}

impl WalkForwardConfig {
    /// Window sizes for the period generator.
    pub fn window_spec(&self) -> WindowSpec {
        WindowSpec {
            training_days: self.training_days,
            testing_days: self.testing_days,
            step_fraction: self.step_fraction,
        }
    }

    /// Reject configurations the runner cannot evaluate.
    pub fn validate(&self) -> RunResult<()> {
        let invalid = |msg: &str| Err(BacktestError::InvalidConfig(msg.to_string()));

        if self.training_days <= 0 {
            return invalid("training_days must be positive");
        }
        if self.testing_days <= 0 {
            return invalid("testing_days must be positive");
        }
        if !(self.step_fraction > 0.0 && self.step_fraction.is_finite()) {
            return invalid("step_fraction must be a positive number");
        }
        if self.warmup_days < 0 {
            return invalid("warmup_days must not be negative");
        }

        let trading = &self.trading;
        if !(0.0..=1.0).contains(&trading.min_confidence) {
            return invalid("min_confidence must be within [0, 1]");
        }
        if trading.strength_threshold < 0.0 {
            return invalid("strength_threshold must not be negative");
        }
        if trading.max_investment <= Decimal::ZERO {
            return invalid("max_investment must be positive");
        }
        if trading.holding_bars == 0 {
            return invalid("holding_bars must be at least 1");
        }
        if trading.target_dte <= 0 {
            return invalid("target_dte must be positive");
        }
        Ok(())
    }
}

/// Runs walk-forward backtests against a bar provider.
pub struct WalkForwardRunner<P: BarProvider> {
    provider: P,
    config: WalkForwardConfig,
    cancel: Arc<AtomicBool>,
}

impl<P: BarProvider> WalkForwardRunner<P> {
    pub fn new(provider: P, config: WalkForwardConfig) -> Self {
        Self {
            provider,
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an externally owned cancellation flag.
    pub fn with_cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel = token;
        self
    }

    /// Flag that stops the run before the next period when set.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn config(&self) -> &WalkForwardConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Run the walk-forward loop for `symbol` over `[start, end]`.
    pub fn run(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> RunResult<BacktestResults> {
        self.config.validate()?;
        if end < start {
            return Err(BacktestError::InvalidConfig(format!(
                "end date {} is before start date {}",
                end, start
            )));
        }

        let cfg = &self.config;
        let load_start = start - Duration::days(cfg.warmup_days);

        info!(
            "Loading bars for {} from {} to {} ({} days warm-up)",
            symbol, load_start, end, cfg.warmup_days
        );
        let bars = self.provider.fetch_bars(symbol, load_start, end)?;
        if bars.is_empty() {
            warn!(
                "No bars for {} between {} and {}; nothing to backtest",
                symbol, load_start, end
            );
            return Err(BacktestError::DataUnavailable {
                symbol: symbol.to_string(),
                start: load_start,
                end,
            });
        }
        info!("Loaded {} bars", bars.len());

        let report = BarIntegrityValidator::validate(symbol, &bars);
        for check in report.failed_checks() {
            warn!("Bar check {} failed: {}", check.name, check.message);
        }

        let augmented = IndicatorAugmenter::new(cfg.indicators.clone()).augment(&bars);
        let frames = SignalSimulator::new(cfg.signals.clone()).evaluate_all(&augmented);

        let warmed = augmented
            .iter()
            .take_while(|b| b.bar.date < start)
            .count();
        if warmed < cfg.indicators.warmup_bars() {
            warn!(
                "Only {} bars before {}; indicators need {} to warm up",
                warmed,
                start,
                cfg.indicators.warmup_bars()
            );
        }

        let windows = WalkForwardWindows::new(cfg.window_spec(), start, end).generate();
        info!(
            "Generated {} walk-forward periods ({} train / {} test days, step {})",
            windows.len(),
            cfg.training_days,
            cfg.testing_days,
            cfg.window_spec().step_days()
        );

        let simulator = TradeSimulator::new(cfg.trading.clone());
        let total = windows.len();

        let periods = if cfg.parallel {
            windows
                .par_iter()
                .map(|window| {
                    if self.is_cancelled() {
                        return None;
                    }
                    Some(evaluate_period(&simulator, &augmented, &frames, window, total))
                })
                .collect::<Option<Vec<_>>>()
                .ok_or(BacktestError::Cancelled)?
        } else {
            let mut periods = Vec::with_capacity(total);
            for window in &windows {
                if self.is_cancelled() {
                    return Err(BacktestError::Cancelled);
                }
                periods.push(evaluate_period(&simulator, &augmented, &frames, window, total));
            }
            periods
        };

        if self.is_cancelled() {
            return Err(BacktestError::Cancelled);
        }

        let next_cursor = start + Duration::days(cfg.window_spec().step_days() * total as i64);
        info!(
            "Walk-forward complete: next window from {} would end after {}",
            next_cursor, end
        );

        Ok(BacktestResults::aggregate(
            symbol,
            start,
            end,
            periods,
            cfg.clone(),
        ))
    }
}

/// Simulate one test window.
fn evaluate_period(
    simulator: &TradeSimulator,
    bars: &[AugmentedBar],
    frames: &[SignalFrame],
    window: &WalkForwardWindow,
    total: usize,
) -> BacktestPeriod {
    let outcome = simulator.simulate_window(bars, frames, window.test);
    let period = BacktestPeriod::new(
        window.period_num,
        window.training,
        window.test,
        outcome.trades,
        outcome.stats,
    );

    info!(
        "Period {}/{}: test {} to {}, {} trades, P&L ${:.2}",
        period.period_num,
        total,
        period.test_window.start,
        period.test_window.end,
        period.trades.len(),
        period.period_metrics.total_return
    );
    debug!("Period {} stats: {:?}", period.period_num, period.stats);

    period
}

/// Run a walk-forward backtest with the default configuration and the given
/// window sizes and trade limits.
#[allow(clippy::too_many_arguments)]
pub fn run_walk_forward<P: BarProvider>(
    provider: P,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    training_days: i64,
    testing_days: i64,
    min_confidence: f64,
    max_investment: Decimal,
) -> RunResult<BacktestResults> {
    let mut config = WalkForwardConfig {
        training_days,
        testing_days,
        ..WalkForwardConfig::default()
    };
    config.trading.min_confidence = min_confidence;
    config.trading.max_investment = max_investment;

    WalkForwardRunner::new(provider, config).run(symbol, start, end)
}

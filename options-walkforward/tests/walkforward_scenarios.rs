//! End-to-end walk-forward scenarios over synthetic bar series.

use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use options_walkforward::backtest::{TradeConfig, TradeSimulator};
use options_walkforward::data::{DateWindow, InMemoryBars, OptionType, PriceBar};
use options_walkforward::indicators::IndicatorAugmenter;
use options_walkforward::report::{BacktestPeriod, BacktestResults};
use options_walkforward::signals::{SignalFrame, SignalSimulator, SubSignal};
use options_walkforward::walkforward::{run_walk_forward, WalkForwardConfig, WalkForwardRunner};
use options_walkforward::BacktestError;

fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap() + Duration::days(n)
}

fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PriceBar::flat(day(i as i64), c, 1_000_000))
        .collect()
}

fn flat_bars(count: usize) -> Vec<PriceBar> {
    bars_from_closes(&vec![100.0; count])
}

/// Steady rally, a slow nine-bar slide, one sharp drop, then a 5% recovery
/// over seven bars. Only the drop bar pushes RSI under 30 and the close under
/// the lower band while the 20-bar SMA is still above the 50-bar SMA.
fn crash_and_recovery() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..120).map(|i| 60.0 + 0.5 * i as f64).collect();
    let mut last = closes[119];
    for factor in [0.995; 9].into_iter().chain([0.94]) {
        last *= factor;
        closes.push(last);
    }
    let bottom = last;
    for j in 1..=7 {
        closes.push(bottom * (1.0 + 0.05 * j as f64 / 7.0));
    }
    let top = bottom * 1.05;
    closes.extend([top; 20]);
    closes
}

const CRASH_BAR: usize = 129;

fn reachable_confidence() -> WalkForwardConfig {
    let mut config = WalkForwardConfig::default();
    config.trading.min_confidence = 0.45;
    config
}

#[test]
fn flat_market_never_trades() {
    let provider = InMemoryBars::new().with_symbol("SPY", flat_bars(300));
    let runner = WalkForwardRunner::new(provider, WalkForwardConfig::default());

    let results = runner.run("SPY", day(100), day(299)).unwrap();

    assert!(!results.periods.is_empty());
    assert_eq!(results.aggregate_metrics.total_trades, 0);
    assert_eq!(results.aggregate_metrics.win_rate, 0.0);
    assert_eq!(results.aggregate_metrics.total_return, Decimal::ZERO);
    assert_eq!(results.stats.candidates, 0);
    assert_eq!(results.consistency_score, 1.0);
}

#[test]
fn crash_then_recovery_buys_one_profitable_call() {
    let closes = crash_and_recovery();
    let bars = bars_from_closes(&closes);
    let config = reachable_confidence();

    let augmented = IndicatorAugmenter::new(config.indicators.clone()).augment(&bars);
    let frames = SignalSimulator::new(config.signals.clone()).evaluate_all(&augmented);
    let simulator = TradeSimulator::new(config.trading.clone());

    let window = DateWindow::new(day(100), day(closes.len() as i64 - 1));
    let outcome = simulator.simulate_window(&augmented, &frames, window);

    assert_eq!(outcome.trades.len(), 1);
    let trade = &outcome.trades[0];
    assert_eq!(trade.entry_date, day(CRASH_BAR as i64));
    assert_eq!(trade.exit_date, day(CRASH_BAR as i64 + 7));
    assert_eq!(trade.option_type, OptionType::Call);

    let expected_strike = Decimal::from_f64_retain(closes[CRASH_BAR] * 1.02)
        .unwrap()
        .round_dp(4);
    assert_eq!(trade.strike, expected_strike);
    assert!((trade.actual_move - 0.05).abs() < 1e-9);
    assert!(trade.profit_loss > Decimal::ZERO);
    assert!(trade.direction_correct());
}

#[test]
fn crash_then_recovery_through_runner_dedups_overlap() {
    let closes = crash_and_recovery();
    let provider = InMemoryBars::new().with_symbol("SPY", bars_from_closes(&closes));
    let runner = WalkForwardRunner::new(provider, reachable_confidence());

    let results = runner.run("SPY", day(0), day(159)).unwrap();
    assert_eq!(results.periods.len(), 3);

    // The crash bar sits in the overlap of the last two test windows.
    let periods_with_trade = results
        .periods
        .iter()
        .filter(|p| !p.trades.is_empty())
        .count();
    assert_eq!(periods_with_trade, 2);

    let trades = results.all_trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].exit_date, day(CRASH_BAR as i64 + 7));
    assert_eq!(results.aggregate_metrics.total_trades, 1);
    assert!(results.aggregate_metrics.profit_factor.is_infinite());
}

#[test]
fn default_confidence_is_unreachable() {
    let closes = crash_and_recovery();
    let provider = InMemoryBars::new().with_symbol("SPY", bars_from_closes(&closes));

    let results = run_walk_forward(provider, "SPY", day(0), day(159), 90, 30, 0.8, dec!(400))
        .unwrap();
    assert_eq!(results.aggregate_metrics.total_trades, 0);
}

#[test]
fn two_hundred_day_range_yields_six_periods() {
    let provider = InMemoryBars::new().with_symbol("SPY", flat_bars(320));
    let runner = WalkForwardRunner::new(provider, WalkForwardConfig::default());

    let results = runner.run("SPY", day(100), day(299)).unwrap();

    assert_eq!(results.periods.len(), (200 - 120) / 15 + 1);
    for period in &results.periods {
        assert!(period.test_window.len_days() <= 30);
        assert!(period.test_window.end <= day(299));
    }
}

#[test]
fn range_shorter_than_one_window_yields_no_periods() {
    let provider = InMemoryBars::new().with_symbol("SPY", flat_bars(300));
    let runner = WalkForwardRunner::new(provider, WalkForwardConfig::default());

    for end in [day(100), day(150)] {
        let results = runner.run("SPY", day(100), end).unwrap();
        assert!(results.periods.is_empty());
        assert_eq!(results.aggregate_metrics.total_trades, 0);
        assert_eq!(results.consistency_score, 0.5);
        assert_eq!(results.end_date, end);
    }
}

#[test]
fn losing_period_metrics() {
    let bars = flat_bars(40);
    let mut augmented = IndicatorAugmenter::default().augment(&bars);
    // Flat closes give zero realized volatility; price with the default instead.
    for bar in augmented.iter_mut() {
        bar.indicators.volatility_20 = None;
    }
    let neutral = SubSignal {
        signal: 0.0,
        confidence: 0.3,
    };
    let bearish = SignalFrame {
        combined_signal: -0.5,
        combined_confidence: 0.6,
        technical: neutral,
        momentum: neutral,
        volatility: neutral,
        volume: neutral,
    };
    let frames = vec![bearish; bars.len()];

    let simulator = TradeSimulator::new(TradeConfig {
        min_confidence: 0.5,
        ..TradeConfig::default()
    });
    let test = DateWindow::new(day(10), day(39));
    let outcome = simulator.simulate_window(&augmented, &frames, test);
    assert!(outcome.trades.len() >= 3);
    assert!(outcome.trades.iter().all(|t| t.profit_loss < Decimal::ZERO));

    let period = BacktestPeriod::new(
        1,
        DateWindow::new(day(0), day(9)),
        test,
        outcome.trades,
        outcome.stats,
    );
    let metrics = &period.period_metrics;
    assert_eq!(metrics.profit_factor, 0.0);
    assert_eq!(metrics.max_drawdown, metrics.total_return.abs());
}

#[test]
fn indicators_and_signals_are_causal() {
    let closes = crash_and_recovery();
    let bars = bars_from_closes(&closes);
    let augmenter = IndicatorAugmenter::default();
    let signals = SignalSimulator::default();

    let full = signals.evaluate_all(&augmenter.augment(&bars));
    for i in [20, 50, 69, 119, CRASH_BAR, 140] {
        let truncated = signals.evaluate_all(&augmenter.augment(&bars[..=i]));
        assert_eq!(truncated[i], full[i], "frame changed at bar {}", i);
    }
}

#[test]
fn trades_stay_inside_test_windows() {
    let closes: Vec<f64> = (0..400)
        .map(|i| 100.0 + 10.0 * (i as f64 * 0.09).sin() + 4.0 * (i as f64 * 0.37).cos())
        .collect();
    let provider = InMemoryBars::new().with_symbol("QQQ", bars_from_closes(&closes));
    let mut config = WalkForwardConfig::default();
    config.trading.min_confidence = 0.4;
    config.trading.strength_threshold = 0.2;

    let results = WalkForwardRunner::new(provider, config)
        .run("QQQ", day(100), day(399))
        .unwrap();
    assert!(results.aggregate_metrics.total_trades > 0);

    for period in &results.periods {
        assert!(period.test_window.start > period.training_window.end);
        for trade in &period.trades {
            assert!(trade.entry_date > period.training_window.end);
            assert!(period.test_window.contains(trade.entry_date));
            assert!(period.test_window.contains(trade.exit_date));
            assert!(trade.entry_date < trade.exit_date);
            assert!(trade.contracts >= 1);
        }
        for pair in period.trades.windows(2) {
            assert!(pair[0].exit_date < pair[1].entry_date);
        }
    }

    let wins = results
        .all_trades()
        .iter()
        .filter(|t| t.profit_loss > Decimal::ZERO)
        .count();
    let profit_factor = results.aggregate_metrics.profit_factor;
    assert_eq!(profit_factor.is_infinite(), wins == results.aggregate_metrics.total_trades);
    assert!(results.aggregate_metrics.total_return.to_f64().is_some());
}

#[test]
fn results_survive_json_round_trip() {
    let closes = crash_and_recovery();
    let provider = InMemoryBars::new().with_symbol("SPY", bars_from_closes(&closes));
    let results = WalkForwardRunner::new(provider, reachable_confidence())
        .run("SPY", day(0), day(159))
        .unwrap();

    let json = results.to_json().unwrap();
    let back = BacktestResults::from_json(&json).unwrap();
    assert_eq!(back, results);
}

#[test]
fn unknown_symbol_is_data_unavailable() {
    let provider = InMemoryBars::new().with_symbol("SPY", flat_bars(300));
    let runner = WalkForwardRunner::new(provider, WalkForwardConfig::default());

    match runner.run("IWM", day(100), day(299)) {
        Err(BacktestError::DataUnavailable { symbol, .. }) => assert_eq!(symbol, "IWM"),
        other => panic!("expected DataUnavailable, got {:?}", other.map(|r| r.periods.len())),
    }
}

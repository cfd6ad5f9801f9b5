//! Causal technical indicators.
//!
//! Every value at bar `i` is computed from bars `..=i` only, so truncating
//! the input after bar `i` never changes what bar `i` sees. Values that need
//! more history than is available are `None` rather than NaN.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::data::PriceBar;

/// Indicator values attached to a single bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub rsi_14: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_lower: Option<f64>,
    /// Annualized stdev of daily returns.
    pub volatility_20: Option<f64>,
    /// Trailing mean of `volatility_20`, used for the volatility-expansion check.
    pub volatility_mean_50: Option<f64>,
    pub volume_ratio: Option<f64>,
}

/// A price bar with its indicators.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedBar {
    pub bar: PriceBar,
    pub indicators: IndicatorSet,
}

/// Lookback configuration for the indicator set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub sma_short: usize,
    pub sma_long: usize,
    pub bollinger_period: usize,
    pub bollinger_std: f64,
    pub volatility_period: usize,
    pub volatility_mean_period: usize,
    pub volume_period: usize,
    pub trading_days_per_year: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            sma_short: 20,
            sma_long: 50,
            bollinger_period: 20,
            bollinger_std: 2.0,
            volatility_period: 20,
            volatility_mean_period: 50,
            volume_period: 20,
            trading_days_per_year: 252.0,
        }
    }
}

impl IndicatorConfig {
    /// Minimum number of bars before every indicator except the volatility
    /// mean is defined.
    pub fn warmup_bars(&self) -> usize {
        self.sma_long
            .max(self.rsi_period + 1)
            .max(self.bollinger_period)
            .max(self.volatility_period + 1)
            .max(self.volume_period)
    }
}

/// Attaches an [`IndicatorSet`] to each bar.
pub struct IndicatorAugmenter {
    config: IndicatorConfig,
}

impl Default for IndicatorAugmenter {
    fn default() -> Self {
        Self::new(IndicatorConfig::default())
    }
}

impl IndicatorAugmenter {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    /// Compute indicators for every bar in an ascending series.
    pub fn augment(&self, bars: &[PriceBar]) -> Vec<AugmentedBar> {
        self.compute(bars)
            .into_iter()
            .zip(bars.iter().cloned())
            .map(|(indicators, bar)| AugmentedBar { bar, indicators })
            .collect()
    }

    /// Compute the indicator sets without attaching them to bars.
    pub fn compute(&self, bars: &[PriceBar]) -> Vec<IndicatorSet> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();

        // returns[i] is the pct change from close i-1 to i; undefined at 0.
        let returns: Vec<Option<f64>> = (0..closes.len())
            .map(|i| {
                if i == 0 || closes[i - 1] == 0.0 {
                    None
                } else {
                    Some(closes[i] / closes[i - 1] - 1.0)
                }
            })
            .collect();

        let cfg = &self.config;
        let mut sets: Vec<IndicatorSet> = Vec::with_capacity(bars.len());

        for i in 0..bars.len() {
            let sma_20 = trailing(&closes, i, cfg.sma_short).map(|w| w.mean());
            let sma_50 = trailing(&closes, i, cfg.sma_long).map(|w| w.mean());

            let (bollinger_upper, bollinger_lower) =
                match trailing(&closes, i, cfg.bollinger_period) {
                    Some(window) => {
                        let mid = window.mean();
                        let std = sample_std(window);
                        (
                            Some(mid + cfg.bollinger_std * std),
                            Some(mid - cfg.bollinger_std * std),
                        )
                    }
                    None => (None, None),
                };

            let volatility_20 = trailing(&returns, i, cfg.volatility_period)
                .and_then(|w| w.iter().copied().collect::<Option<Vec<f64>>>())
                .map(|r| sample_std(&r) * cfg.trading_days_per_year.sqrt());

            let volume_ratio = trailing(&volumes, i, cfg.volume_period).and_then(|w| {
                let avg = w.mean();
                (avg > 0.0).then(|| volumes[i] / avg)
            });

            sets.push(IndicatorSet {
                rsi_14: rsi(&closes, i, cfg.rsi_period),
                sma_20,
                sma_50,
                bollinger_upper,
                bollinger_lower,
                volatility_20,
                volatility_mean_50: None,
                volume_ratio,
            });
        }

        // Second pass: the volatility mean only reads already-computed
        // volatility values at or before each bar.
        let vols: Vec<Option<f64>> = sets.iter().map(|s| s.volatility_20).collect();
        for (i, set) in sets.iter_mut().enumerate() {
            set.volatility_mean_50 = trailing(&vols, i, cfg.volatility_mean_period)
                .and_then(|w| w.iter().copied().collect::<Option<Vec<f64>>>())
                .map(|v| v.mean());
        }

        sets
    }
}

/// The `len` values ending at index `i`, if that much history exists.
fn trailing<T>(values: &[T], i: usize, len: usize) -> Option<&[T]> {
    if len == 0 || i + 1 < len || i >= values.len() {
        return None;
    }
    Some(&values[i + 1 - len..=i])
}

/// Sample standard deviation, 0 for fewer than two values.
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let std = values.std_dev();
    if std.is_finite() {
        std
    } else {
        0.0
    }
}

/// RSI from rolling means of gains and losses over `period` close deltas.
fn rsi(closes: &[f64], i: usize, period: usize) -> Option<f64> {
    if period == 0 || i < period {
        return None;
    }

    let (gains, losses) = (i + 1 - period..=i).fold((0.0, 0.0), |(g, l), j| {
        let delta = closes[j] - closes[j - 1];
        if delta > 0.0 {
            (g + delta, l)
        } else {
            (g, l - delta)
        }
    });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            return None;
        }
        return Some(100.0);
    }

    Some(100.0 - 100.0 / (1.0 + avg_gain / avg_loss))
}

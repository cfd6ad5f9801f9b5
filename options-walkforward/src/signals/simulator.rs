//! Deterministic signal simulation.
//!
//! Replays the live bot's four signal sources from indicators alone:
//! technical (RSI + Bollinger), momentum (SMA alignment), volatility
//! expansion and volume surges. Each source yields a direction and a
//! confidence; the frame combines both channels with fixed weights.

use serde::{Deserialize, Serialize};

use crate::indicators::{AugmentedBar, IndicatorSet};

/// Direction and confidence from one signal source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubSignal {
    pub signal: f64,
    pub confidence: f64,
}

impl SubSignal {
    fn new(signal: f64, confidence: f64) -> Self {
        Self { signal, confidence }
    }
}

/// Combined signal for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalFrame {
    /// Direction strength in [-1, 1]; positive favors calls.
    pub combined_signal: f64,
    /// Confidence in [0, 1].
    pub combined_confidence: f64,
    pub technical: SubSignal,
    pub momentum: SubSignal,
    pub volatility: SubSignal,
    pub volume: SubSignal,
}

/// Per-source weights applied to both channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    pub technical: f64,
    pub momentum: f64,
    pub volatility: f64,
    pub volume: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            technical: 0.3,
            momentum: 0.4,
            volatility: 0.1,
            volume: 0.2,
        }
    }
}

/// Thresholds and contributions for the signal rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub weights: SignalWeights,

    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub rsi_contribution: f64,
    pub bollinger_contribution: f64,
    pub technical_base_confidence: f64,
    pub technical_confidence: f64,

    pub momentum_contribution: f64,
    pub momentum_base_confidence: f64,
    pub momentum_confidence: f64,

    /// Volatility must exceed its trailing mean by this multiple.
    pub volatility_expansion: f64,
    pub volatility_base_confidence: f64,
    pub volatility_confidence: f64,

    pub volume_surge_ratio: f64,
    pub volume_base_confidence: f64,
    pub volume_confidence: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            weights: SignalWeights::default(),
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_contribution: 0.6,
            bollinger_contribution: 0.4,
            technical_base_confidence: 0.3,
            technical_confidence: 0.7,
            momentum_contribution: 0.5,
            momentum_base_confidence: 0.4,
            momentum_confidence: 0.6,
            volatility_expansion: 1.5,
            volatility_base_confidence: 0.4,
            volatility_confidence: 0.6,
            volume_surge_ratio: 1.5,
            volume_base_confidence: 0.3,
            volume_confidence: 0.5,
        }
    }
}

impl SignalConfig {
    /// Highest combined confidence the rules can produce (every source
    /// triggered at once).
    pub fn max_confidence(&self) -> f64 {
        let w = &self.weights;
        w.technical * self.technical_confidence
            + w.momentum * self.momentum_confidence
            + w.volatility * self.volatility_confidence
            + w.volume * self.volume_confidence
    }
}

/// Turns indicator sets into signal frames.
///
/// Stateless: a frame depends only on its own bar's close and indicators.
#[derive(Debug, Clone, Default)]
pub struct SignalSimulator {
    config: SignalConfig,
}

impl SignalSimulator {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Signal frame for an augmented bar.
    pub fn evaluate(&self, bar: &AugmentedBar) -> SignalFrame {
        self.frame(bar.bar.close, &bar.indicators)
    }

    /// Signal frames for a whole series, index-aligned with the input.
    pub fn evaluate_all(&self, bars: &[AugmentedBar]) -> Vec<SignalFrame> {
        bars.iter().map(|b| self.evaluate(b)).collect()
    }

    /// Signal frame from a close price and its indicators.
    pub fn frame(&self, close: f64, ind: &IndicatorSet) -> SignalFrame {
        let technical = self.technical(close, ind);
        let momentum = self.momentum(close, ind);
        let volatility = self.volatility(ind);
        let volume = self.volume(ind);

        let w = &self.config.weights;
        let combined_signal = technical.signal * w.technical
            + momentum.signal * w.momentum
            + volatility.signal * w.volatility
            + volume.signal * w.volume;
        let combined_confidence = technical.confidence * w.technical
            + momentum.confidence * w.momentum
            + volatility.confidence * w.volatility
            + volume.confidence * w.volume;

        SignalFrame {
            combined_signal: combined_signal.clamp(-1.0, 1.0),
            combined_confidence: combined_confidence.clamp(0.0, 1.0),
            technical,
            momentum,
            volatility,
            volume,
        }
    }

    fn technical(&self, close: f64, ind: &IndicatorSet) -> SubSignal {
        let cfg = &self.config;
        let mut signal = 0.0;
        let mut triggered = false;

        if let Some(rsi) = ind.rsi_14 {
            if rsi < cfg.rsi_oversold {
                signal += cfg.rsi_contribution;
                triggered = true;
            } else if rsi > cfg.rsi_overbought {
                signal -= cfg.rsi_contribution;
                triggered = true;
            }
        }

        if let (Some(upper), Some(lower)) = (ind.bollinger_upper, ind.bollinger_lower) {
            if close < lower {
                signal += cfg.bollinger_contribution;
                triggered = true;
            } else if close > upper {
                signal -= cfg.bollinger_contribution;
                triggered = true;
            }
        }

        let confidence = if triggered {
            cfg.technical_confidence
        } else {
            cfg.technical_base_confidence
        };
        SubSignal::new(signal, confidence)
    }

    fn momentum(&self, close: f64, ind: &IndicatorSet) -> SubSignal {
        let cfg = &self.config;
        let (Some(sma_20), Some(sma_50)) = (ind.sma_20, ind.sma_50) else {
            return SubSignal::new(0.0, cfg.momentum_base_confidence);
        };

        if close > sma_20 && close > sma_50 && sma_20 > sma_50 {
            SubSignal::new(cfg.momentum_contribution, cfg.momentum_confidence)
        } else if close < sma_20 && close < sma_50 && sma_20 < sma_50 {
            SubSignal::new(-cfg.momentum_contribution, cfg.momentum_confidence)
        } else {
            SubSignal::new(0.0, cfg.momentum_base_confidence)
        }
    }

    fn volatility(&self, ind: &IndicatorSet) -> SubSignal {
        let cfg = &self.config;
        let expanding = matches!(
            (ind.volatility_20, ind.volatility_mean_50),
            (Some(vol), Some(mean)) if vol > mean * cfg.volatility_expansion
        );
        let confidence = if expanding {
            cfg.volatility_confidence
        } else {
            cfg.volatility_base_confidence
        };
        SubSignal::new(0.0, confidence)
    }

    fn volume(&self, ind: &IndicatorSet) -> SubSignal {
        let cfg = &self.config;
        let surge = ind
            .volume_ratio
            .is_some_and(|ratio| ratio > cfg.volume_surge_ratio);
        let confidence = if surge {
            cfg.volume_confidence
        } else {
            cfg.volume_base_confidence
        };
        SubSignal::new(0.0, confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn neutral() -> IndicatorSet {
        IndicatorSet {
            rsi_14: Some(50.0),
            sma_20: Some(100.0),
            sma_50: Some(100.0),
            bollinger_upper: Some(105.0),
            bollinger_lower: Some(95.0),
            volatility_20: Some(0.2),
            volatility_mean_50: Some(0.2),
            volume_ratio: Some(1.0),
        }
    }

    #[test]
    fn test_neutral_frame() {
        let frame = SignalSimulator::default().frame(100.0, &neutral());
        assert_eq!(frame.combined_signal, 0.0);
        // 0.3*0.3 + 0.4*0.4 + 0.1*0.4 + 0.2*0.3
        assert_relative_eq!(frame.combined_confidence, 0.35, epsilon = 1e-12);
    }

    #[test]
    fn test_oversold_below_band() {
        let ind = IndicatorSet {
            rsi_14: Some(20.0),
            ..neutral()
        };
        let frame = SignalSimulator::default().frame(94.0, &ind);

        assert_relative_eq!(frame.technical.signal, 1.0, epsilon = 1e-12);
        assert_eq!(frame.technical.confidence, 0.7);
        // close below both SMAs but SMAs equal: no momentum trigger
        assert_eq!(frame.momentum.signal, 0.0);
        assert_relative_eq!(frame.combined_signal, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_overbought_above_band() {
        let ind = IndicatorSet {
            rsi_14: Some(80.0),
            ..neutral()
        };
        let frame = SignalSimulator::default().frame(106.0, &ind);
        assert_relative_eq!(frame.technical.signal, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_momentum_alignment() {
        let bullish = IndicatorSet {
            sma_20: Some(102.0),
            sma_50: Some(100.0),
            ..neutral()
        };
        let frame = SignalSimulator::default().frame(104.0, &bullish);
        assert_eq!(frame.momentum, SubSignal::new(0.5, 0.6));
        assert_relative_eq!(frame.combined_signal, 0.2, epsilon = 1e-12);

        let bearish = IndicatorSet {
            sma_20: Some(98.0),
            sma_50: Some(100.0),
            ..neutral()
        };
        let frame = SignalSimulator::default().frame(96.0, &bearish);
        assert_eq!(frame.momentum, SubSignal::new(-0.5, 0.6));
    }

    #[test]
    fn test_volatility_and_volume_only_raise_confidence() {
        let ind = IndicatorSet {
            volatility_20: Some(0.5),
            volatility_mean_50: Some(0.2),
            volume_ratio: Some(2.0),
            ..neutral()
        };
        let frame = SignalSimulator::default().frame(100.0, &ind);
        assert_eq!(frame.combined_signal, 0.0);
        assert_eq!(frame.volatility.confidence, 0.6);
        assert_eq!(frame.volume.confidence, 0.5);
        assert!(frame.combined_confidence > 0.35);
    }

    #[test]
    fn test_missing_indicators_are_neutral() {
        let frame = SignalSimulator::default().frame(100.0, &IndicatorSet::default());
        assert_eq!(frame.combined_signal, 0.0);
        assert_relative_eq!(frame.combined_confidence, 0.35, epsilon = 1e-12);
    }

    #[test]
    fn test_max_confidence_ceiling() {
        let config = SignalConfig::default();
        assert_relative_eq!(config.max_confidence(), 0.61, epsilon = 1e-12);

        let ind = IndicatorSet {
            rsi_14: Some(10.0),
            sma_20: Some(98.0),
            sma_50: Some(100.0),
            volatility_20: Some(0.9),
            volatility_mean_50: Some(0.2),
            volume_ratio: Some(3.0),
            ..neutral()
        };
        let frame = SignalSimulator::new(config.clone()).frame(90.0, &ind);
        assert_relative_eq!(frame.combined_confidence, config.max_confidence(), epsilon = 1e-12);
    }
}

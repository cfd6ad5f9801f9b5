pub mod backtest;
pub mod data;
pub mod error;
pub mod indicators;
pub mod metrics;
pub mod pricing;
pub mod report;
pub mod signals;
pub mod validation;
pub mod walkforward;

// Re-export commonly used types
pub use backtest::{BacktestTrade, RejectionReason, ScanStats, TradeConfig, TradeSimulator};
pub use data::{BarProvider, DateWindow, InMemoryBars, OptionType, ParquetBarLoader, PriceBar};
pub use error::{BacktestError, RunResult};
pub use indicators::{AugmentedBar, IndicatorAugmenter, IndicatorConfig, IndicatorSet};
pub use metrics::{MetricsCalculator, PerformanceMetrics};
pub use pricing::{estimate_premium, PremiumModel};
pub use report::{BacktestPeriod, BacktestResults, ExportError};
pub use signals::{SignalConfig, SignalFrame, SignalSimulator};
pub use validation::{BarIntegrityReport, BarIntegrityValidator};
pub use walkforward::{run_walk_forward, WalkForwardConfig, WalkForwardRunner};

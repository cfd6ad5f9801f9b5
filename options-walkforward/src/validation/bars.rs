//! Integrity checks for daily price bars.
//!
//! Validates:
//! - Date ordering (strictly ascending, no duplicates)
//! - Date continuity (no gaps longer than a week)
//! - Price validity (positive prices, low <= open/close <= high)
//! - Volume validity (non-negative)
//!
//! The walk-forward runner logs failed checks as warnings; they never abort
//! a run because the bar provider is allowed to omit non-trading days.

use chrono::NaiveDate;

use crate::data::PriceBar;

/// Gap in calendar days above which consecutive bars are flagged.
const MAX_GAP_DAYS: i64 = 7;

/// Result of a single validation check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
}

impl CheckResult {
    pub fn pass(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.to_string(),
            details: None,
        }
    }

    pub fn fail(name: &str, message: &str, details: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.to_string(),
            details,
        }
    }
}

/// Integrity report for one symbol's bar series.
#[derive(Debug)]
pub struct BarIntegrityReport {
    pub symbol: String,
    pub bar_count: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub checks: Vec<CheckResult>,
}

impl BarIntegrityReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failed_checks(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }

    pub fn summary(&self) -> String {
        let passed = self.checks.iter().filter(|c| c.passed).count();
        let range = match (self.first_date, self.last_date) {
            (Some(first), Some(last)) => format!("{} to {}", first, last),
            _ => "no data".to_string(),
        };
        format!(
            "{} ({} bars, {}): {}/{} checks passed",
            self.symbol,
            self.bar_count,
            range,
            passed,
            self.checks.len()
        )
    }
}

/// Validator for bar series.
pub struct BarIntegrityValidator;

impl BarIntegrityValidator {
    /// Run all checks on a bar series.
    pub fn validate(symbol: &str, bars: &[PriceBar]) -> BarIntegrityReport {
        let checks = vec![
            Self::check_ordering(bars),
            Self::check_date_continuity(bars),
            Self::check_price_validity(bars),
            Self::check_volume_validity(bars),
        ];

        BarIntegrityReport {
            symbol: symbol.to_string(),
            bar_count: bars.len(),
            first_date: bars.first().map(|b| b.date),
            last_date: bars.last().map(|b| b.date),
            checks,
        }
    }

    fn check_ordering(bars: &[PriceBar]) -> CheckResult {
        let out_of_order: Vec<String> = bars
            .windows(2)
            .filter(|w| w[1].date <= w[0].date)
            .map(|w| format!("{} after {}", w[1].date, w[0].date))
            .collect();

        if out_of_order.is_empty() {
            CheckResult::pass("date_ordering", "Dates strictly ascending")
        } else {
            CheckResult::fail(
                "date_ordering",
                &format!("{} ordering violations", out_of_order.len()),
                Some(out_of_order.join(", ")),
            )
        }
    }

    fn check_date_continuity(bars: &[PriceBar]) -> CheckResult {
        if bars.is_empty() {
            return CheckResult::fail("date_continuity", "No bars found", None);
        }

        let gaps: Vec<String> = bars
            .windows(2)
            .filter_map(|w| {
                let gap_days = (w[1].date - w[0].date).num_days();
                (gap_days > MAX_GAP_DAYS)
                    .then(|| format!("{} to {} ({} days)", w[0].date, w[1].date, gap_days))
            })
            .collect();

        if gaps.is_empty() {
            CheckResult::pass(
                "date_continuity",
                &format!("{} bars, no major gaps", bars.len()),
            )
        } else {
            CheckResult::fail(
                "date_continuity",
                &format!("{} major gaps found", gaps.len()),
                Some(gaps.join(", ")),
            )
        }
    }

    fn check_price_validity(bars: &[PriceBar]) -> CheckResult {
        let invalid: Vec<String> = bars
            .iter()
            .filter(|b| {
                !(b.close > 0.0 && b.open > 0.0 && b.low > 0.0)
                    || b.low > b.high
                    || b.close > b.high
                    || b.close < b.low
                    || b.open > b.high
                    || b.open < b.low
            })
            .map(|b| b.date.to_string())
            .collect();

        if invalid.is_empty() {
            CheckResult::pass("price_validity", "All OHLC values consistent")
        } else {
            CheckResult::fail(
                "price_validity",
                &format!("{} bars with invalid prices", invalid.len()),
                Some(invalid.join(", ")),
            )
        }
    }

    fn check_volume_validity(bars: &[PriceBar]) -> CheckResult {
        let negative = bars.iter().filter(|b| b.volume < 0).count();
        if negative == 0 {
            CheckResult::pass("volume_validity", "All volumes non-negative")
        } else {
            CheckResult::fail(
                "volume_validity",
                &format!("{} bars with negative volume", negative),
                None,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn series(n: i64) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| PriceBar::new(start + Duration::days(i), 100.0, 101.0, 99.0, 100.5, 1_000))
            .collect()
    }

    #[test]
    fn test_clean_series_passes() {
        let report = BarIntegrityValidator::validate("SPY", &series(30));
        assert!(report.all_passed());
        assert_eq!(report.bar_count, 30);
        assert!(report.summary().contains("4/4 checks passed"));
    }

    #[test]
    fn test_empty_series_fails_continuity() {
        let report = BarIntegrityValidator::validate("SPY", &[]);
        assert!(!report.all_passed());
        assert_eq!(report.failed_checks()[0].name, "date_continuity");
    }

    #[test]
    fn test_detects_gap_and_bad_prices() {
        let mut bars = series(5);
        bars[4].date = bars[3].date + Duration::days(12);
        bars[2].high = 90.0;

        let report = BarIntegrityValidator::validate("SPY", &bars);
        let failed: Vec<_> = report.failed_checks().iter().map(|c| c.name.clone()).collect();
        assert!(failed.contains(&"date_continuity".to_string()));
        assert!(failed.contains(&"price_validity".to_string()));
    }

    #[test]
    fn test_check_result() {
        let pass = CheckResult::pass("test", "passed");
        assert!(pass.passed);

        let fail = CheckResult::fail("test", "failed", Some("details".to_string()));
        assert!(!fail.passed);
        assert_eq!(fail.details, Some("details".to_string()));
    }
}

//! Walk-forward window generation.
//!
//! Generates rolling train/test windows in calendar days. With the default
//! 50% step, consecutive test windows overlap by half their length.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::data::DateWindow;

/// A single walk-forward window with train/test splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkForwardWindow {
    /// Period number (1-indexed).
    pub period_num: usize,
    pub training: DateWindow,
    pub test: DateWindow,
}

/// Window sizes for the walk-forward loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub training_days: i64,
    pub testing_days: i64,
    /// Fraction of the test length the cursor advances each period.
    pub step_fraction: f64,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            training_days: 90,
            testing_days: 30,
            step_fraction: 0.5,
        }
    }
}

impl WindowSpec {
    /// Days the cursor advances between periods, at least 1.
    pub fn step_days(&self) -> i64 {
        ((self.testing_days as f64 * self.step_fraction).floor() as i64).max(1)
    }
}

/// Generator for walk-forward windows.
pub struct WalkForwardWindows {
    spec: WindowSpec,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl WalkForwardWindows {
    /// Create a new window generator.
    pub fn new(spec: WindowSpec, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            spec,
            start_date,
            end_date,
        }
    }

    /// Generate all windows that fit inside the range.
    ///
    /// Stops once `cursor + training_days + testing_days` passes the end date.
    pub fn generate(&self) -> Vec<WalkForwardWindow> {
        let mut windows = Vec::new();
        if self.spec.training_days <= 0 || self.spec.testing_days <= 0 {
            return windows;
        }

        let step = Duration::days(self.spec.step_days());
        let training = Duration::days(self.spec.training_days);
        let testing = Duration::days(self.spec.testing_days);
        let mut cursor = self.start_date;

        while cursor + training + testing <= self.end_date {
            let train_end = cursor + training;
            windows.push(WalkForwardWindow {
                period_num: windows.len() + 1,
                training: DateWindow::new(cursor, train_end),
                test: DateWindow::new(train_end + Duration::days(1), train_end + testing),
            });
            cursor += step;
        }

        windows
    }

    /// Get expected number of windows.
    pub fn expected_periods(&self) -> usize {
        let total = (self.end_date - self.start_date).num_days();
        let required = self.spec.training_days + self.spec.testing_days;
        if self.spec.training_days <= 0 || self.spec.testing_days <= 0 || total < required {
            return 0;
        }
        ((total - required) / self.spec.step_days() + 1) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
    }

    #[test]
    fn test_default_spec() {
        let spec = WindowSpec::default();
        assert_eq!(spec.training_days, 90);
        assert_eq!(spec.testing_days, 30);
        assert_eq!(spec.step_days(), 15);
    }

    #[test]
    fn test_step_days_minimum() {
        let spec = WindowSpec {
            testing_days: 1,
            ..WindowSpec::default()
        };
        assert_eq!(spec.step_days(), 1);
    }

    #[test]
    fn test_two_hundred_day_range() {
        let end = start() + Duration::days(200);
        let generator = WalkForwardWindows::new(WindowSpec::default(), start(), end);
        let windows = generator.generate();

        // floor((200 - 120) / 15) + 1
        assert_eq!(windows.len(), 6);
        assert_eq!(generator.expected_periods(), 6);

        for window in &windows {
            assert!(window.test.len_days() <= 30);
            assert!(window.test.end <= end);
        }
        assert_eq!(windows[1].training.start, start() + Duration::days(15));
    }

    #[test]
    fn test_window_boundaries() {
        let end = start() + Duration::days(200);
        let first = WalkForwardWindows::new(WindowSpec::default(), start(), end).generate()[0];

        assert_eq!(first.period_num, 1);
        assert_eq!(first.training.start, start());
        assert_eq!(first.training.end, start() + Duration::days(90));
        assert_eq!(first.test.start, start() + Duration::days(91));
        assert_eq!(first.test.end, start() + Duration::days(120));
    }

    #[test]
    fn test_no_leakage() {
        let end = start() + Duration::days(720);
        let windows = WalkForwardWindows::new(WindowSpec::default(), start(), end).generate();
        assert!(!windows.is_empty());
        for window in windows {
            assert!(window.test.start > window.training.end);
        }
    }

    #[test]
    fn test_range_too_short() {
        let end = start() + Duration::days(119);
        let generator = WalkForwardWindows::new(WindowSpec::default(), start(), end);
        assert!(generator.generate().is_empty());
        assert_eq!(generator.expected_periods(), 0);
    }

    #[test]
    fn test_expected_matches_generated() {
        for days in [120, 134, 135, 365, 1000] {
            let generator = WalkForwardWindows::new(
                WindowSpec::default(),
                start(),
                start() + Duration::days(days),
            );
            assert_eq!(generator.generate().len(), generator.expected_periods());
        }
    }
}

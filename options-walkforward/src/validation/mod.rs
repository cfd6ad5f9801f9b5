//! Validation module for historical bar data.
//!
//! This module checks bar series before a run:
//! - Date ordering and continuity
//! - Price and volume sanity

pub mod bars;

pub use bars::{BarIntegrityReport, BarIntegrityValidator, CheckResult};

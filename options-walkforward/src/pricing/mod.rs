//! Option premium estimation.
//!
//! A stateless analytic approximation used to value simulated option trades
//! at entry and exit.

pub mod estimator;

pub use estimator::{estimate_premium, PremiumModel};

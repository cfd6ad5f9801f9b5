//! Analytic option premium approximation.
//!
//! Not a calibrated pricer: premium is intrinsic value plus a time-value
//! term that scales with volatility and sqrt(time), shrinks exponentially
//! with distance from the money and decays with time to expiry:
//!
//! ```text
//! time_value = vol * sqrt(T) * spot * 0.4 * exp(-3 * |1 - m|) * exp(-0.5 * T)
//! ```
//!
//! where `T` is years to expiry and `m` is spot/strike for calls,
//! strike/spot for puts. The result is floored at 0.5% of spot to model the
//! minimum bid/ask spread.

use serde::{Deserialize, Serialize};

use crate::data::OptionType;

/// Constants of the premium approximation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PremiumModel {
    /// Scale applied to vol * sqrt(T) * spot.
    pub time_value_scale: f64,
    /// Exponential penalty per unit of |1 - moneyness|.
    pub moneyness_decay: f64,
    /// Exponential decay per year to expiry.
    pub time_decay: f64,
    /// Minimum premium as a fraction of spot.
    pub min_premium_pct: f64,
    /// Calendar days per year for the DTE conversion.
    pub days_per_year: f64,
}

impl Default for PremiumModel {
    fn default() -> Self {
        Self {
            time_value_scale: 0.4,
            moneyness_decay: 3.0,
            time_decay: 0.5,
            min_premium_pct: 0.005,
            days_per_year: 365.0,
        }
    }
}

impl PremiumModel {
    /// Intrinsic value per share.
    pub fn intrinsic(spot: f64, strike: f64, option_type: OptionType) -> f64 {
        match option_type {
            OptionType::Call => (spot - strike).max(0.0),
            OptionType::Put => (strike - spot).max(0.0),
        }
    }

    /// Moneyness as seen by the option holder (> 1 means in the money).
    pub fn moneyness(spot: f64, strike: f64, option_type: OptionType) -> f64 {
        match option_type {
            OptionType::Call => spot / strike,
            OptionType::Put => strike / spot,
        }
    }

    /// Time value per share for a positive number of days to expiry.
    pub fn time_value(
        &self,
        spot: f64,
        strike: f64,
        days_to_expiry: i64,
        volatility: f64,
        option_type: OptionType,
    ) -> f64 {
        if days_to_expiry <= 0 {
            return 0.0;
        }
        let years = days_to_expiry as f64 / self.days_per_year;
        let moneyness = Self::moneyness(spot, strike, option_type);

        volatility
            * years.sqrt()
            * spot
            * self.time_value_scale
            * (-self.moneyness_decay * (1.0 - moneyness).abs()).exp()
            * (-self.time_decay * years).exp()
    }

    /// Estimated premium per share.
    ///
    /// At or past expiry the premium is intrinsic value only; otherwise
    /// intrinsic plus time value, floored at `min_premium_pct` of spot.
    pub fn premium(
        &self,
        spot: f64,
        strike: f64,
        days_to_expiry: i64,
        volatility: f64,
        option_type: OptionType,
    ) -> f64 {
        let intrinsic = Self::intrinsic(spot, strike, option_type);
        if days_to_expiry <= 0 {
            return intrinsic;
        }

        let premium =
            intrinsic + self.time_value(spot, strike, days_to_expiry, volatility, option_type);
        premium.max(spot * self.min_premium_pct)
    }
}

/// Estimate a premium with the default model constants.
pub fn estimate_premium(
    spot: f64,
    strike: f64,
    days_to_expiry: i64,
    volatility: f64,
    option_type: OptionType,
) -> f64 {
    PremiumModel::default().premium(spot, strike, days_to_expiry, volatility, option_type)
}

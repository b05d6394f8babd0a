//! Tax rule abstractions
//!
//! A `TaxRule` turns a realized profit or loss into a tax amount. Keeping
//! this behind a trait lets other jurisdictions plug in without touching the
//! aggregation loop.

use chrono::NaiveDate;

pub trait TaxRule: Send + Sync {
    /// Assesses the tax owed on a profit/loss realized on `date`, expressed
    /// in the reporting currency.
    fn assess(&self, profit_or_loss: f64, date: NaiveDate) -> f64;
}

/// Flat-rate regime: positive profits are taxed at a fixed percentage,
/// losses owe nothing.
pub struct FlatRateTax {
    rate: f64,
}

impl FlatRateTax {
    /// The French "flat tax" on crypto capital gains.
    pub const DEFAULT_RATE: f64 = 0.30;

    pub fn new(rate: f64) -> Self {
        FlatRateTax { rate }
    }
}

impl Default for FlatRateTax {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RATE)
    }
}

impl TaxRule for FlatRateTax {
    fn assess(&self, profit_or_loss: f64, _date: NaiveDate) -> f64 {
        if profit_or_loss > 0.0 {
            profit_or_loss * self.rate
        } else {
            0.0
        }
    }
}

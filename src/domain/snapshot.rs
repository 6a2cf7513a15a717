//! Daily market snapshot consumed by the decision layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Drawdown below this ratio trips the circuit breaker.
pub const CRASH_DRAWDOWN: f64 = -0.20;

/// Volatility index above this level trips the circuit breaker.
pub const CRASH_RISK_INDEX: f64 = 30.0;

/// Indicator values for the benchmark as of one trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub date: NaiveDate,
    pub price: f64,
    pub ma180: f64,
    pub volatility: f64,
    pub momentum: f64,
    pub drawdown: f64,
    pub risk_index: f64,
}

impl MarketSnapshot {
    /// Both bounds are strict: a drawdown of exactly -20% or an index of exactly 30 is not risk.
    pub fn risk_condition(&self) -> bool {
        self.drawdown < CRASH_DRAWDOWN || self.risk_index > CRASH_RISK_INDEX
    }

    pub fn is_below_trend(&self) -> bool {
        self.price < self.ma180
    }
}

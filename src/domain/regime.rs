//! Market regime classification.
//!
//! Crash is a circuit breaker checked before anything else. Outside of a
//! crash, negative momentum and a price under the 180-day average each count
//! as one bear vote: two votes give [`Regime::BearStrong`], one gives
//! [`Regime::BearWeak`].

use serde::{Deserialize, Serialize};
use std::fmt;

use super::snapshot::MarketSnapshot;

/// Momentum at or above this is a bull market.
pub const BULL_MOMENTUM: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regime {
    #[serde(rename = "Bull")]
    Bull,
    #[serde(rename = "Sideways")]
    Sideways,
    #[serde(rename = "Bear_Weak")]
    BearWeak,
    #[serde(rename = "Bear_Strong")]
    BearStrong,
    #[serde(rename = "Crash")]
    Crash,
}

impl Regime {
    pub fn label(&self) -> &'static str {
        match self {
            Regime::Bull => "Bull",
            Regime::Sideways => "Sideways",
            Regime::BearWeak => "Bear_Weak",
            Regime::BearStrong => "Bear_Strong",
            Regime::Crash => "Crash",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stateless regime classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegimeClassifier;

impl RegimeClassifier {
    pub fn new() -> Self {
        RegimeClassifier
    }

    pub fn classify(&self, snapshot: &MarketSnapshot) -> Regime {
        if snapshot.risk_condition() {
            return Regime::Crash;
        }

        let bear_momentum = snapshot.momentum < 0.0;
        let below_trend = snapshot.is_below_trend();

        match (bear_momentum, below_trend) {
            (true, true) => Regime::BearStrong,
            (true, false) | (false, true) => Regime::BearWeak,
            (false, false) if snapshot.momentum >= BULL_MOMENTUM => Regime::Bull,
            (false, false) if snapshot.momentum > 0.0 => Regime::Sideways,
            // Zero momentum above trend, or a NaN that slipped every comparison.
            _ => Regime::BearWeak,
        }
    }
}

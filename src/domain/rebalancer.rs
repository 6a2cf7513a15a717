//! Threshold-gated rebalancing and order generation.
//!
//! Two risky groups are managed: A (growth) and B (defensive). Whatever the
//! target exposure leaves over stays in cash or the cash-proxy group C, which
//! is never ordered directly.

use std::collections::HashSet;

use super::order::{Order, TradeSignal};
use super::portfolio::Portfolio;
use super::regime::Regime;

/// Ticker lists for each asset group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetGroups {
    pub growth: Vec<String>,
    pub defensive: Vec<String>,
    pub cash_proxy: Vec<String>,
}

impl AssetGroups {
    pub fn new(growth: Vec<String>, defensive: Vec<String>, cash_proxy: Vec<String>) -> Self {
        AssetGroups {
            growth,
            defensive,
            cash_proxy,
        }
    }

    /// Every configured ticker once, in group order.
    pub fn all_tickers(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.growth
            .iter()
            .chain(&self.defensive)
            .chain(&self.cash_proxy)
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect()
    }
}

/// Allowed drift between the growth and defensive ratios before a 50/50 reset.
pub fn drift_threshold(regime: Regime) -> f64 {
    match regime {
        Regime::Bull => 0.15,
        Regime::Sideways => 0.05,
        Regime::BearWeak | Regime::BearStrong => 0.10,
        // Never consulted: crash returns before thresholds are read.
        Regime::Crash => 0.10,
    }
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

#[derive(Debug, Clone)]
pub struct Rebalancer {
    groups: AssetGroups,
}

impl Rebalancer {
    pub fn new(groups: AssetGroups) -> Self {
        Rebalancer { groups }
    }

    pub fn groups(&self) -> &AssetGroups {
        &self.groups
    }

    pub fn generate_signal(
        &self,
        portfolio: &Portfolio,
        target_exposure: f64,
        regime: Regime,
    ) -> TradeSignal {
        if regime == Regime::Crash {
            return TradeSignal::hold(0.0, "Emergency stop: crash regime, no orders");
        }

        let threshold = drift_threshold(regime);
        let value_a = portfolio.group_value(&self.groups.growth);
        let value_b = portfolio.group_value(&self.groups.defensive);
        let risky = value_a + value_b;

        let (ratio_a, ratio_b, rebalance_needed, reason) = if risky == 0.0 {
            (
                0.5,
                0.5,
                true,
                "Initial allocation: no risky holdings, targeting 50/50".to_string(),
            )
        } else {
            let ratio_a = value_a / risky;
            let ratio_b = value_b / risky;
            let diff = round6((ratio_a - ratio_b).abs());
            if diff > threshold {
                (
                    0.5,
                    0.5,
                    true,
                    format!(
                        "Threshold {:.2}% exceeded (diff {:.2}%)",
                        threshold * 100.0,
                        diff * 100.0
                    ),
                )
            } else {
                (
                    ratio_a,
                    ratio_b,
                    false,
                    format!(
                        "Within threshold {:.2}% (diff {:.2}%), keeping current split",
                        threshold * 100.0,
                        diff * 100.0
                    ),
                )
            }
        };

        let total = portfolio.total_value();
        let target_a = total * target_exposure * ratio_a;
        let target_b = total * target_exposure * ratio_b;

        tracing::debug!(
            %regime,
            value_a,
            value_b,
            target_a,
            target_b,
            rebalance_needed,
            "computed group targets"
        );

        let mut orders = group_orders(portfolio, &self.groups.growth, target_a);
        orders.extend(group_orders(portfolio, &self.groups.defensive, target_b));

        TradeSignal {
            target_exposure,
            rebalance_needed,
            needs_execution: !orders.is_empty(),
            orders,
            reason,
        }
    }
}

/// Equal-weight orders moving each ticker toward `target_value / len`.
fn group_orders(portfolio: &Portfolio, tickers: &[String], target_value: f64) -> Vec<Order> {
    if tickers.is_empty() {
        return Vec::new();
    }
    let per_ticker = target_value / tickers.len() as f64;

    tickers
        .iter()
        .filter_map(|ticker| {
            let price = portfolio.price(ticker);
            if !price.is_finite() || price <= 0.0 {
                tracing::warn!(ticker = %ticker, price, "skipping ticker without a usable price");
                return None;
            }
            let diff = per_ticker - portfolio.position_value(ticker);
            let shares = (diff / price).trunc() as i64;
            match shares {
                0 => None,
                n if n > 0 => Some(Order::buy(ticker.as_str(), n as u64, price)),
                n => Some(Order::sell(ticker.as_str(), n.unsigned_abs(), price)),
            }
        })
        .collect()
}

//! Orders, trade signals and execution receipts.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => f.write_str("BUY"),
            Action::Sell => f.write_str("SELL"),
        }
    }
}

/// An instruction to trade whole shares.
///
/// `price` is the reference price the decision layer sized the order with,
/// not necessarily the price it fills at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub ticker: String,
    pub action: Action,
    pub quantity: u64,
    pub price: f64,
}

impl Order {
    pub fn buy(ticker: impl Into<String>, quantity: u64, price: f64) -> Self {
        Order {
            ticker: ticker.into(),
            action: Action::Buy,
            quantity,
            price,
        }
    }

    pub fn sell(ticker: impl Into<String>, quantity: u64, price: f64) -> Self {
        Order {
            ticker: ticker.into(),
            action: Action::Sell,
            quantity,
            price,
        }
    }

    pub fn notional(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}

/// Outcome of one decision cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub target_exposure: f64,
    /// Whether the group ratio drift crossed the regime threshold.
    pub rebalance_needed: bool,
    /// True iff `orders` is non-empty.
    pub needs_execution: bool,
    pub orders: Vec<Order>,
    pub reason: String,
}

impl TradeSignal {
    pub fn hold(target_exposure: f64, reason: impl Into<String>) -> Self {
        TradeSignal {
            target_exposure,
            rebalance_needed: false,
            needs_execution: false,
            orders: Vec::new(),
            reason: reason.into(),
        }
    }

    pub fn total_trade_amount(&self) -> f64 {
        self.orders.iter().map(Order::notional).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionStatus {
    Filled,
    Partial,
    Rejected,
    /// Submitted to a venue that has not confirmed the fill yet.
    Ordered,
}

/// Receipt for an order that was actually sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeExecution {
    pub ticker: String,
    pub action: Action,
    pub quantity: u64,
    pub price: f64,
    pub fee: f64,
    pub timestamp: NaiveDateTime,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TradeExecution {
    pub fn notional(&self) -> f64 {
        self.quantity as f64 * self.price
    }

    pub fn is_fill(&self) -> bool {
        matches!(
            self.status,
            ExecutionStatus::Filled | ExecutionStatus::Partial
        )
    }
}

//! Portfolio state and valuation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cash plus whole-share holdings, valued at externally supplied prices.
///
/// Lookups of unknown tickers read as zero through [`Portfolio::quantity`]
/// and [`Portfolio::price`]; they are never an error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Portfolio {
    pub cash: f64,
    pub holdings: HashMap<String, u64>,
    #[serde(default)]
    pub current_prices: HashMap<String, f64>,
}

impl Portfolio {
    pub fn new(cash: f64) -> Self {
        Portfolio {
            cash,
            holdings: HashMap::new(),
            current_prices: HashMap::new(),
        }
    }

    pub fn with_holding(mut self, ticker: &str, quantity: u64) -> Self {
        self.holdings.insert(ticker.to_string(), quantity);
        self
    }

    pub fn with_price(mut self, ticker: &str, price: f64) -> Self {
        self.current_prices.insert(ticker.to_string(), price);
        self
    }

    pub fn quantity(&self, ticker: &str) -> u64 {
        self.holdings.get(ticker).copied().unwrap_or(0)
    }

    pub fn price(&self, ticker: &str) -> f64 {
        self.current_prices.get(ticker).copied().unwrap_or(0.0)
    }

    pub fn set_prices(&mut self, prices: HashMap<String, f64>) {
        self.current_prices = prices;
    }

    pub fn position_value(&self, ticker: &str) -> f64 {
        self.quantity(ticker) as f64 * self.price(ticker)
    }

    pub fn total_value(&self) -> f64 {
        let stock_value: f64 = self
            .holdings
            .keys()
            .map(|ticker| self.position_value(ticker))
            .sum();
        self.cash + stock_value
    }

    pub fn group_value<S: AsRef<str>>(&self, tickers: &[S]) -> f64 {
        tickers
            .iter()
            .map(|ticker| self.position_value(ticker.as_ref()))
            .sum()
    }

    pub fn add_shares(&mut self, ticker: &str, quantity: u64) {
        *self.holdings.entry(ticker.to_string()).or_insert(0) += quantity;
    }

    /// Removes shares, stopping at zero. Returns the quantity actually removed.
    pub fn remove_shares(&mut self, ticker: &str, quantity: u64) -> u64 {
        let held = self.quantity(ticker);
        let removed = quantity.min(held);
        self.holdings.insert(ticker.to_string(), held - removed);
        removed
    }

    /// Holdings with a non-zero quantity, sorted by ticker.
    pub fn open_positions(&self) -> Vec<(&str, u64)> {
        let mut positions: Vec<(&str, u64)> = self
            .holdings
            .iter()
            .filter(|(_, qty)| **qty > 0)
            .map(|(ticker, qty)| (ticker.as_str(), *qty))
            .collect();
        positions.sort_by(|a, b| a.0.cmp(b.0));
        positions
    }
}

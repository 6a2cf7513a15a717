//! Brokerage port trait.

use std::collections::HashMap;

use crate::domain::error::SolidQuantError;
use crate::domain::order::{Order, TradeExecution};
use crate::domain::portfolio::Portfolio;

pub trait BrokerPort {
    /// Current cash and holdings. Prices may be empty; callers inject them.
    fn get_portfolio(&mut self) -> Result<Portfolio, SolidQuantError>;

    /// Latest price per ticker. Tickers without a quote are omitted.
    fn fetch_current_prices(
        &mut self,
        tickers: &[String],
    ) -> Result<HashMap<String, f64>, SolidQuantError>;

    /// Executes `orders` sells first. One execution per order actually sent.
    fn execute(&mut self, orders: &[Order]) -> Result<Vec<TradeExecution>, SolidQuantError>;
}

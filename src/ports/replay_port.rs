//! Ports for stepping through history one trading day at a time.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::broker_port::BrokerPort;
use super::data_port::MarketDataPort;

/// Market data that can be positioned on a past trading day.
///
/// After [`ReplayPort::set_date`], the [`MarketDataPort`] methods answer as
/// if that day were today.
pub trait ReplayPort: MarketDataPort {
    /// Dates with a bar for `ticker`, ascending.
    fn trading_days(&self, ticker: &str) -> Vec<NaiveDate>;

    fn set_date(&mut self, date: NaiveDate);

    /// Close of every known ticker on `date`. Tickers without a bar that day are omitted.
    fn closes_on(&self, date: NaiveDate) -> HashMap<String, f64>;
}

/// Broker whose quotes are supplied by the caller each simulated day.
pub trait SimulatedBrokerPort: BrokerPort {
    fn begin_day(&mut self, date: NaiveDate, prices: HashMap<String, f64>);
}

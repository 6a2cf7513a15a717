//! Market data port trait.

use crate::domain::error::SolidQuantError;
use crate::domain::ohlcv::OhlcvBar;

pub trait MarketDataPort {
    /// The most recent `lookback` daily bars for `ticker`, oldest first.
    fn fetch_price_history(
        &self,
        ticker: &str,
        lookback: usize,
    ) -> Result<Vec<OhlcvBar>, SolidQuantError>;

    /// Latest value of the volatility index.
    fn fetch_risk_index(&self) -> Result<f64, SolidQuantError>;
}

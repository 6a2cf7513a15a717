//! In-memory market data positioned on a simulated date.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::domain::error::SolidQuantError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::MarketDataPort;
use crate::ports::replay_port::ReplayPort;

/// Used when no index value exists on or before the cursor.
pub const DEFAULT_RISK_INDEX_VALUE: f64 = 20.0;

pub struct ReplayDataPort {
    history: HashMap<String, Vec<OhlcvBar>>,
    risk_index: Vec<OhlcvBar>,
    cursor: Option<NaiveDate>,
}

/// Bars dated on or before `cursor`. No cursor means all bars.
fn visible(bars: &[OhlcvBar], cursor: Option<NaiveDate>) -> &[OhlcvBar] {
    match cursor {
        Some(date) => &bars[..bars.partition_point(|b| b.date <= date)],
        None => bars,
    }
}

impl ReplayDataPort {
    pub fn new(mut history: HashMap<String, Vec<OhlcvBar>>, mut risk_index: Vec<OhlcvBar>) -> Self {
        for bars in history.values_mut() {
            bars.sort_by_key(|b| b.date);
        }
        risk_index.sort_by_key(|b| b.date);
        ReplayDataPort {
            history,
            risk_index,
            cursor: None,
        }
    }

    pub fn cursor(&self) -> Option<NaiveDate> {
        self.cursor
    }
}

impl MarketDataPort for ReplayDataPort {
    fn fetch_price_history(
        &self,
        ticker: &str,
        lookback: usize,
    ) -> Result<Vec<OhlcvBar>, SolidQuantError> {
        let bars = self
            .history
            .get(ticker)
            .ok_or_else(|| SolidQuantError::data(format!("no history loaded for {ticker}")))?;
        let bars = visible(bars, self.cursor);
        let start = bars.len().saturating_sub(lookback);
        Ok(bars[start..].to_vec())
    }

    fn fetch_risk_index(&self) -> Result<f64, SolidQuantError> {
        Ok(visible(&self.risk_index, self.cursor)
            .iter()
            .rev()
            .map(|b| b.close)
            .find(|c| c.is_finite())
            .unwrap_or(DEFAULT_RISK_INDEX_VALUE))
    }
}

impl ReplayPort for ReplayDataPort {
    fn trading_days(&self, ticker: &str) -> Vec<NaiveDate> {
        self.history
            .get(ticker)
            .map(|bars| bars.iter().map(|b| b.date).collect())
            .unwrap_or_default()
    }

    fn set_date(&mut self, date: NaiveDate) {
        self.cursor = Some(date);
    }

    fn closes_on(&self, date: NaiveDate) -> HashMap<String, f64> {
        self.history
            .iter()
            .filter_map(|(ticker, bars)| {
                let i = bars.binary_search_by_key(&date, |b| b.date).ok()?;
                let close = bars[i].close;
                close.is_finite().then(|| (ticker.clone(), close))
            })
            .collect()
    }
}

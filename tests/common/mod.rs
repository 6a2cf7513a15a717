#![allow(dead_code)]

use chrono::NaiveDate;
use solidquant::domain::error::SolidQuantError;
pub use solidquant::domain::ohlcv::OhlcvBar;
use solidquant::domain::order::{Order, TradeExecution, TradeSignal};
use solidquant::domain::portfolio::Portfolio;
use solidquant::domain::rebalancer::AssetGroups;
use solidquant::domain::regime::Regime;
use solidquant::domain::snapshot::MarketSnapshot;
use solidquant::ports::broker_port::BrokerPort;
use solidquant::ports::data_port::MarketDataPort;
use solidquant::ports::journal_port::JournalPort;
use solidquant::ports::notifier_port::NotifierPort;
use std::cell::RefCell;
use std::collections::HashMap;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Daily bars starting at `start`, compounding `daily_growth` per bar.
pub fn growth_bars(
    ticker: &str,
    start: NaiveDate,
    count: usize,
    start_price: f64,
    daily_growth: f64,
) -> Vec<OhlcvBar> {
    (0..count)
        .map(|i| {
            OhlcvBar::from_close(
                ticker,
                start + chrono::Duration::days(i as i64),
                start_price * daily_growth.powi(i as i32),
            )
        })
        .collect()
}

pub fn flat_bars(ticker: &str, start: NaiveDate, count: usize, price: f64) -> Vec<OhlcvBar> {
    growth_bars(ticker, start, count, price, 1.0)
}

/// SSO,QLD / IEF,GLD,PDBC / SHV
pub fn default_groups() -> AssetGroups {
    AssetGroups::new(
        vec!["SSO".into(), "QLD".into()],
        vec!["IEF".into(), "GLD".into(), "PDBC".into()],
        vec!["SHV".into()],
    )
}

pub fn default_prices() -> HashMap<String, f64> {
    [
        ("SSO", 50.0),
        ("QLD", 100.0),
        ("IEF", 100.0),
        ("GLD", 200.0),
        ("PDBC", 20.0),
        ("SHV", 110.0),
    ]
    .into_iter()
    .map(|(t, p)| (t.to_string(), p))
    .collect()
}

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub risk_index: f64,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(risk_index: f64) -> Self {
        Self {
            data: HashMap::new(),
            risk_index,
            error: None,
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl MarketDataPort for MockDataPort {
    fn fetch_price_history(
        &self,
        ticker: &str,
        lookback: usize,
    ) -> Result<Vec<OhlcvBar>, SolidQuantError> {
        if let Some(reason) = &self.error {
            return Err(SolidQuantError::data(reason.clone()));
        }
        let bars = self.data.get(ticker).cloned().unwrap_or_default();
        let start = bars.len().saturating_sub(lookback);
        Ok(bars[start..].to_vec())
    }

    fn fetch_risk_index(&self) -> Result<f64, SolidQuantError> {
        Ok(self.risk_index)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: RefCell<Vec<String>>,
    pub alerts: RefCell<Vec<String>>,
}

impl NotifierPort for RecordingNotifier {
    fn send_message(&self, text: &str) -> Result<(), SolidQuantError> {
        self.messages.borrow_mut().push(text.to_string());
        Ok(())
    }

    fn send_alert(&self, text: &str) -> Result<(), SolidQuantError> {
        self.alerts.borrow_mut().push(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingJournal {
    pub summaries: RefCell<Vec<(Regime, f64)>>,
    pub histories: RefCell<Vec<(usize, usize)>>,
    pub statuses: RefCell<Vec<Regime>>,
    pub fail: bool,
}

impl RecordingJournal {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), SolidQuantError> {
        if self.fail {
            return Err(SolidQuantError::journal("disk full"));
        }
        Ok(())
    }
}

impl JournalPort for RecordingJournal {
    fn save_daily_summary(
        &self,
        _snapshot: &MarketSnapshot,
        regime: Regime,
        signal: &TradeSignal,
        _portfolio: &Portfolio,
    ) -> Result<(), SolidQuantError> {
        self.check()?;
        self.summaries
            .borrow_mut()
            .push((regime, signal.target_exposure));
        Ok(())
    }

    fn save_trade_history(
        &self,
        signal: &TradeSignal,
        executions: &[TradeExecution],
        _portfolio: &Portfolio,
    ) -> Result<(), SolidQuantError> {
        self.check()?;
        self.histories
            .borrow_mut()
            .push((signal.orders.len(), executions.len()));
        Ok(())
    }

    fn update_status(
        &self,
        _snapshot: &MarketSnapshot,
        regime: Regime,
        _signal: &TradeSignal,
        _portfolio: &Portfolio,
    ) -> Result<(), SolidQuantError> {
        self.check()?;
        self.statuses.borrow_mut().push(regime);
        Ok(())
    }
}

/// Broker that quotes and reports normally but rejects every execution.
pub struct FailingBroker {
    pub portfolio: Portfolio,
    pub prices: HashMap<String, f64>,
}

impl BrokerPort for FailingBroker {
    fn get_portfolio(&mut self) -> Result<Portfolio, SolidQuantError> {
        Ok(self.portfolio.clone())
    }

    fn fetch_current_prices(
        &mut self,
        tickers: &[String],
    ) -> Result<HashMap<String, f64>, SolidQuantError> {
        Ok(tickers
            .iter()
            .filter_map(|t| self.prices.get(t).map(|p| (t.clone(), *p)))
            .collect())
    }

    fn execute(&mut self, _orders: &[Order]) -> Result<Vec<TradeExecution>, SolidQuantError> {
        Err(SolidQuantError::broker("order gateway unavailable"))
    }
}

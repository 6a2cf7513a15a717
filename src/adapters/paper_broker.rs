//! Simulated brokers: paper trading and historical replay.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::error::SolidQuantError;
use crate::domain::execution::{ExecutionConfig, ExecutionEngine, SimulatedVenue};
use crate::domain::order::{Order, TradeExecution};
use crate::domain::portfolio::Portfolio;
use crate::ports::broker_port::BrokerPort;
use crate::ports::replay_port::SimulatedBrokerPort;

/// Paper positions as persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PaperState {
    cash: f64,
    holdings: BTreeMap<String, u64>,
}

/// Fills orders in memory at injected prices.
pub struct PaperBroker {
    portfolio: Portfolio,
    engine: ExecutionEngine,
    prices: HashMap<String, f64>,
    state_path: Option<PathBuf>,
}

impl PaperBroker {
    pub fn new(initial_cash: f64, config: ExecutionConfig) -> Self {
        Self::from_portfolio(Portfolio::new(initial_cash), config)
    }

    pub fn from_portfolio(portfolio: Portfolio, config: ExecutionConfig) -> Self {
        PaperBroker {
            portfolio,
            engine: ExecutionEngine::new(config),
            prices: HashMap::new(),
            state_path: None,
        }
    }

    /// Resumes from `state_path` when it exists, else starts with `initial_cash`.
    /// Positions are written back there after every execution.
    pub fn open(
        state_path: &Path,
        initial_cash: f64,
        config: ExecutionConfig,
    ) -> Result<Self, SolidQuantError> {
        let portfolio = if state_path.exists() {
            let content = fs::read_to_string(state_path)?;
            let state: PaperState = serde_json::from_str(&content)?;
            tracing::info!(path = %state_path.display(), cash = state.cash, "paper state loaded");
            Portfolio {
                cash: state.cash,
                holdings: state.holdings.into_iter().collect(),
                current_prices: HashMap::new(),
            }
        } else {
            tracing::info!(path = %state_path.display(), initial_cash, "starting new paper account");
            Portfolio::new(initial_cash)
        };

        let mut broker = Self::from_portfolio(portfolio, config);
        broker.state_path = Some(state_path.to_path_buf());
        Ok(broker)
    }

    pub fn set_prices(&mut self, prices: HashMap<String, f64>) {
        self.prices = prices;
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn execute_at(
        &mut self,
        orders: &[Order],
        timestamp: NaiveDateTime,
    ) -> Result<Vec<TradeExecution>, SolidQuantError> {
        let config = self.engine.config().clone();
        let mut venue = SimulatedVenue::new(&mut self.portfolio, &config);
        let executions = self.engine.execute(&mut venue, orders, timestamp)?;
        self.save_state()?;
        Ok(executions)
    }

    fn save_state(&self) -> Result<(), SolidQuantError> {
        let Some(path) = &self.state_path else {
            return Ok(());
        };
        let state = PaperState {
            cash: self.portfolio.cash,
            holdings: self
                .portfolio
                .holdings
                .iter()
                .filter(|(_, qty)| **qty > 0)
                .map(|(t, q)| (t.clone(), *q))
                .collect(),
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&state)?)?;
        Ok(())
    }
}

impl BrokerPort for PaperBroker {
    fn get_portfolio(&mut self) -> Result<Portfolio, SolidQuantError> {
        let mut portfolio = self.portfolio.clone();
        portfolio.set_prices(self.prices.clone());
        Ok(portfolio)
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

    fn execute(&mut self, orders: &[Order]) -> Result<Vec<TradeExecution>, SolidQuantError> {
        self.execute_at(orders, Local::now().naive_local())
    }
}

/// Replayed fills are stamped at the market close.
fn replay_fill_time(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default())
}

/// Paper broker driven by a backtest clock. Fills happen at the simulated
/// day's close whatever price the order was sized with.
pub struct ReplayBroker {
    inner: PaperBroker,
    date: Option<NaiveDate>,
}

impl ReplayBroker {
    pub fn new(initial_cash: f64, config: ExecutionConfig) -> Self {
        ReplayBroker {
            inner: PaperBroker::new(initial_cash, config),
            date: None,
        }
    }

    pub fn portfolio(&self) -> &Portfolio {
        self.inner.portfolio()
    }
}

impl BrokerPort for ReplayBroker {
    fn get_portfolio(&mut self) -> Result<Portfolio, SolidQuantError> {
        self.inner.get_portfolio()
    }

    fn fetch_current_prices(
        &mut self,
        tickers: &[String],
    ) -> Result<HashMap<String, f64>, SolidQuantError> {
        self.inner.fetch_current_prices(tickers)
    }

    fn execute(&mut self, orders: &[Order]) -> Result<Vec<TradeExecution>, SolidQuantError> {
        let date = self
            .date
            .ok_or_else(|| SolidQuantError::broker("replay broker has no simulated date"))?;
        let repriced: Vec<Order> = orders
            .iter()
            .map(|o| Order {
                price: self.inner.prices.get(&o.ticker).copied().unwrap_or(o.price),
                ..o.clone()
            })
            .collect();
        self.inner.execute_at(&repriced, replay_fill_time(date))
    }
}

impl SimulatedBrokerPort for ReplayBroker {
    fn begin_day(&mut self, date: NaiveDate, prices: HashMap<String, f64>) {
        self.date = Some(date);
        self.inner.set_prices(prices);
    }
}

//! JSON file journal for the dashboard.
//!
//! Three documents live under the root directory:
//! - `summary.json`: array, one record appended per cycle
//! - `history.json`: array, one record appended per cycle with orders
//! - `status.json`: object, overwritten every cycle
//!
//! A missing or unreadable array file starts a fresh array.

use chrono::Local;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::error::SolidQuantError;
use crate::domain::order::{Order, TradeExecution, TradeSignal};
use crate::domain::portfolio::Portfolio;
use crate::domain::regime::Regime;
use crate::domain::snapshot::MarketSnapshot;
use crate::ports::journal_port::JournalPort;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
struct DailySummaryRecord<'a> {
    date: String,
    total_value: f64,
    cash_balance: f64,
    price: f64,
    ma180: f64,
    volatility: f64,
    momentum: f64,
    mdd: f64,
    vix: f64,
    regime: Regime,
    target_exposure: f64,
    reason: &'a str,
}

#[derive(Debug, Serialize)]
struct TradeRecord<'a> {
    id: String,
    date: String,
    portfolio_value: f64,
    total_trade_amount: f64,
    reason: &'a str,
    orders: &'a [Order],
    executions: &'a [TradeExecution],
}

#[derive(Debug, Serialize)]
struct MarketScore {
    vix: f64,
    mdd: f64,
    momentum: f64,
    price: f64,
    ma180: f64,
    volatility: f64,
}

#[derive(Debug, Serialize)]
struct StrategyStatus<'a> {
    regime: Regime,
    target_exposure: f64,
    trigger_reason: &'a str,
    market_score: MarketScore,
}

#[derive(Debug, Serialize)]
struct HoldingStatus<'a> {
    ticker: &'a str,
    qty: u64,
    price: f64,
    value: f64,
}

#[derive(Debug, Serialize)]
struct PortfolioStatus<'a> {
    total_value: f64,
    cash_balance: f64,
    holdings: Vec<HoldingStatus<'a>>,
}

#[derive(Debug, Serialize)]
struct StatusDocument<'a> {
    last_updated: String,
    as_of: String,
    strategy: StrategyStatus<'a>,
    portfolio: PortfolioStatus<'a>,
}

pub struct JsonJournal {
    summary_file: PathBuf,
    history_file: PathBuf,
    status_file: PathBuf,
}

impl JsonJournal {
    /// Creates `root` if needed.
    pub fn new(root: &Path) -> Result<Self, SolidQuantError> {
        fs::create_dir_all(root).map_err(|e| {
            SolidQuantError::journal(format!("failed to create {}: {}", root.display(), e))
        })?;
        Ok(JsonJournal {
            summary_file: root.join("summary.json"),
            history_file: root.join("history.json"),
            status_file: root.join("status.json"),
        })
    }

    fn load_array(path: &Path) -> Vec<serde_json::Value> {
        let Ok(content) = fs::read_to_string(path) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<serde_json::Value>>(&content) {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "unreadable journal, starting fresh");
                Vec::new()
            }
        }
    }

    fn append<T: Serialize>(path: &Path, record: &T) -> Result<(), SolidQuantError> {
        let mut records = Self::load_array(path);
        records.push(serde_json::to_value(record)?);
        Self::write(path, &records)
    }

    fn write<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), SolidQuantError> {
        let content = serde_json::to_string_pretty(value)?;
        fs::write(path, content).map_err(|e| {
            SolidQuantError::journal(format!("failed to write {}: {}", path.display(), e))
        })
    }
}

impl JournalPort for JsonJournal {
    fn save_daily_summary(
        &self,
        snapshot: &MarketSnapshot,
        regime: Regime,
        signal: &TradeSignal,
        portfolio: &Portfolio,
    ) -> Result<(), SolidQuantError> {
        let record = DailySummaryRecord {
            date: snapshot.date.to_string(),
            total_value: portfolio.total_value(),
            cash_balance: portfolio.cash,
            price: snapshot.price,
            ma180: snapshot.ma180,
            volatility: snapshot.volatility,
            momentum: snapshot.momentum,
            mdd: snapshot.drawdown,
            vix: snapshot.risk_index,
            regime,
            target_exposure: signal.target_exposure,
            reason: &signal.reason,
        };
        Self::append(&self.summary_file, &record)
    }

    fn save_trade_history(
        &self,
        signal: &TradeSignal,
        executions: &[TradeExecution],
        portfolio: &Portfolio,
    ) -> Result<(), SolidQuantError> {
        if signal.orders.is_empty() {
            return Ok(());
        }
        let now = Local::now();
        let record = TradeRecord {
            id: format!("tx_{}", now.format("%Y%m%d_%H%M%S")),
            date: now.format(TIMESTAMP_FORMAT).to_string(),
            portfolio_value: portfolio.total_value(),
            total_trade_amount: signal.total_trade_amount(),
            reason: &signal.reason,
            orders: &signal.orders,
            executions,
        };
        Self::append(&self.history_file, &record)
    }

    fn update_status(
        &self,
        snapshot: &MarketSnapshot,
        regime: Regime,
        signal: &TradeSignal,
        portfolio: &Portfolio,
    ) -> Result<(), SolidQuantError> {
        let holdings = portfolio
            .open_positions()
            .into_iter()
            .map(|(ticker, qty)| HoldingStatus {
                ticker,
                qty,
                price: portfolio.price(ticker),
                value: portfolio.position_value(ticker),
            })
            .collect();

        let status = StatusDocument {
            last_updated: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            as_of: snapshot.date.to_string(),
            strategy: StrategyStatus {
                regime,
                target_exposure: signal.target_exposure,
                trigger_reason: &signal.reason,
                market_score: MarketScore {
                    vix: snapshot.risk_index,
                    mdd: snapshot.drawdown,
                    momentum: snapshot.momentum,
                    price: snapshot.price,
                    ma180: snapshot.ma180,
                    volatility: snapshot.volatility,
                },
            },
            portfolio: PortfolioStatus {
                total_value: portfolio.total_value(),
                cash_balance: portfolio.cash,
                holdings,
            },
        };
        Self::write(&self.status_file, &status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::Value;
    use tempfile::TempDir;

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
            price: 510.0,
            ma180: 480.0,
            volatility: 0.12,
            momentum: 0.07,
            drawdown: -0.03,
            risk_index: 13.2,
        }
    }

    fn signal_with_orders() -> TradeSignal {
        TradeSignal {
            target_exposure: 1.0,
            rebalance_needed: true,
            needs_execution: true,
            orders: vec![Order::buy("SSO", 10, 80.0)],
            reason: "Initial allocation".into(),
        }
    }

    fn portfolio() -> Portfolio {
        Portfolio::new(200.0)
            .with_holding("SSO", 10)
            .with_price("SSO", 80.0)
            .with_holding("IEF", 0)
    }

    fn read(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn new_creates_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("docs").join("data");
        JsonJournal::new(&root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn daily_summary_appends() {
        let dir = TempDir::new().unwrap();
        let journal = JsonJournal::new(dir.path()).unwrap();
        let signal = TradeSignal::hold(0.6, "Within threshold");

        journal
            .save_daily_summary(&snapshot(), Regime::Bull, &signal, &portfolio())
            .unwrap();
        journal
            .save_daily_summary(&snapshot(), Regime::BearWeak, &signal, &portfolio())
            .unwrap();

        let summary = read(&dir.path().join("summary.json"));
        let records = summary.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["date"], "2024-05-06");
        assert_eq!(records[0]["total_value"], 1000.0);
        assert_eq!(records[0]["regime"], "Bull");
        assert_eq!(records[1]["regime"], "Bear_Weak");
        assert_eq!(records[1]["target_exposure"], 0.6);
    }

    #[test]
    fn corrupt_summary_starts_fresh() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("summary.json"), "[{broken").unwrap();
        let journal = JsonJournal::new(dir.path()).unwrap();
        journal
            .save_daily_summary(&snapshot(), Regime::Bull, &TradeSignal::hold(1.0, "x"), &portfolio())
            .unwrap();
        let summary = read(&dir.path().join("summary.json"));
        assert_eq!(summary.as_array().unwrap().len(), 1);
    }

    #[test]
    fn trade_history_records_orders_and_fills() {
        let dir = TempDir::new().unwrap();
        let journal = JsonJournal::new(dir.path()).unwrap();

        journal
            .save_trade_history(&signal_with_orders(), &[], &portfolio())
            .unwrap();

        let history = read(&dir.path().join("history.json"));
        let record = &history.as_array().unwrap()[0];
        assert!(record["id"].as_str().unwrap().starts_with("tx_"));
        assert_eq!(record["total_trade_amount"], 800.0);
        assert_eq!(record["orders"][0]["ticker"], "SSO");
        assert_eq!(record["orders"][0]["action"], "BUY");
        assert!(record["executions"].as_array().unwrap().is_empty());
    }

    #[test]
    fn trade_history_skips_empty_signal() {
        let dir = TempDir::new().unwrap();
        let journal = JsonJournal::new(dir.path()).unwrap();
        journal
            .save_trade_history(&TradeSignal::hold(0.0, "crash"), &[], &portfolio())
            .unwrap();
        assert!(!dir.path().join("history.json").exists());
    }

    #[test]
    fn status_is_overwritten() {
        let dir = TempDir::new().unwrap();
        let journal = JsonJournal::new(dir.path()).unwrap();
        let signal = signal_with_orders();

        journal
            .update_status(&snapshot(), Regime::Sideways, &signal, &portfolio())
            .unwrap();
        journal
            .update_status(&snapshot(), Regime::Crash, &signal, &portfolio())
            .unwrap();

        let status = read(&dir.path().join("status.json"));
        assert_eq!(status["strategy"]["regime"], "Crash");
        assert_eq!(status["strategy"]["market_score"]["vix"], 13.2);
        assert_eq!(status["portfolio"]["cash_balance"], 200.0);
        let holdings = status["portfolio"]["holdings"].as_array().unwrap();
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0]["ticker"], "SSO");
        assert_eq!(holdings[0]["value"], 800.0);
    }
}

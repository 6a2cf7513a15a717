//! One daily trading cycle from market data to journal.
//!
//! The cycle owns no state between runs. Every collaborator is a port, so
//! the same flow drives paper trading and tests.

use crate::domain::error::SolidQuantError;
use crate::domain::exposure::ExposureSizer;
use crate::domain::indicators::IndicatorCalculator;
use crate::domain::order::{TradeExecution, TradeSignal};
use crate::domain::portfolio::Portfolio;
use crate::domain::rebalancer::Rebalancer;
use crate::domain::regime::{Regime, RegimeClassifier};
use crate::domain::snapshot::MarketSnapshot;
use crate::ports::broker_port::BrokerPort;
use crate::ports::data_port::MarketDataPort;
use crate::ports::journal_port::JournalPort;
use crate::ports::notifier_port::NotifierPort;

/// What a completed cycle decided and did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub snapshot: MarketSnapshot,
    pub regime: Regime,
    pub exposure: f64,
    pub signal: TradeSignal,
    pub executions: Vec<TradeExecution>,
    /// Portfolio after execution, priced at the cycle's quotes.
    pub portfolio: Portfolio,
}

impl CycleReport {
    pub fn executed(&self) -> bool {
        !self.executions.is_empty()
    }
}

/// Benchmark and lookback used to build the daily snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSettings {
    pub benchmark: String,
    pub lookback_days: usize,
}

pub struct TradingCycle<'a> {
    settings: CycleSettings,
    calculator: IndicatorCalculator,
    classifier: RegimeClassifier,
    sizer: ExposureSizer,
    rebalancer: Rebalancer,
    data: &'a dyn MarketDataPort,
    broker: &'a mut dyn BrokerPort,
    notifier: &'a dyn NotifierPort,
    journal: &'a dyn JournalPort,
}

impl<'a> TradingCycle<'a> {
    pub fn new(
        settings: CycleSettings,
        sizer: ExposureSizer,
        rebalancer: Rebalancer,
        data: &'a dyn MarketDataPort,
        broker: &'a mut dyn BrokerPort,
        notifier: &'a dyn NotifierPort,
        journal: &'a dyn JournalPort,
    ) -> Self {
        TradingCycle {
            settings,
            calculator: IndicatorCalculator::new(),
            classifier: RegimeClassifier::new(),
            sizer,
            rebalancer,
            data,
            broker,
            notifier,
            journal,
        }
    }

    /// Runs the cycle. Any failure is reported through the notifier's alert
    /// channel before it is returned.
    pub fn run(&mut self) -> Result<CycleReport, SolidQuantError> {
        match self.run_steps() {
            Ok(report) => Ok(report),
            Err(err) => {
                alert_failure(self.notifier, &err);
                Err(err)
            }
        }
    }

    fn run_steps(&mut self) -> Result<CycleReport, SolidQuantError> {
        tracing::info!(benchmark = %self.settings.benchmark, "collecting market data");
        let snapshot = self.market_snapshot()?;
        tracing::info!(
            date = %snapshot.date,
            price = snapshot.price,
            risk_index = snapshot.risk_index,
            drawdown = snapshot.drawdown,
            "market snapshot"
        );

        if snapshot.risk_condition() {
            let msg = format!(
                "Circuit breaker tripped: drawdown {:.1}%, VIX {:.2}. Switching to crash mode.",
                snapshot.drawdown * 100.0,
                snapshot.risk_index
            );
            tracing::warn!(
                drawdown = snapshot.drawdown,
                risk_index = snapshot.risk_index,
                "circuit breaker tripped"
            );
            self.notifier.send_alert(&msg)?;
        }

        let regime = self.classifier.classify(&snapshot);
        let exposure = self.sizer.size(regime, snapshot.volatility);
        tracing::info!(%regime, exposure, "strategy decided");

        let portfolio = self.priced_portfolio()?;
        tracing::info!(
            cash = portfolio.cash,
            total_value = portfolio.total_value(),
            "current portfolio"
        );

        let signal = self.rebalancer.generate_signal(&portfolio, exposure, regime);
        let mut executions = Vec::new();
        let portfolio = if signal.needs_execution && regime != Regime::Crash {
            tracing::info!(orders = signal.orders.len(), reason = %signal.reason, "executing orders");
            executions = self.broker.execute(&signal.orders)?;
            let after = self.priced_portfolio()?;
            self.notifier
                .send_message(&execution_message(regime, &signal, &executions, &after))?;
            after
        } else {
            tracing::info!(reason = %signal.reason, "no execution needed");
            self.notifier
                .send_message(&hold_message(regime, &signal, &portfolio))?;
            portfolio
        };

        tracing::info!("archiving cycle");
        self.journal
            .save_daily_summary(&snapshot, regime, &signal, &portfolio)?;
        if !signal.orders.is_empty() {
            self.journal
                .save_trade_history(&signal, &executions, &portfolio)?;
        }
        self.journal
            .update_status(&snapshot, regime, &signal, &portfolio)?;

        Ok(CycleReport {
            snapshot,
            regime,
            exposure,
            signal,
            executions,
            portfolio,
        })
    }

    fn market_snapshot(&self) -> Result<MarketSnapshot, SolidQuantError> {
        let benchmark = &self.settings.benchmark;
        let bars = self
            .data
            .fetch_price_history(benchmark, self.settings.lookback_days)?;
        let risk_index = self.data.fetch_risk_index()?;
        self.calculator
            .calculate(&bars, risk_index)
            .map_err(|err| match err {
                SolidQuantError::InsufficientData { bars, minimum, .. } => {
                    SolidQuantError::InsufficientData {
                        ticker: benchmark.clone(),
                        bars,
                        minimum,
                    }
                }
                other => other,
            })
    }

    /// Broker portfolio with quotes for every configured ticker merged in.
    fn priced_portfolio(&mut self) -> Result<Portfolio, SolidQuantError> {
        let mut portfolio = self.broker.get_portfolio()?;
        let tickers = self.rebalancer.groups().all_tickers();
        let prices = self.broker.fetch_current_prices(&tickers)?;
        portfolio.current_prices.extend(prices);
        Ok(portfolio)
    }
}

/// Logs `err` and sends it on the alert channel. A failing alert is only logged.
pub fn alert_failure(notifier: &dyn NotifierPort, err: &SolidQuantError) {
    tracing::error!(error = %err, "trading cycle failed");
    if let Err(alert_err) = notifier.send_alert(&format!("Trading cycle failed\n{err}")) {
        tracing::error!(error = %alert_err, "failed to send failure alert");
    }
}

pub fn execution_message(
    regime: Regime,
    signal: &TradeSignal,
    executions: &[TradeExecution],
    portfolio: &Portfolio,
) -> String {
    let filled = executions.iter().filter(|e| e.is_fill()).count();
    format!(
        "Rebalance completed ({regime})\nReason: {}\nOrders: {}, filled: {}\nTarget exposure: {:.0}%\nTotal value: ${:.2}",
        signal.reason,
        signal.orders.len(),
        filled,
        signal.target_exposure * 100.0,
        portfolio.total_value()
    )
}

pub fn hold_message(regime: Regime, signal: &TradeSignal, portfolio: &Portfolio) -> String {
    format!(
        "Hold ({regime})\nReason: {}\nTotal value: ${:.2}",
        signal.reason,
        portfolio.total_value()
    )
}

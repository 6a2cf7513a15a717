//! Historical replay of the daily decision loop.
//!
//! Each benchmark trading day inside the window runs the same
//! classify, size, rebalance and execute steps as a live cycle, trading at
//! that day's close. Days without enough history for the indicators, or
//! whose indicators come out non-finite, are skipped.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::error::SolidQuantError;
use crate::domain::exposure::ExposureSizer;
use crate::domain::indicators::IndicatorCalculator;
use crate::domain::rebalancer::{AssetGroups, Rebalancer};
use crate::domain::regime::{Regime, RegimeClassifier};
use crate::ports::replay_port::{ReplayPort, SimulatedBrokerPort};

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub initial_cash: f64,
    pub benchmark: String,
    pub lookback_days: usize,
    pub target_volatility: f64,
    pub groups: AssetGroups,
}

/// End-of-day account state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub total_value: f64,
    pub cash: f64,
    pub exposure: f64,
    pub regime: Regime,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub initial_value: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub skipped_days: usize,
    pub trade_count: usize,
}

impl BacktestResult {
    pub fn final_value(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.total_value)
            .unwrap_or(self.initial_value)
    }

    pub fn total_return(&self) -> f64 {
        if self.initial_value <= 0.0 {
            return 0.0;
        }
        self.final_value() / self.initial_value - 1.0
    }

    pub fn cagr(&self) -> f64 {
        cagr(
            self.initial_value,
            self.final_value(),
            self.equity_curve.len(),
        )
    }
}

/// (final / initial)^(252 / days) - 1, or 0 when undefined.
pub fn cagr(initial_value: f64, final_value: f64, trading_days: usize) -> f64 {
    if initial_value <= 0.0 || final_value < 0.0 || trading_days == 0 {
        return 0.0;
    }
    (final_value / initial_value).powf(252.0 / trading_days as f64) - 1.0
}

pub fn run_backtest<D, B>(
    data: &mut D,
    broker: &mut B,
    config: &BacktestConfig,
) -> Result<BacktestResult, SolidQuantError>
where
    D: ReplayPort + ?Sized,
    B: SimulatedBrokerPort + ?Sized,
{
    let calculator = IndicatorCalculator::new();
    let classifier = RegimeClassifier::new();
    let sizer = ExposureSizer::new(config.target_volatility);
    let rebalancer = Rebalancer::new(config.groups.clone());
    let tickers = config.groups.all_tickers();

    let days: Vec<NaiveDate> = data
        .trading_days(&config.benchmark)
        .into_iter()
        .filter(|d| config.start_date.is_none_or(|s| *d >= s))
        .filter(|d| config.end_date.is_none_or(|e| *d <= e))
        .collect();

    tracing::info!(days = days.len(), benchmark = %config.benchmark, "starting backtest");

    let mut equity_curve = Vec::with_capacity(days.len());
    let mut skipped_days = 0;
    let mut trade_count = 0;

    for day in days {
        data.set_date(day);
        broker.begin_day(day, data.closes_on(day));

        let bars = data.fetch_price_history(&config.benchmark, config.lookback_days)?;
        let risk_index = data.fetch_risk_index()?;
        let snapshot = match calculator.calculate(&bars, risk_index) {
            Ok(snapshot) => snapshot,
            Err(SolidQuantError::InsufficientData { bars, .. }) => {
                tracing::debug!(date = %day, bars, "skipping day with insufficient history");
                skipped_days += 1;
                continue;
            }
            Err(SolidQuantError::DataSource { reason }) => {
                tracing::warn!(date = %day, %reason, "skipping day with unusable indicators");
                skipped_days += 1;
                continue;
            }
            Err(err) => return Err(err),
        };

        let regime = classifier.classify(&snapshot);
        let exposure = sizer.size(regime, snapshot.volatility);

        let mut portfolio = broker.get_portfolio()?;
        portfolio
            .current_prices
            .extend(broker.fetch_current_prices(&tickers)?);

        let signal = rebalancer.generate_signal(&portfolio, exposure, regime);
        if signal.needs_execution {
            let executions = broker.execute(&signal.orders)?;
            trade_count += executions.len();
        }

        let mut after = broker.get_portfolio()?;
        after
            .current_prices
            .extend(broker.fetch_current_prices(&tickers)?);

        equity_curve.push(EquityPoint {
            date: day,
            total_value: after.total_value(),
            cash: after.cash,
            exposure,
            regime,
        });
    }

    if equity_curve.is_empty() {
        return Err(SolidQuantError::data(format!(
            "no trading days with enough {} history in the requested range",
            config.benchmark
        )));
    }

    let result = BacktestResult {
        initial_value: config.initial_cash,
        equity_curve,
        skipped_days,
        trade_count,
    };

    tracing::info!(
        initial = result.initial_value,
        final_value = result.final_value(),
        cagr = result.cagr(),
        trades = result.trade_count,
        skipped = result.skipped_days,
        "backtest finished"
    );

    Ok(result)
}

//! Order execution and fill simulation.
//!
//! Orders run in two phases. Every sell goes first so its proceeds are
//! available to fund buys in the same cycle:
//!
//! 1. Partition orders into sells and buys
//! 2. Fill sells (negative slippage, proportional fee)
//! 3. Wait for the venue to report no pending orders, bounded by a timeout
//! 4. Refresh the cash balance if anything was sold
//! 5. Fill buys, each shrunk to what a safety-margined budget can afford
//!
//! The protocol lives in [`ExecutionEngine`]; how an individual order is
//! filled is up to the [`OrderVenue`]. [`SimulatedVenue`] fills instantly
//! against an in-memory [`Portfolio`].

use chrono::NaiveDateTime;
use std::thread;
use std::time::{Duration, Instant};

use super::error::SolidQuantError;
use super::order::{Action, ExecutionStatus, Order, TradeExecution};
use super::portfolio::Portfolio;

/// Cost and safety parameters for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub slippage_pct: f64,
    pub fee_pct: f64,
    /// Fraction of available cash that may be committed to buys.
    pub safety_margin: f64,
    pub poll_interval: Duration,
    pub fill_timeout: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            slippage_pct: 1.0,
            fee_pct: 0.1,
            safety_margin: 0.98,
            poll_interval: Duration::from_secs(1),
            fill_timeout: Duration::from_secs(30),
        }
    }
}

/// fee = notional * fee_pct / 100
pub fn calculate_fee(notional: f64, config: &ExecutionConfig) -> f64 {
    notional * config.fee_pct / 100.0
}

/// Buy fill: reference_price * (1 + slippage_pct / 100)
pub fn apply_slippage_buy(reference_price: f64, slippage_pct: f64) -> f64 {
    reference_price * (1.0 + slippage_pct / 100.0)
}

/// Sell fill: reference_price * (1 - slippage_pct / 100)
pub fn apply_slippage_sell(reference_price: f64, slippage_pct: f64) -> f64 {
    reference_price * (1.0 - slippage_pct / 100.0)
}

/// Largest whole quantity whose estimated cost fits in the margined budget.
pub fn max_affordable_quantity(cash: f64, reference_price: f64, config: &ExecutionConfig) -> u64 {
    let budget = cash * config.safety_margin;
    let estimated_price = apply_slippage_buy(reference_price, config.slippage_pct);
    if budget <= 0.0 || estimated_price <= 0.0 {
        return 0;
    }
    (budget / estimated_price).floor() as u64
}

/// Where orders get filled: a brokerage or the in-memory simulator.
pub trait OrderVenue {
    /// Authoritative spendable cash.
    fn cash_balance(&mut self) -> Result<f64, SolidQuantError>;

    /// Orders submitted but not yet confirmed as filled.
    fn pending_orders(&mut self) -> Result<usize, SolidQuantError>;

    fn submit_sell(
        &mut self,
        order: &Order,
        timestamp: NaiveDateTime,
    ) -> Result<TradeExecution, SolidQuantError>;

    fn submit_buy(
        &mut self,
        order: &Order,
        timestamp: NaiveDateTime,
    ) -> Result<TradeExecution, SolidQuantError>;
}

/// Polls `pending` until it reports zero or `timeout` elapses.
///
/// Returns `Ok(false)` on timeout; only a failing poll is an error.
pub fn wait_for_fills<F>(
    mut pending: F,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<bool, SolidQuantError>
where
    F: FnMut() -> Result<usize, SolidQuantError>,
{
    let started = Instant::now();
    loop {
        let count = pending()?;
        if count == 0 {
            return Ok(true);
        }
        if started.elapsed() >= timeout {
            tracing::warn!(pending = count, "fill confirmation timed out");
            return Ok(false);
        }
        tracing::debug!(pending = count, "waiting for fills");
        thread::sleep(poll_interval);
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionEngine {
    config: ExecutionConfig,
}

impl ExecutionEngine {
    pub fn new(config: ExecutionConfig) -> Self {
        ExecutionEngine { config }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Runs `orders` against `venue`, sells first.
    ///
    /// Insufficient funds, over-sells and unusable prices are resolved by
    /// shrinking or skipping orders. Venue failures propagate unchanged and
    /// nothing is retried.
    pub fn execute<V: OrderVenue + ?Sized>(
        &self,
        venue: &mut V,
        orders: &[Order],
        timestamp: NaiveDateTime,
    ) -> Result<Vec<TradeExecution>, SolidQuantError> {
        let (sells, buys): (Vec<&Order>, Vec<&Order>) = orders
            .iter()
            .filter(|o| o.quantity > 0)
            .partition(|o| o.action == Action::Sell);

        let mut executions = Vec::with_capacity(sells.len() + buys.len());
        let mut cash = venue.cash_balance()?;

        for order in &sells {
            let execution = venue.submit_sell(order, timestamp)?;
            tracing::info!(
                ticker = %execution.ticker,
                quantity = execution.quantity,
                price = execution.price,
                fee = execution.fee,
                "sell filled"
            );
            executions.push(execution);
        }

        if !sells.is_empty() {
            let confirmed = wait_for_fills(
                || venue.pending_orders(),
                self.config.poll_interval,
                self.config.fill_timeout,
            )?;
            if !confirmed {
                tracing::warn!("continuing to buy phase with unconfirmed sells");
            }
            cash = venue.cash_balance()?;
            tracing::debug!(cash, "cash refreshed after sells");
        }

        for order in &buys {
            if !order.price.is_finite() || order.price <= 0.0 {
                tracing::warn!(ticker = %order.ticker, price = order.price, "skipping buy without a usable price");
                continue;
            }

            let max_qty = max_affordable_quantity(cash, order.price, &self.config);
            let quantity = order.quantity.min(max_qty);
            if quantity == 0 {
                tracing::warn!(
                    ticker = %order.ticker,
                    requested = order.quantity,
                    cash,
                    "insufficient funds, skipping buy"
                );
                continue;
            }

            let sized = Order {
                quantity,
                ..(*order).clone()
            };
            let mut execution = venue.submit_buy(&sized, timestamp)?;
            if quantity < order.quantity {
                tracing::info!(
                    ticker = %order.ticker,
                    requested = order.quantity,
                    adjusted = quantity,
                    "buy quantity reduced to fit budget"
                );
                if execution.status == ExecutionStatus::Filled {
                    execution.status = ExecutionStatus::Partial;
                }
                execution.reason = Some(format!(
                    "reduced from {} to {}: insufficient funds",
                    order.quantity, quantity
                ));
            }
            cash -= execution.notional() + execution.fee;
            tracing::info!(
                ticker = %execution.ticker,
                quantity = execution.quantity,
                price = execution.price,
                fee = execution.fee,
                "buy filled"
            );
            executions.push(execution);
        }

        Ok(executions)
    }
}

/// Fills orders instantly against an in-memory portfolio.
pub struct SimulatedVenue<'a> {
    portfolio: &'a mut Portfolio,
    config: &'a ExecutionConfig,
}

impl<'a> SimulatedVenue<'a> {
    pub fn new(portfolio: &'a mut Portfolio, config: &'a ExecutionConfig) -> Self {
        SimulatedVenue { portfolio, config }
    }
}

impl OrderVenue for SimulatedVenue<'_> {
    fn cash_balance(&mut self) -> Result<f64, SolidQuantError> {
        Ok(self.portfolio.cash)
    }

    fn pending_orders(&mut self) -> Result<usize, SolidQuantError> {
        Ok(0)
    }

    /// Credits the full requested notional; holdings stop at zero.
    fn submit_sell(
        &mut self,
        order: &Order,
        timestamp: NaiveDateTime,
    ) -> Result<TradeExecution, SolidQuantError> {
        let price = apply_slippage_sell(order.price, self.config.slippage_pct);
        let notional = order.quantity as f64 * price;
        let fee = calculate_fee(notional, self.config);

        self.portfolio.cash += notional - fee;
        let removed = self.portfolio.remove_shares(&order.ticker, order.quantity);
        if removed < order.quantity {
            tracing::warn!(
                ticker = %order.ticker,
                requested = order.quantity,
                held = removed,
                "sell exceeds holdings, position clamped at zero"
            );
        }

        Ok(TradeExecution {
            ticker: order.ticker.clone(),
            action: Action::Sell,
            quantity: order.quantity,
            price,
            fee,
            timestamp,
            status: ExecutionStatus::Filled,
            reason: None,
        })
    }

    fn submit_buy(
        &mut self,
        order: &Order,
        timestamp: NaiveDateTime,
    ) -> Result<TradeExecution, SolidQuantError> {
        let price = apply_slippage_buy(order.price, self.config.slippage_pct);
        let notional = order.quantity as f64 * price;
        let fee = calculate_fee(notional, self.config);

        self.portfolio.cash -= notional + fee;
        self.portfolio.add_shares(&order.ticker, order.quantity);

        Ok(TradeExecution {
            ticker: order.ticker.clone(),
            action: Action::Buy,
            quantity: order.quantity,
            price,
            fee,
            timestamp,
            status: ExecutionStatus::Filled,
            reason: None,
        })
    }
}

/// Runs the engine against the simulator on `portfolio`.
pub fn simulate(
    portfolio: &mut Portfolio,
    orders: &[Order],
    config: &ExecutionConfig,
    timestamp: NaiveDateTime,
) -> Result<Vec<TradeExecution>, SolidQuantError> {
    let engine = ExecutionEngine::new(config.clone());
    let mut venue = SimulatedVenue::new(portfolio, config);
    engine.execute(&mut venue, orders, timestamp)
}

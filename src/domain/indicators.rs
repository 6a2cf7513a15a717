//! Benchmark indicators: trend, realized volatility, momentum and drawdown.
//!
//! All windows count trading days:
//! - MA180: mean of the last 180 closes
//! - Volatility: sample standard deviation of the last 21 daily returns, times sqrt(252)
//! - Momentum: mean of the 21, 63, 126 and 252 day returns
//! - Drawdown: last close against the highest of the last 252 closes

use super::error::SolidQuantError;
use super::ohlcv::{closes, fill_gaps, OhlcvBar};
use super::snapshot::MarketSnapshot;

/// The 252-day momentum leg needs one extra close as its base.
pub const MIN_BARS: usize = 253;

pub const MA_WINDOW: usize = 180;
pub const VOLATILITY_WINDOW: usize = 21;
pub const DRAWDOWN_WINDOW: usize = 252;
pub const MOMENTUM_PERIODS: [usize; 4] = [21, 63, 126, 252];
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Mean of the last `window` values.
fn trailing_mean(values: &[f64], window: usize) -> f64 {
    let tail = &values[values.len() - window..];
    tail.iter().sum::<f64>() / window as f64
}

/// Simple return over `periods` ending at the last value.
fn period_return(values: &[f64], periods: usize) -> f64 {
    let last = values[values.len() - 1];
    let base = values[values.len() - 1 - periods];
    last / base - 1.0
}

/// Sample (n - 1) standard deviation.
fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / (n - 1.0);
    variance.sqrt()
}

/// Builds a [`MarketSnapshot`] from a benchmark price history.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorCalculator;

impl IndicatorCalculator {
    pub fn new() -> Self {
        IndicatorCalculator
    }

    /// `bars` must be in ascending date order; the snapshot is dated at the last bar.
    pub fn calculate(
        &self,
        bars: &[OhlcvBar],
        risk_index: f64,
    ) -> Result<MarketSnapshot, SolidQuantError> {
        let Some(last_bar) = bars.last().filter(|_| bars.len() >= MIN_BARS) else {
            return Err(SolidQuantError::InsufficientData {
                ticker: bars.first().map(|b| b.ticker.clone()).unwrap_or_default(),
                bars: bars.len(),
                minimum: MIN_BARS,
            });
        };

        let mut prices = closes(bars);
        fill_gaps(&mut prices);

        let price = prices[prices.len() - 1];
        let ma180 = trailing_mean(&prices, MA_WINDOW);

        let returns: Vec<f64> = prices[prices.len() - VOLATILITY_WINDOW - 1..]
            .windows(2)
            .map(|w| w[1] / w[0] - 1.0)
            .collect();
        let volatility = sample_stddev(&returns) * TRADING_DAYS_PER_YEAR.sqrt();

        let momentum = MOMENTUM_PERIODS
            .iter()
            .map(|&p| period_return(&prices, p))
            .sum::<f64>()
            / MOMENTUM_PERIODS.len() as f64;

        let peak = prices[prices.len() - DRAWDOWN_WINDOW..]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let drawdown = if peak == 0.0 { 0.0 } else { (price - peak) / peak };

        let snapshot = MarketSnapshot {
            date: last_bar.date,
            price,
            ma180,
            volatility,
            momentum,
            drawdown,
            risk_index,
        };

        let fields = [
            snapshot.price,
            snapshot.ma180,
            snapshot.volatility,
            snapshot.momentum,
            snapshot.drawdown,
            snapshot.risk_index,
        ];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(SolidQuantError::data(format!(
                "non-finite indicator for {} on {}",
                last_bar.ticker, last_bar.date
            )));
        }

        tracing::debug!(
            date = %snapshot.date,
            price = snapshot.price,
            ma180 = snapshot.ma180,
            volatility = snapshot.volatility,
            momentum = snapshot.momentum,
            drawdown = snapshot.drawdown,
            "indicators calculated"
        );

        Ok(snapshot)
    }
}

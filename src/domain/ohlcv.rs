//! Daily OHLCV bar representation.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// Bar with every price set to `close`.
    pub fn from_close(ticker: &str, date: NaiveDate, close: f64) -> Self {
        OhlcvBar {
            ticker: ticker.to_string(),
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }
}

/// Closing prices in bar order.
pub fn closes(bars: &[OhlcvBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Replaces non-finite values with the previous finite one.
///
/// Leading gaps take the first finite value. A series with no finite value
/// at all is returned unchanged.
pub fn fill_gaps(values: &mut [f64]) {
    let Some(first) = values.iter().copied().find(|v| v.is_finite()) else {
        return;
    };
    let mut last = first;
    for value in values.iter_mut() {
        if value.is_finite() {
            last = *value;
        } else {
            *value = last;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_close_sets_all_prices() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let bar = OhlcvBar::from_close("SPY", date, 471.5);
        assert_eq!(bar.ticker, "SPY");
        assert_eq!(bar.open, 471.5);
        assert_eq!(bar.high, 471.5);
        assert_eq!(bar.low, 471.5);
        assert_eq!(closes(&[bar]), vec![471.5]);
    }

    #[test]
    fn fill_gaps_forward_fills() {
        let mut values = vec![1.0, f64::NAN, 3.0, f64::INFINITY, f64::NAN];
        fill_gaps(&mut values);
        assert_eq!(values, vec![1.0, 1.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn fill_gaps_back_fills_head() {
        let mut values = vec![f64::NAN, f64::NAN, 2.0, 4.0];
        fill_gaps(&mut values);
        assert_eq!(values, vec![2.0, 2.0, 2.0, 4.0]);
    }

    #[test]
    fn fill_gaps_leaves_all_nan_untouched() {
        let mut values = vec![f64::NAN, f64::NAN];
        fill_gaps(&mut values);
        assert!(values.iter().all(|v| v.is_nan()));
    }
}

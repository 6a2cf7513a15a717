//! CSV price file adapter.
//!
//! One file per ticker at `{base}/{TICKER}.csv` with a header row naming
//! `date,open,high,low,close,volume` in any order and case. Extra columns are
//! ignored and `volume` may be absent. Blank or `null` prices read as NaN so
//! the indicator layer can fill them.

use crate::domain::backtest::EquityPoint;
use crate::domain::error::SolidQuantError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::MarketDataPort;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    base_path: PathBuf,
    risk_index: String,
}

/// File stem for a ticker. Index symbols like `^VIX` drop the caret.
pub fn sanitize_ticker(ticker: &str) -> String {
    ticker
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect()
}

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord, path: &Path) -> Result<Self, SolidQuantError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| {
                SolidQuantError::data(format!("{}: missing {} column", path.display(), name))
            })
        };
        Ok(Columns {
            date: require("date")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: find("volume"),
        })
    }
}

fn parse_price(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, SolidQuantError> {
    let raw = record.get(index).unwrap_or("").trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") || raw.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    raw.parse()
        .map_err(|e| SolidQuantError::data(format!("invalid {name} value {raw:?}: {e}")))
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf, risk_index: &str) -> Self {
        Self {
            base_path,
            risk_index: risk_index.to_string(),
        }
    }

    pub fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.csv", sanitize_ticker(ticker)))
    }

    /// Every bar in the ticker's file, ascending by date.
    pub fn load_bars(&self, ticker: &str) -> Result<Vec<OhlcvBar>, SolidQuantError> {
        let path = self.csv_path(ticker);
        let mut rdr = csv::Reader::from_path(&path).map_err(|e| {
            SolidQuantError::data(format!("failed to read {}: {}", path.display(), e))
        })?;

        let headers = rdr
            .headers()
            .map_err(|e| SolidQuantError::data(format!("CSV header error: {e}")))?
            .clone();
        let columns = Columns::from_headers(&headers, &path)?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record =
                result.map_err(|e| SolidQuantError::data(format!("CSV parse error: {e}")))?;

            let date_str = record.get(columns.date).unwrap_or("").trim();
            // Timestamped exports carry a time suffix after the date.
            let date_str = date_str.get(..10).unwrap_or(date_str);
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                SolidQuantError::data(format!("invalid date {date_str:?} in {}: {e}", path.display()))
            })?;

            let volume = match columns.volume {
                Some(i) => {
                    let v = parse_price(&record, i, "volume")?;
                    if v.is_finite() { v } else { 0.0 }
                }
                None => 0.0,
            };

            bars.push(OhlcvBar {
                ticker: ticker.to_string(),
                date,
                open: parse_price(&record, columns.open, "open")?,
                high: parse_price(&record, columns.high, "high")?,
                low: parse_price(&record, columns.low, "low")?,
                close: parse_price(&record, columns.close, "close")?,
                volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Ok(bars)
    }

    /// Full history for each ticker, keyed by the ticker as given.
    pub fn load_all(
        &self,
        tickers: &[String],
    ) -> Result<HashMap<String, Vec<OhlcvBar>>, SolidQuantError> {
        tickers
            .iter()
            .map(|t| Ok((t.clone(), self.load_bars(t)?)))
            .collect()
    }

    /// Last finite close per ticker. Tickers with no file or no usable close are omitted.
    pub fn latest_closes(&self, tickers: &[String]) -> HashMap<String, f64> {
        let mut closes = HashMap::new();
        for ticker in tickers {
            match self.load_bars(ticker) {
                Ok(bars) => {
                    if let Some(close) = bars.iter().rev().map(|b| b.close).find(|c| c.is_finite()) {
                        closes.insert(ticker.clone(), close);
                    } else {
                        tracing::warn!(%ticker, "no usable close price");
                    }
                }
                Err(err) => tracing::warn!(%ticker, error = %err, "price unavailable"),
            }
        }
        closes
    }

    /// Writes the backtest equity curve with a header row.
    pub fn write_equity_curve(path: &Path, points: &[EquityPoint]) -> Result<(), SolidQuantError> {
        let mut writer = csv::Writer::from_path(path).map_err(|e| {
            SolidQuantError::data(format!("failed to create {}: {}", path.display(), e))
        })?;
        for point in points {
            writer
                .serialize(point)
                .map_err(|e| SolidQuantError::data(format!("CSV write error: {e}")))?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl MarketDataPort for CsvAdapter {
    fn fetch_price_history(
        &self,
        ticker: &str,
        lookback: usize,
    ) -> Result<Vec<OhlcvBar>, SolidQuantError> {
        let mut bars = self.load_bars(ticker)?;
        if bars.len() > lookback {
            bars.drain(..bars.len() - lookback);
        }
        Ok(bars)
    }

    fn fetch_risk_index(&self) -> Result<f64, SolidQuantError> {
        let bars = self.load_bars(&self.risk_index)?;
        bars.iter()
            .rev()
            .map(|b| b.close)
            .find(|c| c.is_finite())
            .ok_or_else(|| SolidQuantError::data(format!("no {} close available", self.risk_index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::regime::Regime;
    use std::fs;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        fs::write(
            path.join("SPY.csv"),
            "date,open,high,low,close,volume\n\
             2024-01-17,110.0,120.0,105.0,115.0,55000\n\
             2024-01-15,100.0,110.0,90.0,105.0,50000\n\
             2024-01-16,105.0,115.0,100.0,110.0,60000\n",
        )
        .unwrap();
        fs::write(
            path.join("VIX.csv"),
            "Date,Open,High,Low,Close,Adj Close\n\
             2024-01-15,13.0,14.0,12.5,13.5,13.5\n\
             2024-01-16,13.5,15.0,13.0,14.8,14.8\n\
             2024-01-17,14.8,15.0,14.0,,\n",
        )
        .unwrap();
        fs::write(path.join("GLD.csv"), "date,open,high,low,close,volume\n").unwrap();

        (dir, path)
    }

    #[test]
    fn sanitize_strips_index_caret() {
        assert_eq!(sanitize_ticker("^VIX"), "VIX");
        assert_eq!(sanitize_ticker("BRK.B"), "BRK.B");
        assert_eq!(sanitize_ticker("../etc"), "..etc");
    }

    #[test]
    fn load_bars_sorts_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path, "^VIX");

        let bars = adapter.load_bars("SPY").unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000.0);
        assert_eq!(bars[2].close, 115.0);
    }

    #[test]
    fn fetch_price_history_keeps_most_recent() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path, "^VIX");

        let bars = adapter.fetch_price_history("SPY", 2).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 110.0);
        assert_eq!(bars[1].close, 115.0);
    }

    #[test]
    fn missing_file_is_a_data_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path, "^VIX");
        let err = adapter.fetch_price_history("XYZ", 10).unwrap_err();
        assert!(matches!(err, SolidQuantError::DataSource { .. }));
    }

    #[test]
    fn risk_index_skips_blank_closes() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path, "^VIX");
        assert_eq!(adapter.fetch_risk_index().unwrap(), 14.8);
    }

    #[test]
    fn latest_closes_omits_unavailable() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path, "^VIX");
        let closes =
            adapter.latest_closes(&["SPY".to_string(), "GLD".to_string(), "QLD".to_string()]);
        assert_eq!(closes.len(), 1);
        assert_eq!(closes["SPY"], 115.0);
    }

    #[test]
    fn load_all_fails_on_any_missing_ticker() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path, "^VIX");
        assert!(adapter.load_all(&["SPY".to_string()]).is_ok());
        assert!(adapter
            .load_all(&["SPY".to_string(), "QLD".to_string()])
            .is_err());
    }

    #[test]
    fn missing_close_column_is_rejected() {
        let (_dir, path) = setup_test_data();
        fs::write(path.join("BAD.csv"), "date,open,high,low\n2024-01-15,1,2,0.5\n").unwrap();
        let adapter = CsvAdapter::new(path, "^VIX");
        let err = adapter.load_bars("BAD").unwrap_err();
        assert!(err.to_string().contains("close"));
    }

    #[test]
    fn equity_curve_round_trips_through_csv() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("equity.csv");
        let points = vec![EquityPoint {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            total_value: 10_100.5,
            cash: 2_000.0,
            exposure: 0.6,
            regime: Regime::BearWeak,
        }];
        CsvAdapter::write_equity_curve(&out, &points).unwrap();

        let content = fs::read_to_string(&out).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("date,total_value,cash,exposure,regime"));
        assert_eq!(lines.next(), Some("2024-01-02,10100.5,2000.0,0.6,Bear_Weak"));
    }
}

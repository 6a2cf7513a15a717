//! Typed settings loaded and validated from a [`ConfigPort`].
//!
//! Every numeric key has a default, so a minimal file only needs the
//! `[groups]` section. Validation runs before anything is built and reports
//! the first offending key.

use crate::domain::error::SolidQuantError;
use crate::domain::execution::ExecutionConfig;
use crate::domain::exposure::DEFAULT_TARGET_VOLATILITY;
use crate::domain::rebalancer::AssetGroups;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BENCHMARK: &str = "SPY";
pub const DEFAULT_RISK_INDEX: &str = "^VIX";
pub const DEFAULT_LOOKBACK_DAYS: i64 = 400;
pub const DEFAULT_INITIAL_CASH: f64 = 10_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategySettings {
    pub benchmark: String,
    pub risk_index: String,
    pub lookback_days: usize,
    pub target_volatility: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrokerSettings {
    pub initial_cash: f64,
    /// Paper positions persist here between runs when set.
    pub state_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelegramSettings {
    pub token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSettings {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub initial_cash: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub groups: AssetGroups,
    pub strategy: StrategySettings,
    pub execution: ExecutionConfig,
    pub broker: BrokerSettings,
    pub price_dir: PathBuf,
    pub journal_dir: PathBuf,
    pub telegram: TelegramSettings,
    pub backtest: BacktestSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SolidQuantError> {
        validate_settings(config)?;

        let groups = AssetGroups::new(
            parse_tickers(&config.get_string("groups", "a").unwrap_or_default()),
            parse_tickers(&config.get_string("groups", "b").unwrap_or_default()),
            parse_tickers(&config.get_string("groups", "c").unwrap_or_default()),
        );

        let strategy = StrategySettings {
            benchmark: non_empty(config, "strategy", "benchmark")
                .unwrap_or_else(|| DEFAULT_BENCHMARK.to_string()),
            risk_index: non_empty(config, "strategy", "risk_index")
                .unwrap_or_else(|| DEFAULT_RISK_INDEX.to_string()),
            lookback_days: config.get_int("strategy", "lookback_days", DEFAULT_LOOKBACK_DAYS)
                as usize,
            target_volatility: config.get_double(
                "strategy",
                "target_volatility",
                DEFAULT_TARGET_VOLATILITY,
            ),
        };

        let defaults = ExecutionConfig::default();
        let execution = ExecutionConfig {
            slippage_pct: config.get_double("execution", "slippage_pct", defaults.slippage_pct),
            fee_pct: config.get_double("execution", "fee_pct", defaults.fee_pct),
            safety_margin: config.get_double("execution", "safety_margin", defaults.safety_margin),
            poll_interval: millis(config, "poll_interval_ms", defaults.poll_interval),
            fill_timeout: millis(config, "fill_timeout_ms", defaults.fill_timeout),
        };

        let broker = BrokerSettings {
            initial_cash: config.get_double("broker", "initial_cash", DEFAULT_INITIAL_CASH),
            state_path: non_empty(config, "broker", "state_path").map(PathBuf::from),
        };

        let backtest = BacktestSettings {
            start_date: optional_date(config, "start_date")?,
            end_date: optional_date(config, "end_date")?,
            initial_cash: config.get_double("backtest", "initial_cash", DEFAULT_INITIAL_CASH),
        };

        let logging = LoggingSettings {
            level: non_empty(config, "logging", "level").unwrap_or_else(|| "info".to_string()),
            format: parse_log_format(config)?,
        };

        Ok(Settings {
            groups,
            strategy,
            execution,
            broker,
            price_dir: non_empty(config, "data", "price_dir")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/prices")),
            journal_dir: non_empty(config, "journal", "path")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("docs/data")),
            telegram: TelegramSettings {
                token: config.get_string("telegram", "token").unwrap_or_default(),
                chat_id: config.get_string("telegram", "chat_id").unwrap_or_default(),
            },
            backtest,
            logging,
        })
    }
}

/// Splits a comma-separated ticker list, dropping blanks.
pub fn parse_tickers(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn millis(config: &dyn ConfigPort, key: &str, default: Duration) -> Duration {
    let value = config.get_int("execution", key, default.as_millis() as i64);
    Duration::from_millis(value.max(0) as u64)
}

fn invalid(section: &str, key: &str, reason: &str) -> SolidQuantError {
    SolidQuantError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_settings(config: &dyn ConfigPort) -> Result<(), SolidQuantError> {
    validate_groups(config)?;
    validate_strategy(config)?;
    validate_execution(config)?;
    validate_broker(config)?;
    validate_backtest(config)?;
    parse_log_format(config)?;
    Ok(())
}

fn validate_groups(config: &dyn ConfigPort) -> Result<(), SolidQuantError> {
    for key in ["a", "b"] {
        if config.get_string("groups", key).is_none() {
            return Err(SolidQuantError::ConfigMissing {
                section: "groups".to_string(),
                key: key.to_string(),
            });
        }
    }
    // A ticker may belong to one group only, and only once.
    let mut seen = HashSet::new();
    for key in ["a", "b", "c"] {
        let tickers = parse_tickers(&config.get_string("groups", key).unwrap_or_default());
        for ticker in tickers {
            if !seen.insert(ticker.to_uppercase()) {
                return Err(invalid(
                    "groups",
                    key,
                    &format!("ticker {ticker} is listed more than once across groups"),
                ));
            }
        }
    }
    Ok(())
}

fn validate_strategy(config: &dyn ConfigPort) -> Result<(), SolidQuantError> {
    let target = config.get_double("strategy", "target_volatility", DEFAULT_TARGET_VOLATILITY);
    if !target.is_finite() || target <= 0.0 {
        return Err(invalid(
            "strategy",
            "target_volatility",
            "target_volatility must be positive",
        ));
    }
    let lookback = config.get_int("strategy", "lookback_days", DEFAULT_LOOKBACK_DAYS);
    if lookback < crate::domain::indicators::MIN_BARS as i64 {
        return Err(invalid(
            "strategy",
            "lookback_days",
            "lookback_days must cover at least 253 trading days",
        ));
    }
    Ok(())
}

fn validate_execution(config: &dyn ConfigPort) -> Result<(), SolidQuantError> {
    for key in ["slippage_pct", "fee_pct"] {
        let pct = config.get_double("execution", key, 0.0);
        if !(0.0..100.0).contains(&pct) {
            return Err(invalid(
                "execution",
                key,
                &format!("{key} must be in [0, 100)"),
            ));
        }
    }
    let margin = config.get_double("execution", "safety_margin", 0.98);
    if !(margin > 0.0 && margin <= 1.0) {
        return Err(invalid(
            "execution",
            "safety_margin",
            "safety_margin must be in (0, 1]",
        ));
    }
    for key in ["poll_interval_ms", "fill_timeout_ms"] {
        if config.get_int("execution", key, 0) < 0 {
            return Err(invalid(
                "execution",
                key,
                &format!("{key} must be non-negative"),
            ));
        }
    }
    Ok(())
}

fn validate_broker(config: &dyn ConfigPort) -> Result<(), SolidQuantError> {
    match non_empty(config, "broker", "mode") {
        None => {}
        Some(mode) if mode.eq_ignore_ascii_case("paper") => {}
        Some(_) => {
            return Err(invalid(
                "broker",
                "mode",
                "only paper mode is supported",
            ))
        }
    }
    if config.get_double("broker", "initial_cash", DEFAULT_INITIAL_CASH) <= 0.0 {
        return Err(invalid(
            "broker",
            "initial_cash",
            "initial_cash must be positive",
        ));
    }
    Ok(())
}

fn validate_backtest(config: &dyn ConfigPort) -> Result<(), SolidQuantError> {
    let start = optional_date(config, "start_date")?;
    let end = optional_date(config, "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(invalid(
                "backtest",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    if config.get_double("backtest", "initial_cash", DEFAULT_INITIAL_CASH) <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_cash",
            "initial_cash must be positive",
        ));
    }
    Ok(())
}

fn optional_date(config: &dyn ConfigPort, field: &str) -> Result<Option<NaiveDate>, SolidQuantError> {
    match non_empty(config, "backtest", field) {
        None => Ok(None),
        Some(s) => parse_date(&s, field).map(Some),
    }
}

/// Parses `YYYY-MM-DD`; errors name the `[backtest]` key.
pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate, SolidQuantError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        invalid(
            "backtest",
            field,
            &format!("invalid {field} format, expected YYYY-MM-DD"),
        )
    })
}

fn parse_log_format(config: &dyn ConfigPort) -> Result<LogFormat, SolidQuantError> {
    match non_empty(config, "logging", "format")
        .map(|f| f.to_lowercase())
        .as_deref()
    {
        None | Some("text") => Ok(LogFormat::Text),
        Some("json") => Ok(LogFormat::Json),
        Some(_) => Err(invalid("logging", "format", "format must be text or json")),
    }
}

//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_journal::JsonJournal;
use crate::adapters::paper_broker::{PaperBroker, ReplayBroker};
use crate::adapters::replay_data::ReplayDataPort;
use crate::adapters::telegram_notifier::TelegramNotifier;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::cycle::{alert_failure, CycleSettings, TradingCycle};
use crate::domain::error::SolidQuantError;
use crate::domain::exposure::ExposureSizer;
use crate::domain::rebalancer::Rebalancer;
use crate::domain::settings::{parse_date, Settings};
use crate::obs;
use crate::ports::notifier_port::NotifierPort;

#[derive(Parser, Debug)]
#[command(name = "solidquant", about = "Tactical asset allocation bot", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one daily trading cycle
    Run {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Replay the strategy over historical price files
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// First simulated day (YYYY-MM-DD), overrides [backtest] start_date
        #[arg(long)]
        start: Option<String>,
        /// Last simulated day (YYYY-MM-DD), overrides [backtest] end_date
        #[arg(long)]
        end: Option<String>,
        /// Write the equity curve to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run { config } => run_cycle(&config),
        Command::Backtest {
            config,
            start,
            end,
            output,
        } => run_backtest(&config, start.as_deref(), end.as_deref(), output.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: &SolidQuantError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_settings(path: &Path) -> Result<Settings, SolidQuantError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    Settings::from_config(&adapter)
}

fn init_logging(settings: &Settings) {
    if let Err(err) = obs::init_tracing(&settings.logging.level, settings.logging.format) {
        eprintln!("warning: {err}");
    }
}

fn run_cycle(config_path: &Path) -> ExitCode {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    init_logging(&settings);
    tracing::info!(config = %config_path.display(), "starting trading cycle");

    let notifier = TelegramNotifier::new(&settings.telegram.token, &settings.telegram.chat_id);
    match execute_cycle(&settings, &notifier) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

/// Paper account and journal for one cycle.
fn open_paper_session(settings: &Settings) -> Result<(PaperBroker, JsonJournal), SolidQuantError> {
    let broker = match &settings.broker.state_path {
        Some(path) => PaperBroker::open(path, settings.broker.initial_cash, settings.execution.clone())?,
        None => PaperBroker::new(settings.broker.initial_cash, settings.execution.clone()),
    };
    let journal = JsonJournal::new(&settings.journal_dir)?;
    Ok((broker, journal))
}

fn execute_cycle(settings: &Settings, notifier: &dyn NotifierPort) -> Result<(), SolidQuantError> {
    let data = CsvAdapter::new(settings.price_dir.clone(), &settings.strategy.risk_index);
    let (mut broker, journal) =
        open_paper_session(settings).inspect_err(|err| alert_failure(notifier, err))?;
    broker.set_prices(data.latest_closes(&settings.groups.all_tickers()));

    let mut cycle = TradingCycle::new(
        CycleSettings {
            benchmark: settings.strategy.benchmark.clone(),
            lookback_days: settings.strategy.lookback_days,
        },
        ExposureSizer::new(settings.strategy.target_volatility),
        Rebalancer::new(settings.groups.clone()),
        &data,
        &mut broker,
        notifier,
        &journal,
    );
    let report = cycle.run()?;

    println!(
        "{}: {} exposure {:.0}%, {} orders, {} executions, total value ${:.2}",
        report.snapshot.date,
        report.regime,
        report.exposure * 100.0,
        report.signal.orders.len(),
        report.executions.len(),
        report.portfolio.total_value()
    );
    Ok(())
}

fn resolve_date(
    cli_value: Option<&str>,
    configured: Option<NaiveDate>,
    field: &str,
) -> Result<Option<NaiveDate>, SolidQuantError> {
    match cli_value {
        Some(s) => parse_date(s, field).map(Some),
        None => Ok(configured),
    }
}

fn run_backtest(
    config_path: &Path,
    start: Option<&str>,
    end: Option<&str>,
    output: Option<&Path>,
) -> ExitCode {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    init_logging(&settings);

    let result = resolve_date(start, settings.backtest.start_date, "start_date")
        .and_then(|start| {
            let end = resolve_date(end, settings.backtest.end_date, "end_date")?;
            execute_backtest(&settings, start, end)
        });

    let result = match result {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    println!("Trading days: {} (skipped {})", result.equity_curve.len(), result.skipped_days);
    println!(
        "Initial: ${:.0} -> Final: ${:.0}",
        result.initial_value,
        result.final_value()
    );
    println!("Total return: {:.2}%", result.total_return() * 100.0);
    println!("CAGR: {:.2}%", result.cagr() * 100.0);
    println!("Executions: {}", result.trade_count);

    if let Some(path) = output {
        if let Err(e) = CsvAdapter::write_equity_curve(path, &result.equity_curve) {
            return fail(&e);
        }
        println!("Equity curve written to {}", path.display());
    }

    ExitCode::SUCCESS
}

fn execute_backtest(
    settings: &Settings,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<BacktestResult, SolidQuantError> {
    if let (Some(s), Some(e)) = (start_date, end_date) {
        if s >= e {
            return Err(SolidQuantError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "start_date".to_string(),
                reason: "start_date must be before end_date".to_string(),
            });
        }
    }

    let csv = CsvAdapter::new(settings.price_dir.clone(), &settings.strategy.risk_index);
    let mut tickers = settings.groups.all_tickers();
    if !tickers.contains(&settings.strategy.benchmark) {
        tickers.push(settings.strategy.benchmark.clone());
    }
    let history = csv.load_all(&tickers)?;
    let risk_index = csv.load_bars(&settings.strategy.risk_index).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "risk index history unavailable, using default level");
        Vec::new()
    });

    let mut data = ReplayDataPort::new(history, risk_index);
    let mut broker = ReplayBroker::new(settings.backtest.initial_cash, settings.execution.clone());

    let config = BacktestConfig {
        start_date,
        end_date,
        initial_cash: settings.backtest.initial_cash,
        benchmark: settings.strategy.benchmark.clone(),
        lookback_days: settings.strategy.lookback_days,
        target_volatility: settings.strategy.target_volatility,
        groups: settings.groups.clone(),
    };
    backtest_engine::run_backtest(&mut data, &mut broker, &config)
}

fn run_validate(config_path: &Path) -> ExitCode {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    println!("Configuration OK: {}", config_path.display());
    println!("  Group A: {}", settings.groups.growth.join(", "));
    println!("  Group B: {}", settings.groups.defensive.join(", "));
    println!("  Group C: {}", settings.groups.cash_proxy.join(", "));
    println!(
        "  Benchmark: {} (risk index {}, lookback {} days)",
        settings.strategy.benchmark, settings.strategy.risk_index, settings.strategy.lookback_days
    );
    println!("  Target volatility: {}", settings.strategy.target_volatility);
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_backtest_overrides() {
        let cli = Cli::try_parse_from([
            "solidquant",
            "backtest",
            "--config",
            "bot.ini",
            "--start",
            "2020-01-01",
            "--output",
            "equity.csv",
        ])
        .unwrap();
        match cli.command {
            Command::Backtest {
                config,
                start,
                end,
                output,
            } => {
                assert_eq!(config, PathBuf::from("bot.ini"));
                assert_eq!(start.as_deref(), Some("2020-01-01"));
                assert_eq!(end, None);
                assert_eq!(output, Some(PathBuf::from("equity.csv")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        messages: RefCell<Vec<String>>,
        alerts: RefCell<Vec<String>>,
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

    fn settings_in(dir: &TempDir) -> Settings {
        let config = dir.path().join("bot.ini");
        fs::write(
            &config,
            format!(
                "[groups]\na = SSO\nb = IEF\n\n[broker]\nstate_path = {}\n\n[data]\nprice_dir = {}\n\n[journal]\npath = {}\n",
                dir.path().join("state.json").display(),
                dir.path().join("prices").display(),
                dir.path().join("journal").display(),
            ),
        )
        .unwrap();
        load_settings(&config).unwrap()
    }

    #[test]
    fn corrupt_paper_state_alerts_before_exit() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("state.json"), "{not json").unwrap();
        let settings = settings_in(&dir);
        let notifier = RecordingNotifier::default();

        let err = execute_cycle(&settings, &notifier).unwrap_err();

        assert!(matches!(err, SolidQuantError::Json(_)));
        let alerts = notifier.alerts.borrow();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].starts_with("Trading cycle failed"));
        assert!(notifier.messages.borrow().is_empty());
        assert!(!dir.path().join("journal").exists());
    }

    #[test]
    fn unwritable_journal_alerts_before_exit() {
        let dir = TempDir::new().unwrap();
        // A plain file where the journal directory should go
        fs::write(dir.path().join("journal"), "").unwrap();
        let settings = settings_in(&dir);
        let notifier = RecordingNotifier::default();

        let err = execute_cycle(&settings, &notifier).unwrap_err();

        assert!(matches!(err, SolidQuantError::Journal { .. }));
        assert_eq!(notifier.alerts.borrow().len(), 1);
    }

    #[test]
    fn resolve_date_prefers_cli_value() {
        let configured = NaiveDate::from_ymd_opt(2019, 1, 1);
        assert_eq!(
            resolve_date(Some("2021-06-30"), configured, "start_date").unwrap(),
            NaiveDate::from_ymd_opt(2021, 6, 30)
        );
        assert_eq!(resolve_date(None, configured, "start_date").unwrap(), configured);
        assert!(resolve_date(Some("June"), configured, "start_date").is_err());
    }
}

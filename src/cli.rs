//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestReport, Signals};
use crate::domain::config_validation::{
    optional_int, parse_date, parse_underlying_map, validate_backtest_config,
    validate_strategy_config,
};
use crate::domain::error::SwingtestError;
use crate::domain::metrics::{
    EdgeConsistency, ExitReasonStats, Metrics, SectorPerformance, SymbolPerformance,
    TimeBasedStats,
};
use crate::domain::pairing::signal_symbol_for;
use crate::domain::ranking::RankerKind;
use crate::domain::rule::Rule;
use crate::domain::rule_parser;
use crate::domain::signal::ExitSignal;
use crate::domain::strategy::Strategy;
use crate::domain::universe::{load_universe, parse_symbols};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_OUTPUT: &str = "trades.csv";

#[derive(Parser, Debug)]
#[command(name = "swingtest", about = "Swing-trading strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Comma-separated symbols, overriding the config
        #[arg(long)]
        symbols: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a strategy configuration
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// Show data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbols: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            strategy,
            output,
            symbols,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, strategy.as_deref(), symbols.as_deref())
            } else {
                run_backtest(
                    &config,
                    strategy.as_deref(),
                    output.as_deref(),
                    symbols.as_deref(),
                )
            }
        }
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Validate { strategy } => run_validate(&strategy),
        Command::Info { config, symbols } => run_info(&config, symbols.as_deref()),
    }
}

fn fail(err: SwingtestError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SwingtestError> {
    FileConfigAdapter::from_file(path).map_err(|e| SwingtestError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Strategy section source: a separate file when given, else the main config.
fn load_strategy_source(
    config: FileConfigAdapter,
    strategy_path: Option<&Path>,
) -> Result<FileConfigAdapter, SwingtestError> {
    match strategy_path {
        Some(path) => {
            eprintln!("Loading strategy from {}", path.display());
            load_config(path)
        }
        None => Ok(config),
    }
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, SwingtestError> {
    let start_date = parse_date(adapter, "start_date")?;
    let end_date = parse_date(adapter, "end_date")?;

    let mut config = BacktestConfig::new(start_date, end_date);
    config.max_positions = optional_int(adapter, "backtest", "max_positions")?
        .map(|n| n.max(1) as usize);
    config.cooldown_days = optional_int(adapter, "backtest", "cooldown_days")?
        .map_or(0, |n| n.max(0) as usize);
    config.entry_delay_days = optional_int(adapter, "backtest", "entry_delay_days")?
        .map_or(0, |n| n.max(0) as usize);
    config.use_underlying_assets = adapter.get_bool("backtest", "use_underlying_assets", true);
    if let Some(raw) = adapter.get_string("backtest", "underlying_map") {
        config.underlying_overrides =
            parse_underlying_map(&raw).map_err(|reason| SwingtestError::ConfigInvalid {
                section: "backtest".into(),
                key: "underlying_map".into(),
                reason,
            })?;
    }
    config.validate()?;
    Ok(config)
}

fn parse_rule_key(adapter: &dyn ConfigPort, key: &str) -> Result<Option<Rule>, SwingtestError> {
    let Some(text) = adapter
        .get_string("strategy", key)
        .filter(|s| !s.trim().is_empty())
    else {
        return Ok(None);
    };
    match rule_parser::parse(&text) {
        Ok(rule) => Ok(Some(rule)),
        Err(e) => {
            eprintln!(
                "error: failed to parse {}:\n{}",
                key,
                e.display_with_context(&text)
            );
            Err(e.into())
        }
    }
}

pub fn build_strategy(adapter: &dyn ConfigPort) -> Result<Strategy, SwingtestError> {
    let name = adapter
        .get_string("strategy", "name")
        .unwrap_or_else(|| "Unnamed".to_string());
    let description = adapter
        .get_string("strategy", "description")
        .unwrap_or_default();

    let entry = parse_rule_key(adapter, "entry")?.ok_or_else(|| SwingtestError::ConfigMissing {
        section: "strategy".into(),
        key: "entry".into(),
    })?;
    let exit = parse_rule_key(adapter, "exit")?;

    let ranker = match adapter.get_string("strategy", "ranker") {
        Some(name) => RankerKind::parse(&name).ok_or_else(|| SwingtestError::ConfigInvalid {
            section: "strategy".into(),
            key: "ranker".into(),
            reason: format!("unknown ranker '{}'", name),
        })?,
        None => RankerKind::default(),
    };

    let strategy = Strategy {
        name,
        description,
        entry,
        exit,
        exit_reason: adapter
            .get_string("strategy", "exit_reason")
            .unwrap_or_default(),
        stop_loss_pct: adapter.get_double("strategy", "stop_loss", 0.0),
        take_profit_pct: adapter.get_double("strategy", "take_profit", 0.0),
        ranker,
    };
    strategy.validate()?;
    Ok(strategy)
}

pub fn resolve_symbols(
    symbols_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, SwingtestError> {
    let raw = symbols_override
        .map(str::to_string)
        .or_else(|| config.get_string("backtest", "symbols"))
        .or_else(|| config.get_string("backtest", "symbol"))
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| SwingtestError::ConfigMissing {
            section: "backtest".into(),
            key: "symbols".into(),
        })?;
    parse_symbols(&raw).map_err(|e| SwingtestError::ConfigInvalid {
        section: "backtest".into(),
        key: "symbols".into(),
        reason: e.to_string(),
    })
}

fn data_dir(config: &dyn ConfigPort) -> Result<PathBuf, SwingtestError> {
    config
        .get_string("backtest", "data_dir")
        .filter(|s| !s.trim().is_empty())
        .map(|s| PathBuf::from(s.trim()))
        .ok_or_else(|| SwingtestError::ConfigMissing {
            section: "backtest".into(),
            key: "data_dir".into(),
        })
}

/// Load the universe through `data_port` and run one backtest.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    strategy: &Strategy,
    config: &BacktestConfig,
    symbols: &[String],
) -> Result<BacktestReport, SwingtestError> {
    let universe = load_universe(
        data_port,
        symbols,
        config.use_underlying_assets,
        &config.underlying_overrides,
    )?;
    let traded = universe.traded_instruments();

    let entry = strategy.entry_signal();
    let exit = strategy.exit_signal();
    let ranker = strategy.ranker.build();
    let signals = Signals {
        entry: &entry,
        exit: &exit,
        ranker: ranker.as_ref(),
    };

    eprintln!(
        "Running backtest: {} symbols, {} to {}",
        traded.len(),
        config.start_date,
        config.end_date,
    );
    backtest_engine::run_backtest(&traded, &universe.store, &signals, config)
}

fn run_backtest(
    config_path: &Path,
    strategy_path: Option<&Path>,
    output_path: Option<&Path>,
    symbols_override: Option<&str>,
) -> ExitCode {
    match try_run_backtest(config_path, strategy_path, output_path, symbols_override) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

fn try_run_backtest(
    config_path: &Path,
    strategy_path: Option<&Path>,
    output_path: Option<&Path>,
    symbols_override: Option<&str>,
) -> Result<(), SwingtestError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_backtest_config(&adapter)?;

    let bt_config = build_backtest_config(&adapter)?;
    let symbols = resolve_symbols(symbols_override, &adapter)?;
    let data_port = CsvAdapter::new(data_dir(&adapter)?);
    let output = output_path
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("report", "output").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    let strategy_config = load_strategy_source(adapter, strategy_path)?;
    validate_strategy_config(&strategy_config)?;
    let strategy = build_strategy(&strategy_config)?;
    eprintln!("Loading strategy: {}", strategy.name);

    let report = run_backtest_pipeline(&data_port, &strategy, &bt_config, &symbols)?;
    print_summary(&report);

    CsvReportAdapter::new().write(&report, &strategy, &output.display().to_string())?;
    eprintln!("\nTrade ledger written to: {}", output.display());
    Ok(())
}

/// Sector, calendar-period and edge-consistency sections of the summary.
fn breakdown_lines(report: &BacktestReport) -> Vec<String> {
    let mut lines = Vec::new();

    let sectors = SectorPerformance::compute(report);
    if sectors.len() > 1 {
        lines.push("\n=== Per-Sector Summary ===".to_string());
        for row in &sectors {
            let name = if row.sector.is_empty() { "(none)" } else { row.sector.as_str() };
            lines.push(format!(
                "  {}:  {} trades, {:.1}% win rate, {:.2}% edge",
                name,
                row.summary.trades,
                row.summary.win_rate * 100.0,
                row.summary.edge,
            ));
        }
    }

    let periods = TimeBasedStats::compute(report);
    if !periods.by_year.is_empty() {
        lines.push("\n=== By Year ===".to_string());
        for (year, stats) in &periods.by_year {
            lines.push(format!(
                "  {}:  {} trades, {:.1}% win rate, {:.2}% avg, {:.2}% edge",
                year,
                stats.trades,
                stats.win_rate * 100.0,
                stats.avg_profit_pct,
                stats.edge,
            ));
        }
        lines.push("\n=== By Quarter ===".to_string());
        for (quarter, stats) in &periods.by_quarter {
            lines.push(format!(
                "  {}:  {} trades, {:.1}% win rate, {:.2}% edge",
                quarter,
                stats.trades,
                stats.win_rate * 100.0,
                stats.edge,
            ));
        }
        lines.push("\n=== By Month ===".to_string());
        for (month, stats) in &periods.by_month {
            lines.push(format!(
                "  {}:  {} trades, {:.2}% avg",
                month, stats.trades, stats.avg_profit_pct
            ));
        }
    }

    lines.push(match EdgeConsistency::compute(&periods.by_year) {
        Some(consistency) => format!(
            "\nEdge Consistency: {:.1} ({}, {} years)",
            consistency.score,
            consistency.interpretation(),
            consistency.years_analyzed,
        ),
        None => "\nEdge Consistency: n/a (needs two years of trades)".to_string(),
    });
    lines
}

fn print_summary(report: &BacktestReport) {
    let metrics = Metrics::compute(report);

    eprintln!("\n=== Results ===");
    eprintln!("Total Trades:     {}", metrics.total_trades);
    eprintln!("Winning:          {}", metrics.winning_trades);
    eprintln!("Losing:           {}", metrics.losing_trades);
    eprintln!("Missed:           {}", metrics.missed_trades);
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Avg Win:          {:.2}%", metrics.avg_win_pct);
    eprintln!("Avg Loss:         {:.2}%", metrics.avg_loss_pct);
    eprintln!("Edge:             {:.2}%", metrics.edge);
    match metrics.profit_factor {
        Some(pf) => eprintln!("Profit Factor:    {:.2}", pf),
        None => eprintln!("Profit Factor:    n/a"),
    }
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown_pct);
    eprintln!("Avg Holding:      {:.1} days", metrics.avg_holding_days);
    eprintln!("Missed Profit:    {:.2}%", metrics.missed_profit_pct);

    let symbols = SymbolPerformance::compute_per_symbol(report);
    if symbols.len() > 1 {
        eprintln!("\n=== Per-Symbol Summary ===");
        for row in &symbols {
            let sign = if row.total_profit_pct >= 0.0 { "+" } else { "" };
            eprintln!(
                "  {}:  {} trades, {:.1}% win rate, {}{:.2}%",
                row.symbol,
                row.summary.trades,
                row.summary.win_rate * 100.0,
                sign,
                row.total_profit_pct,
            );
        }
    }

    for line in breakdown_lines(report) {
        eprintln!("{}", line);
    }

    let reasons = ExitReasonStats::compute(report);
    if !reasons.is_empty() {
        eprintln!("\n=== Exit Reasons ===");
        for row in &reasons {
            eprintln!(
                "  {}:  {} trades, {:.1}% win rate, {:.2}% avg",
                row.reason,
                row.count,
                row.win_rate * 100.0,
                row.avg_profit_pct,
            );
        }
    }

    let stats = &report.stats;
    eprintln!(
        "\n{} trading days, {} candidates, {} blocked by cooldown, {} voided",
        stats.trading_days, stats.candidates, stats.cooldown_blocked, stats.voided
    );
}

pub fn run_dry_run(
    config_path: &Path,
    strategy_path: Option<&Path>,
    symbols_override: Option<&str>,
) -> ExitCode {
    match try_dry_run(config_path, strategy_path, symbols_override) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

fn try_dry_run(
    config_path: &Path,
    strategy_path: Option<&Path>,
    symbols_override: Option<&str>,
) -> Result<(), SwingtestError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_backtest_config(&adapter)?;
    let bt_config = build_backtest_config(&adapter)?;
    let symbols = resolve_symbols(symbols_override, &adapter)?;

    let strategy_config = load_strategy_source(adapter, strategy_path)?;
    validate_strategy_config(&strategy_config)?;
    let strategy = build_strategy(&strategy_config)?;
    eprintln!("Config validated successfully");

    eprintln!("\nStrategy: {}", strategy.name);
    eprintln!("  entry:  {}", strategy.entry);
    eprintln!("  exit:   {}", strategy.exit_signal().describe());
    eprintln!("  ranker: {}", strategy.ranker);

    eprintln!("\nBacktest:");
    eprintln!("  range: {} to {}", bt_config.start_date, bt_config.end_date);
    match bt_config.max_positions {
        Some(n) => eprintln!("  max positions: {}", n),
        None => eprintln!("  max positions: unlimited"),
    }
    eprintln!("  cooldown days: {}", bt_config.cooldown_days);
    eprintln!("  entry delay days: {}", bt_config.entry_delay_days);

    eprintln!("\nUniverse:");
    for symbol in &symbols {
        let signal = signal_symbol_for(
            symbol,
            bt_config.use_underlying_assets,
            &bt_config.underlying_overrides,
        );
        if signal == *symbol {
            eprintln!("  {}", symbol);
        } else {
            eprintln!("  {} (signals from {})", symbol, signal);
        }
    }

    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

fn run_list_symbols(config_path: &Path) -> ExitCode {
    let result = load_config(config_path)
        .and_then(|config| data_dir(&config))
        .and_then(|dir| CsvAdapter::new(dir).list_symbols());
    let symbols = match result {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols found");
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}

fn run_validate(strategy_path: &Path) -> ExitCode {
    eprintln!("Validating strategy: {}", strategy_path.display());
    let strategy = match load_config(strategy_path).and_then(|adapter| {
        validate_strategy_config(&adapter)?;
        build_strategy(&adapter)
    }) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    eprintln!("\nStrategy: {}", strategy.name);
    if !strategy.description.is_empty() {
        eprintln!("  {}", strategy.description);
    }
    eprintln!("\nEntry Rule:");
    eprintln!("  Parsed: {}", strategy.entry);
    eprintln!("\nExit:");
    eprintln!("  {}", strategy.exit_signal().describe());
    eprintln!("\nRanker: {}", strategy.ranker);

    eprintln!("\nStrategy configuration is valid.");
    ExitCode::SUCCESS
}

fn run_info(config_path: &Path, symbols_override: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let adapter = match data_dir(&config) {
        Ok(dir) => CsvAdapter::new(dir),
        Err(e) => return fail(e),
    };
    let symbols = match symbols_override {
        Some(_) => resolve_symbols(symbols_override, &config),
        None => adapter.list_symbols(),
    };
    let symbols = match symbols {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    for symbol in &symbols {
        match adapter.get_data_range(symbol) {
            Ok(Some((first, last, count))) => {
                println!("{}: {} quotes, {} to {}", symbol, count, first, last);
            }
            Ok(None) => eprintln!("{}: no data found", symbol),
            Err(e) => eprintln!("error querying {}: {}", symbol, e),
        }
    }
    ExitCode::SUCCESS
}

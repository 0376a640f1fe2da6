//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use crate::adapters::csv_adapter::{CsvAdapter, CsvLayout, CsvTail};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest as run_single, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{load_app_config, AppConfig, StrategySpec};
use crate::domain::engine::StepReport;
use crate::domain::error::MomtraderError;
use crate::domain::grid_search::{GridSearch, GridSearchResults, ParamGrid};
use crate::domain::live::LiveSession;
use crate::domain::metrics::Metrics;
use crate::domain::price::PriceHistory;
use crate::domain::state_machine::Transition;
use crate::domain::strategy::StrategyKind;
use crate::ports::data_port::{DataPort, PriceFeed};
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "momtrader", about = "Momentum indicator backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Price CSV, overriding [data] path
        #[arg(short, long)]
        prices: Option<PathBuf>,
        /// Directory for series, trade and summary CSVs
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Grid search over strategy windows
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        prices: Option<PathBuf>,
        /// Number of ranked rows to print, overriding [grid] top
        #[arg(long)]
        top: Option<usize>,
        /// CSV file receiving every evaluated combination
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        sequential: bool,
    },
    /// Validate a configuration and its rules
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Follow a growing price CSV and trade each new row
    Watch {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        prices: Option<PathBuf>,
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
        /// Stop after this many polls (runs until killed otherwise)
        #[arg(long)]
        max_polls: Option<usize>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            prices,
            output,
        } => run_backtest(&config, prices.as_deref(), output.as_deref()),
        Command::Optimize {
            config,
            prices,
            top,
            output,
            sequential,
        } => run_optimize(&config, prices.as_deref(), top, output.as_deref(), sequential),
        Command::Validate { config } => run_validate(&config),
        Command::Watch {
            config,
            prices,
            interval_ms,
            max_polls,
        } => run_watch(
            &config,
            prices.as_deref(),
            Duration::from_millis(interval_ms),
            max_polls,
        ),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<AppConfig, MomtraderError> {
    tracing::info!(path = %path.display(), "loading config");
    let adapter = FileConfigAdapter::from_file(path)?;
    load_app_config(&adapter)
}

fn price_path(app: &AppConfig, prices: Option<&Path>) -> Result<PathBuf, MomtraderError> {
    prices
        .map(Path::to_path_buf)
        .or_else(|| app.data.path.as_ref().map(PathBuf::from))
        .ok_or_else(|| MomtraderError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        })
}

pub fn load_history(app: &AppConfig, prices: Option<&Path>) -> Result<PriceHistory, MomtraderError> {
    let adapter = CsvAdapter::new(price_path(app, prices)?).with_layout(CsvLayout::from(&app.data));
    adapter.fetch_prices(app.data.start_date)
}

fn run_backtest(
    config_path: &Path,
    prices: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), MomtraderError> {
    let app = load_config(config_path)?;
    let adapter =
        CsvAdapter::new(price_path(&app, prices)?).with_layout(CsvLayout::from(&app.data));
    let (result, metrics) = run_backtest_pipeline(&adapter, &app, output.is_some())?;

    print_summary(&result, &metrics);
    print_trades(&result);

    if let Some(dir) = output {
        CsvReportAdapter::new(dir).write_backtest(&result, &metrics)?;
        println!("\nReport written to: {}", dir.display());
    }
    Ok(())
}

/// Load prices from `data_port` and run the configured strategy over them.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    app: &AppConfig,
    record_series: bool,
) -> Result<(BacktestResult, Metrics), MomtraderError> {
    let strategy = app.strategy.build()?;
    let history = data_port.fetch_prices(app.data.start_date)?;

    tracing::info!(
        strategy = %strategy.name,
        points = history.len(),
        "running backtest"
    );
    let config = BacktestConfig {
        record_series,
        ..app.backtest.clone()
    };
    let result = run_single(&history, &strategy, &config)?;
    let metrics = Metrics::compute(&result);
    Ok((result, metrics))
}

fn preset_kind(app: &AppConfig) -> Result<StrategyKind, MomtraderError> {
    match &app.strategy.spec {
        StrategySpec::Preset(kind) => Ok(*kind),
        StrategySpec::Custom { .. } => Err(MomtraderError::InvalidParameters {
            reason: "custom rule strategies have no window parameters to optimize".into(),
        }),
    }
}

fn run_optimize(
    config_path: &Path,
    prices: Option<&Path>,
    top: Option<usize>,
    output: Option<&Path>,
    sequential: bool,
) -> Result<(), MomtraderError> {
    let app = load_config(config_path)?;
    let kind = preset_kind(&app)?;
    let history = load_history(&app, prices)?;

    let grid = if app.grid.grid == ParamGrid::default() && kind == StrategyKind::TrendReversal {
        ParamGrid::trend_reversal_default()
    } else {
        app.grid.grid.clone()
    };

    let results = GridSearch::new(kind, app.strategy.params.clone())
        .with_parallelism(app.grid.parallel && !sequential)
        .with_end_of_run(app.backtest.end_of_run)
        .run(&history, &grid)?;

    print_ranking(&results, top.unwrap_or(app.grid.top));

    if let Some(path) = output {
        CsvReportAdapter::new(path).write_grid(&results)?;
        println!("\nResults written to: {}", path.display());
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), MomtraderError> {
    let app = load_config(config_path)?;
    let strategy = app.strategy.build()?;

    println!("Strategy: {}", strategy.name);
    println!("  entry: {}", strategy.entry);
    println!("  exit:  {}", strategy.exit);
    if let Some(stop) = strategy.trailing_stop {
        println!("  trailing stop: {:.1}%", stop * 100.0);
    }

    let mut indicators: Vec<String> = strategy
        .tracked_indicators()
        .iter()
        .map(|i| i.to_string())
        .collect();
    indicators.sort();
    println!("\nIndicators to compute:");
    for ind in &indicators {
        println!("  {}", ind);
    }

    if let StrategySpec::Preset(_) = app.strategy.spec {
        println!("\nGrid combinations: {}", app.grid.grid.size());
    }
    println!("\nConfiguration is valid");
    Ok(())
}

fn run_watch(
    config_path: &Path,
    prices: Option<&Path>,
    interval: Duration,
    max_polls: Option<usize>,
) -> Result<(), MomtraderError> {
    let app = load_config(config_path)?;
    let strategy = app.strategy.build()?;
    let path = price_path(&app, prices)?;

    let mut feed = CsvTail::new(&path)
        .with_layout(CsvLayout::from(&app.data))
        .with_start_date(app.data.start_date);
    let mut session = LiveSession::new(&strategy);
    tracing::info!(path = %path.display(), strategy = %strategy.name, "watching price feed");

    let mut polls = 0usize;
    loop {
        let batch = feed.poll()?;
        if !batch.is_empty() {
            for report in session.push_all(batch)? {
                print_step(&report);
            }
        }

        polls += 1;
        if max_polls.is_some_and(|max| polls >= max) {
            break;
        }
        thread::sleep(interval);
    }

    let result = session.finish(app.backtest.end_of_run);
    let metrics = Metrics::compute(&result);
    print_summary(&result, &metrics);
    Ok(())
}

fn print_step(report: &StepReport) {
    match &report.transition {
        Transition::Entered(event) => {
            println!("{} {} at {:.4}", event.date, event.side, event.price);
        }
        Transition::Exited(trade) => {
            println!(
                "{} SELL at {:.4} ({}), pnl {:+.4}",
                trade.exit_date, trade.exit_price, trade.exit_reason, trade.pnl
            );
        }
        Transition::Warmup | Transition::Hold => {}
    }
}

fn print_summary(result: &BacktestResult, metrics: &Metrics) {
    println!("=== {} ===", result.strategy_name);
    println!("Final P&L:        {:.4}", metrics.final_pnl);
    println!("Trades:           {}", metrics.trade_count);
    println!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    println!("Profit Factor:    {:.2}", metrics.profit_factor);
    println!("Max Drawdown:     {:.4}", metrics.max_drawdown);
    match metrics.return_pct {
        Some(r) => println!("Strategy Return:  {:.2}%", r),
        None => println!("Strategy Return:  n/a (no position taken)"),
    }
    if let Some(r) = metrics.underlying_return_pct {
        println!("Underlying:       {:.2}%", r);
    }
    if let Some(open) = &result.open_position {
        println!(
            "Open position:    bought {} at {:.4}",
            open.entry_date, open.entry_price
        );
    }
}

fn print_trades(result: &BacktestResult) {
    if result.trades.is_empty() {
        return;
    }
    println!("\n=== Trades ===");
    for t in &result.trades {
        println!(
            "  {} -> {}  {:.4} -> {:.4}  {:+.4}  ({})",
            t.entry_date, t.exit_date, t.entry_price, t.exit_price, t.pnl, t.exit_reason
        );
    }
}

fn print_ranking(results: &GridSearchResults, top: usize) {
    println!(
        "Evaluated {} combinations ({} skipped){}",
        results.evaluated(),
        results.skipped,
        if results.cancelled { ", cancelled" } else { "" }
    );
    println!(
        "\n{:>4}  {:>4} {:>4} {:>5} {:>4} {:>5} {:>5} {:>6}  {:>12} {:>6}",
        "rank", "sma", "so", "trend", "rsi", "ema_s", "ema_l", "signal", "final_pnl", "trades"
    );
    for (rank, entry) in results.top(top).iter().enumerate() {
        let p = &entry.params;
        println!(
            "{:>4}  {:>4} {:>4} {:>5} {:>4} {:>5} {:>5} {:>6}  {:>12.4} {:>6}",
            rank + 1,
            p.sma_window,
            p.so_window,
            p.trend_window,
            p.rsi_window,
            p.ema_short,
            p.ema_long,
            p.signal_window,
            entry.final_pnl,
            entry.trade_count
        );
    }
}


//! CSV report writer.
//!
//! A backtest is written as a directory holding `series.csv` (one row per
//! processed point, one column per tracked indicator), `trades.csv` and
//! `summary.csv`. Grid search results go to a single file.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::MomtraderError;
use crate::domain::grid_search::GridSearchResults;
use crate::domain::metrics::Metrics;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const TRADE_HEADER: [&str; 7] = [
    "entry_date",
    "entry_price",
    "exit_date",
    "exit_price",
    "pnl",
    "holding_days",
    "exit_reason",
];

const GRID_HEADER: [&str; 10] = [
    "rank",
    "sma_window",
    "so_window",
    "trend_window",
    "rsi_window",
    "ema_short",
    "ema_long",
    "signal_window",
    "final_pnl",
    "trade_count",
];

#[derive(Debug, Serialize)]
struct TradeRow {
    entry_date: String,
    entry_price: f64,
    exit_date: String,
    exit_price: f64,
    pnl: f64,
    holding_days: i64,
    exit_reason: String,
}

#[derive(Debug, Serialize)]
struct GridRow {
    rank: usize,
    sma_window: usize,
    so_window: usize,
    trend_window: usize,
    rsi_window: usize,
    ema_short: usize,
    ema_long: usize,
    signal_window: usize,
    final_pnl: f64,
    trade_count: usize,
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> MomtraderError {
    MomtraderError::Io(std::io::Error::other(format!(
        "failed to write {}: {}",
        path.display(),
        e
    )))
}

/// Writer whose header is written up front, so an empty table still has one.
fn headed_writer(path: &Path, header: &[&str]) -> Result<csv::Writer<fs::File>, MomtraderError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| write_error(path, e))?;
    wtr.write_record(header).map_err(|e| write_error(path, e))?;
    Ok(wtr)
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_default()
}

pub struct CsvReportAdapter {
    path: PathBuf,
}

impl CsvReportAdapter {
    /// `path` is a directory for backtest reports and a file for grid
    /// results.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn write_series(&self, result: &BacktestResult, path: &Path) -> Result<(), MomtraderError> {
        let mut wtr = csv::Writer::from_path(path).map_err(|e| write_error(path, e))?;

        let mut header = vec![
            "date".to_string(),
            "price".to_string(),
            "position".to_string(),
            "running_pnl".to_string(),
        ];
        header.extend(result.indicators.iter().map(|s| s.indicator_type.to_string()));
        wtr.write_record(&header).map_err(|e| write_error(path, e))?;

        for (i, step) in result.steps.iter().enumerate() {
            let mut row = vec![
                step.date.to_string(),
                format!("{:.6}", step.price),
                step.position.to_string(),
                format!("{:.6}", step.running_pnl),
            ];
            row.extend(
                result
                    .indicators
                    .iter()
                    .map(|s| fmt_opt(s.values.get(i).copied().flatten())),
            );
            wtr.write_record(&row).map_err(|e| write_error(path, e))?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_trades(&self, result: &BacktestResult, path: &Path) -> Result<(), MomtraderError> {
        let mut wtr = headed_writer(path, &TRADE_HEADER)?;
        for t in &result.trades {
            wtr.serialize(TradeRow {
                entry_date: t.entry_date.to_string(),
                entry_price: t.entry_price,
                exit_date: t.exit_date.to_string(),
                exit_price: t.exit_price,
                pnl: t.pnl,
                holding_days: t.holding_days(),
                exit_reason: t.exit_reason.to_string(),
            })
            .map_err(|e| write_error(path, e))?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_summary(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
        path: &Path,
    ) -> Result<(), MomtraderError> {
        let mut wtr = csv::Writer::from_path(path).map_err(|e| write_error(path, e))?;
        let rows = [
            ("strategy", result.strategy_name.clone()),
            ("final_pnl", format!("{:.6}", metrics.final_pnl)),
            ("trade_count", metrics.trade_count.to_string()),
            ("trades_won", metrics.trades_won.to_string()),
            ("trades_lost", metrics.trades_lost.to_string()),
            ("win_rate", format!("{:.4}", metrics.win_rate)),
            ("profit_factor", format!("{:.4}", metrics.profit_factor)),
            ("max_drawdown", format!("{:.6}", metrics.max_drawdown)),
            ("total_buy", format!("{:.6}", metrics.total_buy)),
            ("total_sell", format!("{:.6}", metrics.total_sell)),
            ("return_pct", fmt_opt(metrics.return_pct)),
            ("underlying_return_pct", fmt_opt(metrics.underlying_return_pct)),
        ];
        wtr.write_record(["metric", "value"])
            .map_err(|e| write_error(path, e))?;
        for (name, value) in rows {
            wtr.write_record([name, value.as_str()])
                .map_err(|e| write_error(path, e))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_backtest(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
    ) -> Result<(), MomtraderError> {
        fs::create_dir_all(&self.path)?;
        self.write_series(result, &self.path.join("series.csv"))?;
        self.write_trades(result, &self.path.join("trades.csv"))?;
        self.write_summary(result, metrics, &self.path.join("summary.csv"))?;
        tracing::info!(dir = %self.path.display(), "backtest report written");
        Ok(())
    }

    fn write_grid(&self, results: &GridSearchResults) -> Result<(), MomtraderError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let path = self.path.as_path();
        let mut wtr = headed_writer(path, &GRID_HEADER)?;
        for (rank, entry) in results.entries.iter().enumerate() {
            let p = &entry.params;
            wtr.serialize(GridRow {
                rank: rank + 1,
                sma_window: p.sma_window,
                so_window: p.so_window,
                trend_window: p.trend_window,
                rsi_window: p.rsi_window,
                ema_short: p.ema_short,
                ema_long: p.ema_long,
                signal_window: p.signal_window,
                final_pnl: entry.final_pnl,
                trade_count: entry.trade_count,
            })
            .map_err(|e| write_error(path, e))?;
        }
        wtr.flush()?;
        tracing::info!(path = %path.display(), rows = results.entries.len(), "grid results written");
        Ok(())
    }
}

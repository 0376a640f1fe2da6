//! Parameter grid search.
//!
//! Runs one backtest per window combination of a [`ParamGrid`] and ranks the
//! results by final P&L. Evaluations are independent, so with the `parallel`
//! feature they fan out over rayon's pool and are collected before ranking.

use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::domain::backtest::{run_backtest, BacktestConfig, EndOfRun};
use crate::domain::error::MomtraderError;
use crate::domain::price::PriceHistory;
use crate::domain::strategy::{Strategy, StrategyKind, StrategyParameters};

/// Candidate values per sweepable window. An empty list keeps the base value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamGrid {
    pub sma_window: Vec<usize>,
    pub so_window: Vec<usize>,
    pub trend_window: Vec<usize>,
    pub rsi_window: Vec<usize>,
    pub ema_short: Vec<usize>,
    pub ema_long: Vec<usize>,
    pub signal_window: Vec<usize>,
}

impl ParamGrid {
    /// SMA 5..31 crossed with stochastic 5..25.
    pub fn trend_reversal_default() -> Self {
        Self {
            sma_window: (5..31).collect(),
            so_window: (5..25).collect(),
            ..Default::default()
        }
    }

    fn axis(values: &[usize], base: usize) -> Vec<usize> {
        if values.is_empty() {
            vec![base]
        } else {
            values.to_vec()
        }
    }

    /// Number of combinations before any filtering.
    pub fn size(&self) -> usize {
        [
            &self.sma_window,
            &self.so_window,
            &self.trend_window,
            &self.rsi_window,
            &self.ema_short,
            &self.ema_long,
            &self.signal_window,
        ]
        .iter()
        .map(|v| v.len().max(1))
        .product()
    }

    /// Every combination in enumeration order: `sma_window` varies slowest,
    /// `signal_window` fastest. Unswept fields come from `base`.
    pub fn combinations(&self, base: &StrategyParameters) -> Vec<StrategyParameters> {
        let mut out = Vec::with_capacity(self.size());

        for &sma in &Self::axis(&self.sma_window, base.sma_window) {
            for &so in &Self::axis(&self.so_window, base.so_window) {
                for &trend in &Self::axis(&self.trend_window, base.trend_window) {
                    for &rsi in &Self::axis(&self.rsi_window, base.rsi_window) {
                        for &short in &Self::axis(&self.ema_short, base.ema_short) {
                            for &long in &Self::axis(&self.ema_long, base.ema_long) {
                                for &signal in &Self::axis(&self.signal_window, base.signal_window)
                                {
                                    out.push(StrategyParameters {
                                        sma_window: sma,
                                        so_window: so,
                                        trend_window: trend,
                                        rsi_window: rsi,
                                        ema_short: short,
                                        ema_long: long,
                                        signal_window: signal,
                                        ..base.clone()
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }

        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridEntry {
    /// Position of the combination in enumeration order.
    pub index: usize,
    pub params: StrategyParameters,
    pub final_pnl: f64,
    pub trade_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct GridSearchResults {
    /// Ranked by descending final P&L; ties keep enumeration order.
    pub entries: Vec<GridEntry>,
    /// Combinations rejected by parameter validation or the filter.
    pub skipped: usize,
    pub cancelled: bool,
}

impl GridSearchResults {
    pub fn best(&self) -> Option<&GridEntry> {
        self.entries.first()
    }

    pub fn top(&self, n: usize) -> &[GridEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn evaluated(&self) -> usize {
        self.entries.len()
    }
}

type ParamFilter<'a> = Box<dyn Fn(&StrategyParameters) -> bool + Send + Sync + 'a>;

pub struct GridSearch<'a> {
    kind: StrategyKind,
    base: StrategyParameters,
    end_of_run: EndOfRun,
    parallel: bool,
    cancel: Option<&'a AtomicBool>,
    filter: Option<ParamFilter<'a>>,
}

enum Evaluation {
    Done(GridEntry),
    Skipped,
    Abandoned,
}

impl<'a> GridSearch<'a> {
    pub fn new(kind: StrategyKind, base: StrategyParameters) -> Self {
        Self {
            kind,
            base,
            end_of_run: EndOfRun::default(),
            parallel: cfg!(feature = "parallel"),
            cancel: None,
            filter: None,
        }
    }

    /// Ignored without the `parallel` feature.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_end_of_run(mut self, end_of_run: EndOfRun) -> Self {
        self.end_of_run = end_of_run;
        self
    }

    /// Combinations not yet started when `flag` is set are abandoned.
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Extra domain filter; combinations for which it returns `false` are
    /// skipped like invalid ones.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&StrategyParameters) -> bool + Send + Sync + 'a,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn run(
        &self,
        history: &PriceHistory,
        grid: &ParamGrid,
    ) -> Result<GridSearchResults, MomtraderError> {
        let combinations = grid.combinations(&self.base);
        tracing::info!(
            strategy = %self.kind,
            combinations = combinations.len(),
            points = history.len(),
            parallel = self.parallel,
            "grid search started"
        );

        let config = BacktestConfig {
            end_of_run: self.end_of_run,
            record_series: false,
        };
        let evaluate = |(index, params): (usize, &StrategyParameters)| {
            self.evaluate(history, &config, index, params)
        };

        #[cfg(feature = "parallel")]
        let evaluations: Vec<Evaluation> = if self.parallel {
            combinations
                .par_iter()
                .enumerate()
                .map(evaluate)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            combinations
                .iter()
                .enumerate()
                .map(evaluate)
                .collect::<Result<Vec<_>, _>>()?
        };

        #[cfg(not(feature = "parallel"))]
        let evaluations: Vec<Evaluation> = combinations
            .iter()
            .enumerate()
            .map(evaluate)
            .collect::<Result<Vec<_>, _>>()?;

        let mut results = GridSearchResults::default();
        for evaluation in evaluations {
            match evaluation {
                Evaluation::Done(entry) => results.entries.push(entry),
                Evaluation::Skipped => results.skipped += 1,
                Evaluation::Abandoned => results.cancelled = true,
            }
        }
        results
            .entries
            .sort_by(|a, b| b.final_pnl.total_cmp(&a.final_pnl));

        tracing::info!(
            evaluated = results.evaluated(),
            skipped = results.skipped,
            cancelled = results.cancelled,
            best_pnl = results.best().map(|e| e.final_pnl),
            "grid search finished"
        );
        Ok(results)
    }

    fn evaluate(
        &self,
        history: &PriceHistory,
        config: &BacktestConfig,
        index: usize,
        params: &StrategyParameters,
    ) -> Result<Evaluation, MomtraderError> {
        if self.cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
            return Ok(Evaluation::Abandoned);
        }
        if self.filter.as_ref().is_some_and(|keep| !keep(params)) {
            tracing::debug!(index, "combination rejected by filter");
            return Ok(Evaluation::Skipped);
        }

        let strategy = match Strategy::preset(self.kind, params) {
            Ok(strategy) => strategy,
            Err(MomtraderError::InvalidParameters { reason }) => {
                tracing::debug!(index, %reason, "skipping invalid combination");
                return Ok(Evaluation::Skipped);
            }
            Err(e) => return Err(e),
        };

        let result = run_backtest(history, &strategy, config)?;
        Ok(Evaluation::Done(GridEntry {
            index,
            params: params.clone(),
            final_pnl: result.final_pnl,
            trade_count: result.trade_count,
        }))
    }
}

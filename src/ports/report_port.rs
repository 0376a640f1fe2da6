//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::MomtraderError;
use crate::domain::grid_search::GridSearchResults;
use crate::domain::metrics::Metrics;

/// Port for persisting backtest and grid search output.
pub trait ReportPort {
    fn write_backtest(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
    ) -> Result<(), MomtraderError>;

    fn write_grid(&self, results: &GridSearchResults) -> Result<(), MomtraderError>;
}

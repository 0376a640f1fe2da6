//! Streaming session over a growing price feed.
//!
//! Points at or before the last processed date are skipped instead of being
//! fed again, so replaying an overlapping batch from a tailed source is safe.

use crate::domain::backtest::{BacktestResult, EndOfRun};
use crate::domain::engine::{Engine, StepReport};
use crate::domain::error::MomtraderError;
use crate::domain::price::PricePoint;
use crate::domain::strategy::Strategy;

#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    Processed(StepReport),
    /// Already seen (or older than the last processed point).
    Skipped,
}

#[derive(Debug, Clone)]
pub struct LiveSession {
    engine: Engine,
    skipped: usize,
}

impl LiveSession {
    pub fn new(strategy: &Strategy) -> Self {
        Self {
            engine: Engine::new(strategy, false),
            skipped: 0,
        }
    }

    pub fn push(&mut self, point: PricePoint) -> Result<PushOutcome, MomtraderError> {
        if self.engine.last_date().is_some_and(|last| point.date <= last) {
            self.skipped += 1;
            tracing::debug!(date = %point.date, "skipping already processed point");
            return Ok(PushOutcome::Skipped);
        }
        self.engine.advance(point).map(PushOutcome::Processed)
    }

    /// Push a batch, returning reports for the points actually processed.
    pub fn push_all<I>(&mut self, points: I) -> Result<Vec<StepReport>, MomtraderError>
    where
        I: IntoIterator<Item = PricePoint>,
    {
        let mut reports = Vec::new();
        for point in points {
            if let PushOutcome::Processed(report) = self.push(point)? {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn finish(self, end_of_run: EndOfRun) -> BacktestResult {
        self.engine.finish(end_of_run)
    }
}

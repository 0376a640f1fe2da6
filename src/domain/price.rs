//! Price records and the append-only price history.

use chrono::NaiveDate;

use crate::domain::error::MomtraderError;

/// One observation of the traded instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: Option<f64>,
    /// Raw return as supplied by the data source, if any.
    pub ret: Option<f64>,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            close,
            volume: None,
            ret: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_return(mut self, ret: f64) -> Self {
        self.ret = Some(ret);
        self
    }

    /// Return of this point relative to `prev_close`, preferring the
    /// supplied `ret` field.
    pub fn return_since(&self, prev_close: Option<f64>) -> Option<f64> {
        match (self.ret, prev_close) {
            (Some(r), _) if r.is_finite() => Some(r),
            (_, Some(prev)) if prev > 0.0 => Some(self.close / prev - 1.0),
            _ => None,
        }
    }

    pub(crate) fn check_price(&self) -> Result<(), MomtraderError> {
        if !self.close.is_finite() || self.close <= 0.0 {
            return Err(MomtraderError::InvalidPrice {
                date: self.date,
                price: self.close,
            });
        }
        Ok(())
    }
}

/// Coerce a textual return field into a number.
///
/// Decimal commas are rewritten to points first. Anything that still fails
/// to parse (blank, `C`, `B`, ...) yields `None`.
pub fn coerce_return(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Ordered, append-only sequence of price points with strictly increasing dates.
#[derive(Debug, Clone, Default)]
pub struct PriceHistory {
    points: Vec<PricePoint>,
    collapsed: usize,
}

impl PriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a history from points already in date order.
    ///
    /// A point sharing the date of its predecessor is dropped (first one
    /// wins). A point dated before its predecessor is rejected.
    pub fn from_points<I>(points: I) -> Result<Self, MomtraderError>
    where
        I: IntoIterator<Item = PricePoint>,
    {
        let mut history = Self::new();
        for point in points {
            history.push(point)?;
        }
        if history.collapsed > 0 {
            tracing::warn!(
                collapsed = history.collapsed,
                "collapsed duplicate price dates (kept first occurrence)"
            );
        }
        Ok(history)
    }

    /// Append a point. Returns `Ok(false)` when the point duplicates the
    /// last date and was collapsed.
    pub fn push(&mut self, point: PricePoint) -> Result<bool, MomtraderError> {
        point.check_price()?;
        if let Some(last) = self.points.last() {
            if point.date == last.date {
                self.collapsed += 1;
                return Ok(false);
            }
            if point.date < last.date {
                return Err(MomtraderError::NonMonotonic {
                    previous: last.date,
                    next: point.date,
                });
            }
        }
        self.points.push(point);
        Ok(true)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Number of duplicate-date points dropped while building.
    pub fn collapsed(&self) -> usize {
        self.collapsed
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }
}

//! Price data access port trait.

use chrono::NaiveDate;

use crate::domain::error::MomtraderError;
use crate::domain::price::{PriceHistory, PricePoint};

pub trait DataPort {
    /// Load every point dated on or after `start_date`, in date order.
    fn fetch_prices(&self, start_date: Option<NaiveDate>) -> Result<PriceHistory, MomtraderError>;
}

/// A source that keeps growing, read a batch at a time.
pub trait PriceFeed {
    /// Points that appeared since the previous poll. An empty batch means
    /// nothing new yet.
    fn poll(&mut self) -> Result<Vec<PricePoint>, MomtraderError>;
}

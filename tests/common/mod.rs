#![allow(dead_code)]

use chrono::NaiveDate;
use momtrader::domain::error::MomtraderError;
use momtrader::domain::price::{PriceHistory, PricePoint};
use momtrader::ports::data_port::DataPort;
use std::fs;
use std::path::{Path, PathBuf};

pub struct MockDataPort {
    pub points: Vec<PricePoint>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(points: Vec<PricePoint>) -> Self {
        Self {
            points,
            error: None,
        }
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(&self, start_date: Option<NaiveDate>) -> Result<PriceHistory, MomtraderError> {
        if let Some(reason) = &self.error {
            return Err(MomtraderError::DataFormat {
                reason: reason.clone(),
            });
        }
        PriceHistory::from_points(
            self.points
                .iter()
                .filter(|p| start_date.is_none_or(|start| p.date >= start))
                .cloned(),
        )
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_points(prices: &[f64]) -> Vec<PricePoint> {
    let start = date(2022, 1, 3);
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| PricePoint::new(start + chrono::Days::new(i as u64), p))
        .collect()
}

pub fn make_history(prices: &[f64]) -> PriceHistory {
    PriceHistory::from_points(make_points(prices)).unwrap()
}

/// Smooth oscillation on a slow drift, long enough to warm up every
/// default window and cross thresholds several times.
pub fn wave(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let t = i as f64;
            100.0 + (t * 0.21).sin() * 8.0 + (t * 0.05).cos() * 3.0 + t * 0.03
        })
        .collect()
}

pub fn write_prices_csv(dir: &Path, name: &str, prices: &[f64]) -> PathBuf {
    let mut content = String::from("date,PRC,VOL,RET\n");
    let mut prev: Option<f64> = None;
    for p in make_points(prices) {
        let ret = prev
            .map(|q| format!("\"{}\"", format!("{:.6}", p.close / q - 1.0).replace('.', ",")))
            .unwrap_or_default();
        content.push_str(&format!("{},{:.4},1000,{}\n", p.date, p.close, ret));
        prev = Some(p.close);
    }
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

pub fn write_ini(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("momtrader.ini");
    fs::write(&path, content).unwrap();
    path
}

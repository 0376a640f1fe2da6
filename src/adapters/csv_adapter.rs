//! CSV price data adapter.
//!
//! Columns are located by header name, so exports with extra columns
//! (ticker, bid/ask, ...) load without preprocessing.

use crate::domain::config_validation::DataSettings;
use crate::domain::error::MomtraderError;
use crate::domain::price::{coerce_return, PriceHistory, PricePoint};
use crate::ports::data_port::{DataPort, PriceFeed};
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Header names of the columns a price file is read from.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvLayout {
    pub date: String,
    pub price: String,
    pub volume: String,
    pub ret: String,
}

impl Default for CsvLayout {
    fn default() -> Self {
        Self {
            date: "date".into(),
            price: "PRC".into(),
            volume: "VOL".into(),
            ret: "RET".into(),
        }
    }
}

impl From<&DataSettings> for CsvLayout {
    fn from(settings: &DataSettings) -> Self {
        Self {
            date: settings.date_column.clone(),
            price: settings.price_column.clone(),
            volume: settings.volume_column.clone(),
            ret: settings.return_column.clone(),
        }
    }
}

/// Column positions resolved against a header row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    date: usize,
    price: usize,
    volume: Option<usize>,
    ret: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord, layout: &CsvLayout) -> Result<Self, MomtraderError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let required = |name: &str| {
            find(name).ok_or_else(|| MomtraderError::DataFormat {
                reason: format!("missing column '{}'", name),
            })
        };
        Ok(Self {
            date: required(&layout.date)?,
            price: required(&layout.price)?,
            volume: find(&layout.volume),
            ret: find(&layout.ret),
        })
    }
}

/// Outcome of reading one data row.
struct ParsedRow {
    point: PricePoint,
    return_coerced: bool,
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .ok()
}

fn parse_row(
    record: &csv::StringRecord,
    columns: Columns,
    line: u64,
) -> Result<ParsedRow, MomtraderError> {
    let field = |idx: usize| record.get(idx).unwrap_or("").trim();

    let date = parse_date(field(columns.date)).ok_or_else(|| MomtraderError::DataFormat {
        reason: format!("line {}: invalid date '{}'", line, field(columns.date)),
    })?;

    let price: f64 = field(columns.price)
        .replace(',', ".")
        .parse()
        .map_err(|_| MomtraderError::DataFormat {
            reason: format!("line {}: invalid price '{}'", line, field(columns.price)),
        })?;

    let volume = columns
        .volume
        .and_then(|idx| field(idx).replace(',', ".").parse::<f64>().ok());

    let (ret, return_coerced) = match columns.ret {
        None => (None, false),
        Some(idx) => {
            let raw = field(idx);
            let ret = coerce_return(raw);
            (ret, ret.is_none() && !raw.is_empty())
        }
    };

    let mut point = PricePoint::new(date, price);
    point.volume = volume;
    point.ret = ret;
    Ok(ParsedRow {
        point,
        return_coerced,
    })
}

fn csv_error(e: csv::Error) -> MomtraderError {
    MomtraderError::DataFormat {
        reason: format!("CSV parse error: {}", e),
    }
}

/// Whole-file price source.
pub struct CsvAdapter {
    path: PathBuf,
    layout: CsvLayout,
}

impl CsvAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            layout: CsvLayout::default(),
        }
    }

    pub fn with_layout(mut self, layout: CsvLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataPort for CsvAdapter {
    fn fetch_prices(&self, start_date: Option<NaiveDate>) -> Result<PriceHistory, MomtraderError> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            io::Error::new(e.kind(), format!("failed to read {}: {}", self.path.display(), e))
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let columns = Columns::resolve(rdr.headers().map_err(csv_error)?, &self.layout)?;

        let mut points = Vec::new();
        let mut coerced = 0usize;
        for (i, result) in rdr.records().enumerate() {
            let record = result.map_err(csv_error)?;
            let row = parse_row(&record, columns, i as u64 + 2)?;
            if start_date.is_some_and(|start| row.point.date < start) {
                continue;
            }
            if row.return_coerced {
                coerced += 1;
            }
            points.push(row.point);
        }

        if coerced > 0 {
            tracing::warn!(rows = coerced, "unparsable return values treated as missing");
        }
        if points.is_empty() {
            return Err(MomtraderError::NoData {
                source_name: self.path.display().to_string(),
            });
        }

        // stable: the first row of a duplicated date stays first
        points.sort_by_key(|p| p.date);
        let history = PriceHistory::from_points(points)?;
        tracing::info!(
            path = %self.path.display(),
            points = history.len(),
            "price history loaded"
        );
        Ok(history)
    }
}

/// Incremental reader over a CSV file that another process appends to.
///
/// Each poll returns only rows past the ones already consumed. A final line
/// without its newline is treated as still being written and left for the
/// next poll.
pub struct CsvTail {
    path: PathBuf,
    layout: CsvLayout,
    start_date: Option<NaiveDate>,
    consumed: usize,
}

impl CsvTail {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            layout: CsvLayout::default(),
            start_date: None,
            consumed: 0,
        }
    }

    pub fn with_layout(mut self, layout: CsvLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_start_date(mut self, start_date: Option<NaiveDate>) -> Self {
        self.start_date = start_date;
        self
    }

    /// Data rows read so far, including ones filtered by start date.
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

impl PriceFeed for CsvTail {
    fn poll(&mut self) -> Result<Vec<PricePoint>, MomtraderError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "feed file not created yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let complete = match content.rfind('\n') {
            Some(end) => &content[..=end],
            None => return Ok(Vec::new()),
        };

        let mut rdr = csv::Reader::from_reader(complete.as_bytes());
        let columns = Columns::resolve(rdr.headers().map_err(csv_error)?, &self.layout)?;

        let mut points = Vec::new();
        for (i, result) in rdr.records().enumerate().skip(self.consumed) {
            let record = result.map_err(csv_error)?;
            let row = parse_row(&record, columns, i as u64 + 2)?;
            self.consumed = i + 1;
            if row.return_coerced {
                tracing::warn!(date = %row.point.date, "unparsable return value treated as missing");
            }
            if self.start_date.is_some_and(|start| row.point.date < start) {
                continue;
            }
            points.push(row.point);
        }
        Ok(points)
    }
}

//! Incremental indicator tracker.
//!
//! Advances every requested indicator by one price point at a time.
//! Windowed indicators (SMA, RSI, stochastic, volatility, slope) are
//! recomputed from bounded trailing buffers; EMA and the MACD signal line
//! carry O(1) recursive state. Derived indicators are evaluated after the
//! indicators they read, so a single pass per point suffices.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::domain::indicator::{
    ema_step, histogram, macd_line, rsi, sample_stddev, signal_step, slope, sma, stochastic,
    IndicatorSeries, IndicatorType,
};
use crate::domain::price::PricePoint;

/// Indicator values defined at the current step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorFrame {
    values: HashMap<IndicatorType, f64>,
}

impl IndicatorFrame {
    pub fn get(&self, indicator: &IndicatorType) -> Option<f64> {
        self.values.get(indicator).copied()
    }

    pub fn is_defined(&self, indicator: &IndicatorType) -> bool {
        self.values.contains_key(indicator)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn set(&mut self, indicator: &IndicatorType, value: Option<f64>) {
        if let Some(v) = value {
            self.values.insert(indicator.clone(), v);
        }
    }
}

#[derive(Debug, Clone)]
enum SlotState {
    Stateless,
    Recursive(Option<f64>),
    Window(VecDeque<Option<f64>>),
}

#[derive(Debug, Clone)]
struct Slot {
    indicator: IndicatorType,
    state: SlotState,
}

#[derive(Debug, Clone)]
pub struct IndicatorTracker {
    slots: Vec<Slot>,
    prices: VecDeque<f64>,
    returns: VecDeque<f64>,
    price_capacity: usize,
    return_capacity: usize,
    last_close: Option<f64>,
    processed: usize,
    series: Option<Vec<IndicatorSeries>>,
    frame: IndicatorFrame,
}

impl IndicatorTracker {
    /// Track `indicators` plus everything they derive from.
    ///
    /// With `record_series` the full per-step series is retained for
    /// inspection; without it only the current frame is kept.
    pub fn new(indicators: &[IndicatorType], record_series: bool) -> Self {
        let ordered = resolve_order(indicators);
        let price_capacity = ordered.iter().map(|i| i.price_lookback()).max().unwrap_or(0);
        let return_capacity = ordered.iter().map(|i| i.return_lookback()).max().unwrap_or(0);

        let series = record_series.then(|| {
            ordered
                .iter()
                .map(|i| IndicatorSeries::new(i.clone()))
                .collect()
        });

        let slots = ordered
            .into_iter()
            .map(|indicator| {
                let state = match &indicator {
                    IndicatorType::Ema(_) | IndicatorType::MacdSignal { .. } => {
                        SlotState::Recursive(None)
                    }
                    IndicatorType::Slope { window, .. } => {
                        SlotState::Window(VecDeque::with_capacity(*window))
                    }
                    _ => SlotState::Stateless,
                };
                Slot { indicator, state }
            })
            .collect();

        Self {
            slots,
            prices: VecDeque::with_capacity(price_capacity),
            returns: VecDeque::with_capacity(return_capacity),
            price_capacity,
            return_capacity,
            last_close: None,
            processed: 0,
            series,
            frame: IndicatorFrame::default(),
        }
    }

    /// Feed the next point and return the indicator values at that point.
    pub fn update(&mut self, point: &PricePoint) -> &IndicatorFrame {
        push_capped(&mut self.prices, point.close, self.price_capacity);
        if let Some(r) = point.return_since(self.last_close) {
            push_capped(&mut self.returns, r, self.return_capacity);
        }
        self.last_close = Some(point.close);
        self.processed += 1;

        let prices: &[f64] = self.prices.make_contiguous();
        let returns: &[f64] = self.returns.make_contiguous();
        let mut frame = IndicatorFrame::default();

        for slot in &mut self.slots {
            let value = match (&slot.indicator, &mut slot.state) {
                (IndicatorType::Sma(n), _) => sma(prices, *n),
                (IndicatorType::Rsi(n), _) => rsi(prices, *n),
                (IndicatorType::Stochastic(n), _) => stochastic(prices, *n),
                (IndicatorType::Volatility(n), _) => sample_stddev(returns, *n),
                (IndicatorType::Ema(n), SlotState::Recursive(prev)) => {
                    let next = match *prev {
                        Some(p) => Some(ema_step(p, point.close, *n)),
                        None if self.processed == *n => sma(prices, *n),
                        None => None,
                    };
                    *prev = next;
                    next
                }
                (IndicatorType::Macd { fast, slow }, _) => macd_line(
                    frame.get(&IndicatorType::Ema(*fast)),
                    frame.get(&IndicatorType::Ema(*slow)),
                ),
                (IndicatorType::MacdSignal { fast, slow, signal }, SlotState::Recursive(prev)) => {
                    let macd = frame.get(&IndicatorType::Macd {
                        fast: *fast,
                        slow: *slow,
                    });
                    let next = signal_step(*prev, macd, *signal);
                    *prev = next;
                    next
                }
                (IndicatorType::MacdHistogram { fast, slow, signal }, _) => {
                    let macd = frame.get(&IndicatorType::Macd {
                        fast: *fast,
                        slow: *slow,
                    });
                    let sig = frame.get(&IndicatorType::MacdSignal {
                        fast: *fast,
                        slow: *slow,
                        signal: *signal,
                    });
                    Some(histogram(macd, sig))
                }
                (IndicatorType::Slope { source, window }, SlotState::Window(buffer)) => {
                    push_capped(buffer, frame.get(source), *window);
                    slope(buffer.make_contiguous(), *window)
                }
                _ => None,
            };
            frame.set(&slot.indicator, value);
        }

        if let Some(series) = self.series.as_mut() {
            for s in series.iter_mut() {
                s.push(frame.get(&s.indicator_type));
            }
        }

        self.frame = frame;
        &self.frame
    }

    pub fn frame(&self) -> &IndicatorFrame {
        &self.frame
    }

    /// Number of points fed so far.
    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Every tracked indicator, dependencies before dependents.
    pub fn indicators(&self) -> impl Iterator<Item = &IndicatorType> {
        self.slots.iter().map(|s| &s.indicator)
    }

    pub fn series(&self) -> Option<&[IndicatorSeries]> {
        self.series.as_deref()
    }

    pub fn into_series(self) -> Vec<IndicatorSeries> {
        self.series.unwrap_or_default()
    }
}

fn push_capped<T>(buffer: &mut VecDeque<T>, value: T, capacity: usize) {
    if capacity == 0 {
        return;
    }
    if buffer.len() == capacity {
        buffer.pop_front();
    }
    buffer.push_back(value);
}

/// Expand dependencies and order them so every indicator follows its inputs.
fn resolve_order(indicators: &[IndicatorType]) -> Vec<IndicatorType> {
    fn visit(
        indicator: &IndicatorType,
        seen: &mut HashSet<IndicatorType>,
        out: &mut Vec<IndicatorType>,
    ) {
        if seen.contains(indicator) {
            return;
        }
        for dep in indicator.dependencies() {
            visit(&dep, seen, out);
        }
        seen.insert(indicator.clone());
        out.push(indicator.clone());
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for indicator in indicators {
        visit(indicator, &mut seen, &mut out);
    }
    out
}

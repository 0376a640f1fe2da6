//! Rule evaluation.
//!
//! Evaluates rules against the current price point and its indicator frame,
//! plus the previous step for crossing rules.
//!
//! # Evaluation Semantics
//!
//! - Undefined operands (indicator not yet defined, missing volume/return)
//!   resolve to NaN, so any comparison involving them is `false`
//! - `CROSS_ABOVE`/`CROSS_BELOW`: `false` without a previous step
//! - `AND`: Short-circuits on first `false`
//! - `OR`: Short-circuits on first `true`

use crate::domain::indicator::IndicatorType;
use crate::domain::price::PricePoint;
use crate::domain::rule::{Operand, Rule};
use crate::domain::tracker::IndicatorFrame;

/// A price point together with the indicator values computed at it.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub point: &'a PricePoint,
    pub frame: &'a IndicatorFrame,
}

#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub current: Snapshot<'a>,
    pub previous: Option<Snapshot<'a>>,
}

impl<'a> EvalContext<'a> {
    pub fn new(point: &'a PricePoint, frame: &'a IndicatorFrame) -> Self {
        Self {
            current: Snapshot { point, frame },
            previous: None,
        }
    }

    pub fn with_previous(mut self, point: &'a PricePoint, frame: &'a IndicatorFrame) -> Self {
        self.previous = Some(Snapshot { point, frame });
        self
    }

    /// True when every listed indicator has a value at the current step.
    pub fn all_defined(&self, indicators: &[IndicatorType]) -> bool {
        indicators.iter().all(|i| self.current.frame.is_defined(i))
    }
}

pub fn evaluate(rule: &Rule, ctx: &EvalContext<'_>) -> bool {
    match rule {
        Rule::Always => true,
        Rule::CrossAbove { left, right } => {
            let Some(prev) = ctx.previous else {
                return false;
            };
            let left_curr = resolve_operand(left, &ctx.current);
            let right_curr = resolve_operand(right, &ctx.current);
            let left_prev = resolve_operand(left, &prev);
            let right_prev = resolve_operand(right, &prev);

            left_curr > right_curr && left_prev <= right_prev
        }
        Rule::CrossBelow { left, right } => {
            let Some(prev) = ctx.previous else {
                return false;
            };
            let left_curr = resolve_operand(left, &ctx.current);
            let right_curr = resolve_operand(right, &ctx.current);
            let left_prev = resolve_operand(left, &prev);
            let right_prev = resolve_operand(right, &prev);

            left_curr < right_curr && left_prev >= right_prev
        }
        Rule::Above { left, right } => {
            resolve_operand(left, &ctx.current) > resolve_operand(right, &ctx.current)
        }
        Rule::Below { left, right } => {
            resolve_operand(left, &ctx.current) < resolve_operand(right, &ctx.current)
        }
        Rule::Between {
            operand,
            lower,
            upper,
        } => {
            let val = resolve_operand(operand, &ctx.current);
            val >= *lower && val <= *upper
        }
        Rule::And(rules) => rules.iter().all(|r| evaluate(r, ctx)),
        Rule::Or(rules) => rules.iter().any(|r| evaluate(r, ctx)),
        Rule::Not(rule) => !evaluate(rule, ctx),
    }
}

fn resolve_operand(operand: &Operand, snapshot: &Snapshot<'_>) -> f64 {
    match operand {
        Operand::Price => snapshot.point.close,
        Operand::Volume => snapshot.point.volume.unwrap_or(f64::NAN),
        Operand::Return => snapshot.point.ret.unwrap_or(f64::NAN),
        Operand::Constant(v) => *v,
        Operand::Indicator(t) => snapshot.frame.get(t).unwrap_or(f64::NAN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule_parser::parse;
    use crate::domain::tracker::IndicatorTracker;
    use chrono::NaiveDate;

    fn point(day: u32, close: f64) -> PricePoint {
        PricePoint::new(NaiveDate::from_ymd_opt(2024, 1, day).unwrap(), close)
    }

    /// Run a tracker over `prices` and return (point, frame) per step.
    fn frames(rule: &Rule, prices: &[f64]) -> Vec<(PricePoint, IndicatorFrame)> {
        let indicators = crate::domain::rule::extract_indicators(rule);
        let mut tracker = IndicatorTracker::new(&indicators, false);
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let pt = point(i as u32 + 1, p);
                let frame = tracker.update(&pt).clone();
                (pt, frame)
            })
            .collect()
    }

    fn eval_all(text: &str, prices: &[f64]) -> Vec<bool> {
        let rule = parse(text).unwrap();
        let steps = frames(&rule, prices);
        (0..steps.len())
            .map(|i| {
                let mut ctx = EvalContext::new(&steps[i].0, &steps[i].1);
                if i > 0 {
                    ctx = ctx.with_previous(&steps[i - 1].0, &steps[i - 1].1);
                }
                evaluate(&rule, &ctx)
            })
            .collect()
    }

    #[test]
    fn above_undefined_indicator_is_false() {
        let result = eval_all("ABOVE(price, SMA(5))", &[10.0, 10.0, 10.0, 10.0, 10.0, 20.0]);
        assert_eq!(result, vec![false, false, false, false, false, true]);
    }

    #[test]
    fn below_constant() {
        let result = eval_all("BELOW(price, 11)", &[10.0, 12.0]);
        assert_eq!(result, vec![true, false]);
    }

    #[test]
    fn cross_above_requires_previous_step() {
        let result = eval_all("CROSS_ABOVE(price, 10)", &[11.0, 9.0, 12.0, 13.0]);
        assert_eq!(result, vec![false, false, true, false]);
    }

    #[test]
    fn cross_below_detects_transition() {
        let result = eval_all("CROSS_BELOW(price, SMA(2))", &[10.0, 12.0, 13.0, 11.0, 10.0]);
        // SMA(2): -, 11, 12.5, 12, 10.5
        assert_eq!(result, vec![false, false, false, true, false]);
    }

    #[test]
    fn between_is_inclusive() {
        let result = eval_all("BETWEEN(price, 10, 20)", &[10.0, 20.0, 20.5, 9.99]);
        assert_eq!(result, vec![true, true, false, false]);
    }

    #[test]
    fn composites() {
        assert_eq!(
            eval_all("AND(ABOVE(price, 5), BELOW(price, 15))", &[4.0, 10.0, 16.0]),
            vec![false, true, false]
        );
        assert_eq!(
            eval_all("OR(BELOW(price, 5), ABOVE(price, 15))", &[4.0, 10.0, 16.0]),
            vec![true, false, true]
        );
        assert_eq!(eval_all("NOT(ALWAYS)", &[1.0]), vec![false]);
    }

    #[test]
    fn not_of_undefined_comparison_is_true() {
        assert_eq!(eval_all("NOT(ABOVE(price, SMA(3)))", &[1.0]), vec![true]);
    }

    #[test]
    fn missing_volume_and_return_never_compare() {
        let pt = point(1, 10.0);
        let frame = IndicatorFrame::default();
        let ctx = EvalContext::new(&pt, &frame);
        assert!(!evaluate(&parse("ABOVE(volume, 0)").unwrap(), &ctx));
        assert!(!evaluate(&parse("BELOW(volume, 0)").unwrap(), &ctx));
        assert!(!evaluate(&parse("ABOVE(return, -1)").unwrap(), &ctx));
    }

    #[test]
    fn present_volume_and_return() {
        let pt = point(1, 10.0).with_volume(5000.0).with_return(0.02);
        let frame = IndicatorFrame::default();
        let ctx = EvalContext::new(&pt, &frame);
        assert!(evaluate(&parse("ABOVE(volume, 1000)").unwrap(), &ctx));
        assert!(evaluate(&parse("BETWEEN(return, 0.01, 0.03)").unwrap(), &ctx));
    }

    #[test]
    fn all_defined_checks_current_frame() {
        let rule = parse("ABOVE(price, SMA(2))").unwrap();
        let steps = frames(&rule, &[1.0, 2.0]);
        let wanted = [IndicatorType::Sma(2)];
        assert!(!EvalContext::new(&steps[0].0, &steps[0].1).all_defined(&wanted));
        assert!(EvalContext::new(&steps[1].0, &steps[1].1).all_defined(&wanted));
        assert!(EvalContext::new(&steps[0].0, &steps[0].1).all_defined(&[]));
    }
}

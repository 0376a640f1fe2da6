//! Rule AST data structures.
//!
//! Entry and exit predicates are expressed as a small rule tree:
//! - `Operand`: what can be compared (price fields, constants, indicators)
//! - `Rule`: comparison, crossing and composite variants
//!
//! `Display` renders a rule back into the text form accepted by
//! [`crate::domain::rule_parser::parse`].

use std::fmt;

use crate::domain::indicator::IndicatorType;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Price,
    Volume,
    Return,
    Constant(f64),
    Indicator(IndicatorType),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Always true; stands in for a disabled guard.
    Always,
    CrossAbove {
        left: Operand,
        right: Operand,
    },
    CrossBelow {
        left: Operand,
        right: Operand,
    },
    Above {
        left: Operand,
        right: Operand,
    },
    Below {
        left: Operand,
        right: Operand,
    },
    /// Inclusive on both bounds.
    Between {
        operand: Operand,
        lower: f64,
        upper: f64,
    },
    And(Vec<Rule>),
    Or(Vec<Rule>),
    Not(Box<Rule>),
}

impl Rule {
    pub fn above(left: Operand, right: Operand) -> Self {
        Rule::Above { left, right }
    }

    pub fn below(left: Operand, right: Operand) -> Self {
        Rule::Below { left, right }
    }
}

impl Operand {
    pub fn indicator(indicator_type: IndicatorType) -> Self {
        Operand::Indicator(indicator_type)
    }
}

/// Every indicator a rule reads, in first-seen order without duplicates.
pub fn extract_indicators(rule: &Rule) -> Vec<IndicatorType> {
    fn from_operand(operand: &Operand, out: &mut Vec<IndicatorType>) {
        if let Operand::Indicator(t) = operand {
            if !out.contains(t) {
                out.push(t.clone());
            }
        }
    }

    fn walk(rule: &Rule, out: &mut Vec<IndicatorType>) {
        match rule {
            Rule::Always => {}
            Rule::CrossAbove { left, right }
            | Rule::CrossBelow { left, right }
            | Rule::Above { left, right }
            | Rule::Below { left, right } => {
                from_operand(left, out);
                from_operand(right, out);
            }
            Rule::Between { operand, .. } => from_operand(operand, out),
            Rule::And(rules) | Rule::Or(rules) => {
                for r in rules {
                    walk(r, out);
                }
            }
            Rule::Not(inner) => walk(inner, out),
        }
    }

    let mut out = Vec::new();
    walk(rule, &mut out);
    out
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Price => write!(f, "price"),
            Operand::Volume => write!(f, "volume"),
            Operand::Return => write!(f, "return"),
            Operand::Constant(v) => write!(f, "{}", v),
            Operand::Indicator(t) => write!(f, "{}", t),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, name: &str, rules: &[Rule]) -> fmt::Result {
            write!(f, "{}(", name)?;
            for (i, r) in rules.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", r)?;
            }
            write!(f, ")")
        }

        match self {
            Rule::Always => write!(f, "ALWAYS"),
            Rule::CrossAbove { left, right } => write!(f, "CROSS_ABOVE({}, {})", left, right),
            Rule::CrossBelow { left, right } => write!(f, "CROSS_BELOW({}, {})", left, right),
            Rule::Above { left, right } => write!(f, "ABOVE({}, {})", left, right),
            Rule::Below { left, right } => write!(f, "BELOW({}, {})", left, right),
            Rule::Between {
                operand,
                lower,
                upper,
            } => write!(f, "BETWEEN({}, {}, {})", operand, lower, upper),
            Rule::And(rules) => list(f, "AND", rules),
            Rule::Or(rules) => list(f, "OR", rules),
            Rule::Not(inner) => write!(f, "NOT({})", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sma(n: usize) -> Operand {
        Operand::Indicator(IndicatorType::Sma(n))
    }

    #[test]
    fn extract_from_nested_rule() {
        let rule = Rule::And(vec![
            Rule::above(Operand::Price, sma(5)),
            Rule::Or(vec![
                Rule::below(Operand::Indicator(IndicatorType::Rsi(14)), Operand::Constant(30.0)),
                Rule::Not(Box::new(Rule::above(sma(5), sma(20)))),
            ]),
        ]);
        assert_eq!(
            extract_indicators(&rule),
            vec![
                IndicatorType::Sma(5),
                IndicatorType::Rsi(14),
                IndicatorType::Sma(20)
            ]
        );
    }

    #[test]
    fn extract_from_always_is_empty() {
        assert!(extract_indicators(&Rule::Always).is_empty());
    }

    #[test]
    fn extract_between() {
        let rule = Rule::Between {
            operand: Operand::Indicator(IndicatorType::Stochastic(6)),
            lower: 0.0,
            upper: 20.0,
        };
        assert_eq!(extract_indicators(&rule), vec![IndicatorType::Stochastic(6)]);
    }

    #[test]
    fn display_renders_dsl() {
        let rule = Rule::And(vec![
            Rule::above(Operand::Price, sma(5)),
            Rule::Between {
                operand: Operand::Indicator(IndicatorType::Rsi(13)),
                lower: 0.0,
                upper: 40.0,
            },
        ]);
        assert_eq!(
            rule.to_string(),
            "AND(ABOVE(price, SMA(5)), BETWEEN(RSI(13), 0, 40))"
        );
    }

    #[test]
    fn display_slope_operand() {
        let op = Operand::Indicator(IndicatorType::slope_of(IndicatorType::Sma(26), 4));
        assert_eq!(op.to_string(), "SLOPE(SMA(26),4)");
    }
}

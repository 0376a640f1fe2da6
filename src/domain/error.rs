//! Domain error types.

use chrono::NaiveDate;

/// A parse error with position information for rule parsing.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for momtrader.
#[derive(Debug, thiserror::Error)]
pub enum MomtraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    RuleParse(#[from] ParseError),

    #[error("invalid rule: {reason}")]
    RuleInvalid { reason: String },

    #[error("invalid strategy parameters: {reason}")]
    InvalidParameters { reason: String },

    #[error("malformed price data: {reason}")]
    DataFormat { reason: String },

    #[error("no price data in {source_name}")]
    NoData { source_name: String },

    #[error("price dates must be strictly increasing: {next} follows {previous}")]
    NonMonotonic {
        previous: NaiveDate,
        next: NaiveDate,
    },

    #[error("invalid close price {price} on {date}")]
    InvalidPrice { date: NaiveDate, price: f64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&MomtraderError> for std::process::ExitCode {
    fn from(err: &MomtraderError) -> Self {
        let code: u8 = match err {
            MomtraderError::Io(_) => 1,
            MomtraderError::ConfigParse { .. }
            | MomtraderError::ConfigMissing { .. }
            | MomtraderError::ConfigInvalid { .. } => 2,
            MomtraderError::DataFormat { .. }
            | MomtraderError::NoData { .. }
            | MomtraderError::NonMonotonic { .. }
            | MomtraderError::InvalidPrice { .. } => 3,
            MomtraderError::RuleParse(_) | MomtraderError::RuleInvalid { .. } => 4,
            MomtraderError::InvalidParameters { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_context_points_at_offset() {
        let err = ParseError {
            message: "expected ')'".into(),
            position: 4,
        };
        let rendered = err.display_with_context("SMA(5");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "SMA(5");
        assert_eq!(lines[1], "    ^");
        assert!(lines[2].contains("position 4"));
    }

    #[test]
    fn non_monotonic_message_names_both_dates() {
        let err = MomtraderError::NonMonotonic {
            previous: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            next: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains("2024-01-02"));
        assert!(msg.contains("2024-01-01"));
    }

    #[test]
    fn parse_error_converts_into_rule_parse() {
        let err: MomtraderError = ParseError {
            message: "boom".into(),
            position: 0,
        }
        .into();
        assert!(matches!(err, MomtraderError::RuleParse(_)));
    }
}

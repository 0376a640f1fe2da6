//! Rule DSL parser.
//!
//! Recursive descent parser for the rule grammar. Converts text to AST with
//! meaningful error messages including character offset, expected/found tokens.
//!
//! ```text
//! rule     := ALWAYS
//!           | (ABOVE | BELOW | CROSS_ABOVE | CROSS_BELOW) '(' operand ',' operand ')'
//!           | BETWEEN '(' operand ',' number ',' number ')'
//!           | (AND | OR) '(' rule (',' rule)+ ')'
//!           | NOT '(' rule ')'
//! operand  := number | price | close | volume | return | indicator
//! indicator:= SMA(n) | EMA(n) | RSI(n) | STOCH(n) | VOL(n)
//!           | MACD(f,s) | MACD_SIGNAL(f,s,g) | MACD_HIST(f,s,g)
//!           | SLOPE(indicator, w)
//! ```

use crate::domain::error::ParseError;
use crate::domain::indicator::IndicatorType;
use crate::domain::rule::{Operand, Rule};

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: String) -> ParseError {
        ParseError {
            message,
            position: self.pos,
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected '{}', found '{}'", expected, ch))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        let remaining = self.remaining();
        remaining.starts_with(keyword)
            && !remaining[keyword.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_')
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn peek_word(&self) -> String {
        let word: String = self
            .remaining()
            .chars()
            .take_while(|ch| ch.is_alphanumeric() || *ch == '_')
            .collect();
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }

    fn parse_integer(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.advance();
        }

        if start == self.pos {
            return Err(ParseError {
                message: "expected integer".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<usize>().map_err(|_| ParseError {
            message: format!("invalid integer: {}", num_str),
            position: start,
        })
    }

    fn consume_exact(&mut self, s: &str) -> bool {
        if self.remaining().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    /// `n)` after an already consumed `NAME(`.
    fn parse_period(&mut self) -> Result<usize, ParseError> {
        let period = self.parse_integer()?;
        self.expect_char(')')?;
        Ok(period)
    }

    fn parse_macd_params(&mut self, with_signal: bool) -> Result<(usize, usize, usize), ParseError> {
        let fast = self.parse_integer()?;
        self.expect_char(',')?;
        let slow = self.parse_integer()?;
        let signal = if with_signal {
            self.expect_char(',')?;
            self.parse_integer()?
        } else {
            0
        };
        self.expect_char(')')?;
        Ok((fast, slow, signal))
    }

    fn parse_indicator(&mut self) -> Result<IndicatorType, ParseError> {
        self.skip_whitespace();

        if self.consume_exact("SMA(") {
            return Ok(IndicatorType::Sma(self.parse_period()?));
        }
        if self.consume_exact("EMA(") {
            return Ok(IndicatorType::Ema(self.parse_period()?));
        }
        if self.consume_exact("RSI(") {
            return Ok(IndicatorType::Rsi(self.parse_period()?));
        }
        if self.consume_exact("STOCH(") {
            return Ok(IndicatorType::Stochastic(self.parse_period()?));
        }
        if self.consume_exact("VOL(") {
            return Ok(IndicatorType::Volatility(self.parse_period()?));
        }
        if self.consume_exact("MACD(") {
            let (fast, slow, _) = self.parse_macd_params(false)?;
            return Ok(IndicatorType::Macd { fast, slow });
        }
        if self.consume_exact("MACD_SIGNAL(") {
            let (fast, slow, signal) = self.parse_macd_params(true)?;
            return Ok(IndicatorType::MacdSignal { fast, slow, signal });
        }
        if self.consume_exact("MACD_HIST(") {
            let (fast, slow, signal) = self.parse_macd_params(true)?;
            return Ok(IndicatorType::MacdHistogram { fast, slow, signal });
        }
        if self.consume_exact("SLOPE(") {
            let source = self.parse_indicator()?;
            self.expect_char(',')?;
            let window = self.parse_period()?;
            return Ok(IndicatorType::slope_of(source, window));
        }

        let word = self.peek_word();
        Err(self.error(format!("expected indicator, found '{}'", word)))
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();

        if self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || ch == '-' || ch == '.')
        {
            return Ok(Operand::Constant(self.parse_number()?));
        }

        for (keyword, operand) in [
            ("price", Operand::Price),
            ("close", Operand::Price),
            ("volume", Operand::Volume),
            ("return", Operand::Return),
        ] {
            if self.consume_keyword(keyword) {
                return Ok(operand);
            }
        }

        Ok(Operand::Indicator(self.parse_indicator()?))
    }

    fn parse_comparison(&mut self, keyword: &str) -> Result<Rule, ParseError> {
        self.expect_char('(')?;
        let left = self.parse_operand()?;
        self.expect_char(',')?;
        let right = self.parse_operand()?;
        self.expect_char(')')?;

        Ok(match keyword {
            "CROSS_ABOVE" => Rule::CrossAbove { left, right },
            "CROSS_BELOW" => Rule::CrossBelow { left, right },
            "ABOVE" => Rule::Above { left, right },
            _ => Rule::Below { left, right },
        })
    }

    fn parse_between(&mut self) -> Result<Rule, ParseError> {
        self.expect_char('(')?;
        let operand = self.parse_operand()?;
        self.expect_char(',')?;
        let lower = self.parse_number()?;
        self.expect_char(',')?;
        let upper = self.parse_number()?;
        self.expect_char(')')?;

        if lower > upper {
            return Err(self.error(format!(
                "BETWEEN lower bound {} exceeds upper bound {}",
                lower, upper
            )));
        }

        Ok(Rule::Between {
            operand,
            lower,
            upper,
        })
    }

    fn parse_list(&mut self, keyword: &str) -> Result<Vec<Rule>, ParseError> {
        self.expect_char('(')?;

        let mut rules = vec![self.parse_rule()?];
        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.advance();
                break;
            }
            self.expect_char(',')?;
            rules.push(self.parse_rule()?);
        }

        if rules.len() < 2 {
            return Err(self.error(format!("{} requires at least 2 rules", keyword)));
        }
        Ok(rules)
    }

    fn parse_rule(&mut self) -> Result<Rule, ParseError> {
        self.skip_whitespace();

        if self.consume_keyword("ALWAYS") {
            return Ok(Rule::Always);
        }
        for keyword in ["CROSS_ABOVE", "CROSS_BELOW", "ABOVE", "BELOW"] {
            if self.consume_keyword(keyword) {
                return self.parse_comparison(keyword);
            }
        }
        if self.consume_keyword("BETWEEN") {
            return self.parse_between();
        }
        if self.consume_keyword("AND") {
            return Ok(Rule::And(self.parse_list("AND")?));
        }
        if self.consume_keyword("OR") {
            return Ok(Rule::Or(self.parse_list("OR")?));
        }
        if self.consume_keyword("NOT") {
            self.expect_char('(')?;
            let rule = self.parse_rule()?;
            self.expect_char(')')?;
            return Ok(Rule::Not(Box::new(rule)));
        }

        let word = self.peek_word();
        Err(self.error(format!("expected rule, found '{}'", word)))
    }

    fn parse(&mut self) -> Result<Rule, ParseError> {
        let rule = self.parse_rule()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error(format!(
                "unexpected input after rule: '{}'",
                self.remaining()
            )));
        }
        Ok(rule)
    }
}

pub fn parse(input: &str) -> Result<Rule, ParseError> {
    let mut parser = Parser::new(input);
    parser.parse()
}

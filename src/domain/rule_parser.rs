//! Rule DSL parser.
//!
//! Recursive descent parser for the rule grammar. Converts text to AST with
//! meaningful error messages including character offset, expected/found tokens.
//!
//! ```text
//! rule     := comparison | between | composite | temporal | signal
//! compare  := (CROSS_ABOVE|CROSS_BELOW|ABOVE|BELOW|AT_LEAST|AT_MOST|EQUALS) '(' operand ',' operand ')'
//! between  := BETWEEN '(' operand ',' number ',' number ')'
//! composite:= (AND|OR) '(' rule (',' rule)+ ')' | NOT '(' rule ')'
//! temporal := (CONSECUTIVE|ANY_OF) '(' rule ',' integer ')'
//! signal   := SIGNAL '(' (BUY|SELL) ')'
//! operand  := number | open | high | low | close | volume | EMA '(' 5|10|20|50 ')'
//!           | ATR | HEATMAP | SECTOR_HEATMAP | DONCHIAN_UPPER | ENTRY_CLOSE | ENTRY_ATR
//! ```

use crate::domain::error::ParseError;
use crate::domain::quote::SignalFlag;
use crate::domain::rule::{IndicatorField, Operand, Rule};

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

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        if self.consume_keyword(keyword) {
            Ok(())
        } else {
            let found = self.peek_word();
            Err(self.error(format!("expected '{}', found '{}'", keyword, found)))
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

    fn parse_count(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let count = self.parse_integer()?;
        if count == 0 {
            return Err(ParseError {
                message: "count must be at least 1".to_string(),
                position: start,
            });
        }
        Ok(count)
    }

    fn parse_named_operand(&mut self) -> Result<Operand, ParseError> {
        if self.peek_keyword("EMA") {
            self.pos += "EMA".len();
            self.expect_char('(')?;
            self.skip_whitespace();
            let start = self.pos;
            let period = self.parse_integer()?;
            let field = IndicatorField::ema(period).ok_or(ParseError {
                message: format!("unsupported EMA period {} (expected 5, 10, 20 or 50)", period),
                position: start,
            })?;
            self.expect_char(')')?;
            return Ok(Operand::Indicator(field));
        }

        let word = self.peek_word();
        let operand = match word.as_str() {
            "open" => Operand::Open,
            "high" => Operand::High,
            "low" => Operand::Low,
            "close" => Operand::Close,
            "volume" => Operand::Volume,
            "ATR" => Operand::Indicator(IndicatorField::Atr),
            "HEATMAP" => Operand::Indicator(IndicatorField::Heatmap),
            "SECTOR_HEATMAP" => Operand::Indicator(IndicatorField::SectorHeatmap),
            "DONCHIAN_UPPER" => Operand::Indicator(IndicatorField::DonchianUpper),
            "ENTRY_CLOSE" => Operand::EntryClose,
            "ENTRY_ATR" => Operand::EntryAtr,
            _ => return Err(self.error(format!("expected operand, found '{}'", word))),
        };
        self.pos += word.len();
        Ok(operand)
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();

        if self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || ch == '-' || ch == '.')
        {
            let num = self.parse_number()?;
            return Ok(Operand::Constant(num));
        }

        self.parse_named_operand()
    }

    fn parse_comparison(&mut self, keyword: &str) -> Result<Rule, ParseError> {
        self.expect_keyword(keyword)?;
        self.expect_char('(')?;

        let left = self.parse_operand()?;
        self.expect_char(',')?;
        let right = self.parse_operand()?;
        self.expect_char(')')?;

        match keyword {
            "CROSS_ABOVE" => Ok(Rule::CrossAbove { left, right }),
            "CROSS_BELOW" => Ok(Rule::CrossBelow { left, right }),
            "ABOVE" => Ok(Rule::Above { left, right }),
            "BELOW" => Ok(Rule::Below { left, right }),
            "AT_LEAST" => Ok(Rule::AtLeast { left, right }),
            "AT_MOST" => Ok(Rule::AtMost { left, right }),
            "EQUALS" => Ok(Rule::Equals { left, right }),
            _ => unreachable!(),
        }
    }

    fn parse_between(&mut self) -> Result<Rule, ParseError> {
        self.expect_keyword("BETWEEN")?;
        self.expect_char('(')?;

        let operand = self.parse_operand()?;
        self.expect_char(',')?;
        let lower = self.parse_number()?;
        self.expect_char(',')?;
        let upper = self.parse_number()?;
        self.expect_char(')')?;

        Ok(Rule::Between {
            operand,
            lower,
            upper,
        })
    }

    fn parse_signal(&mut self) -> Result<Rule, ParseError> {
        self.expect_keyword("SIGNAL")?;
        self.expect_char('(')?;
        self.skip_whitespace();
        let flag = if self.consume_keyword("BUY") {
            SignalFlag::Buy
        } else if self.consume_keyword("SELL") {
            SignalFlag::Sell
        } else {
            let found = self.peek_word();
            return Err(self.error(format!("expected BUY or SELL, found '{}'", found)));
        };
        self.expect_char(')')?;
        Ok(Rule::Signal(flag))
    }

    fn parse_rule(&mut self) -> Result<Rule, ParseError> {
        self.skip_whitespace();

        for keyword in [
            "CROSS_ABOVE",
            "CROSS_BELOW",
            "ABOVE",
            "BELOW",
            "AT_LEAST",
            "AT_MOST",
            "EQUALS",
        ] {
            if self.peek_keyword(keyword) {
                return self.parse_comparison(keyword);
            }
        }
        if self.peek_keyword("BETWEEN") {
            return self.parse_between();
        }

        if self.peek_keyword("AND") {
            return self.parse_list("AND").map(Rule::And);
        }
        if self.peek_keyword("OR") {
            return self.parse_list("OR").map(Rule::Or);
        }
        if self.peek_keyword("NOT") {
            return self.parse_not();
        }

        if self.peek_keyword("CONSECUTIVE") {
            let (rule, count) = self.parse_temporal("CONSECUTIVE")?;
            return Ok(Rule::Consecutive { rule, count });
        }
        if self.peek_keyword("ANY_OF") {
            let (rule, count) = self.parse_temporal("ANY_OF")?;
            return Ok(Rule::AnyOf { rule, count });
        }
        if self.peek_keyword("SIGNAL") {
            return self.parse_signal();
        }

        let word = self.peek_word();
        Err(self.error(format!("expected rule, found '{}'", word)))
    }

    fn parse_list(&mut self, keyword: &str) -> Result<Vec<Rule>, ParseError> {
        self.expect_keyword(keyword)?;
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

    fn parse_not(&mut self) -> Result<Rule, ParseError> {
        self.expect_keyword("NOT")?;
        self.expect_char('(')?;
        let rule = self.parse_rule()?;
        self.expect_char(')')?;
        Ok(Rule::Not(Box::new(rule)))
    }

    fn parse_temporal(&mut self, keyword: &str) -> Result<(Box<Rule>, usize), ParseError> {
        self.expect_keyword(keyword)?;
        self.expect_char('(')?;
        let rule = self.parse_rule()?;
        self.expect_char(',')?;
        let count = self.parse_count()?;
        self.expect_char(')')?;
        Ok((Box::new(rule), count))
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

//! Rule evaluation engine.
//!
//! Evaluates rules against an instrument's quote list at a given position.
//!
//! # Evaluation Semantics
//!
//! - Comparison rules: evaluate at the given quote index
//! - `CROSS_ABOVE`/`CROSS_BELOW`: require `index >= 1`, return `false` at index 0
//! - `AND`: short-circuits on first `false`
//! - `OR`: short-circuits on first `true`
//! - `CONSECUTIVE(rule, N)`: child must be true for N consecutive quotes ending at current
//! - `ANY_OF(rule, N)`: child must be true at least once in the last N quotes
//! - `ENTRY_CLOSE`/`ENTRY_ATR`: NaN without an entry quote, so comparisons are false
//!
//! Only quotes at or before `index` are ever read.

use crate::domain::quote::Quote;
use crate::domain::rule::{Operand, Rule};

const EPSILON: f64 = 1e-9;

pub fn evaluate(rule: &Rule, quotes: &[Quote], index: usize, entry: Option<&Quote>) -> bool {
    if index >= quotes.len() {
        return false;
    }
    let value = |operand: &Operand, at: usize| resolve_operand(operand, &quotes[at], entry);

    match rule {
        Rule::CrossAbove { left, right } => {
            if index == 0 {
                return false;
            }
            value(left, index) > value(right, index)
                && value(left, index - 1) <= value(right, index - 1)
        }
        Rule::CrossBelow { left, right } => {
            if index == 0 {
                return false;
            }
            value(left, index) < value(right, index)
                && value(left, index - 1) >= value(right, index - 1)
        }
        Rule::Above { left, right } => value(left, index) > value(right, index),
        Rule::Below { left, right } => value(left, index) < value(right, index),
        Rule::AtLeast { left, right } => value(left, index) >= value(right, index),
        Rule::AtMost { left, right } => value(left, index) <= value(right, index),
        Rule::Between {
            operand,
            lower,
            upper,
        } => {
            let val = value(operand, index);
            val >= *lower && val <= *upper
        }
        Rule::Equals { left, right } => (value(left, index) - value(right, index)).abs() < EPSILON,
        Rule::And(rules) => rules.iter().all(|r| evaluate(r, quotes, index, entry)),
        Rule::Or(rules) => rules.iter().any(|r| evaluate(r, quotes, index, entry)),
        Rule::Not(rule) => !evaluate(rule, quotes, index, entry),
        Rule::Consecutive { rule, count } => {
            if *count == 0 || index + 1 < *count {
                return false;
            }
            ((index + 1 - *count)..=index).all(|i| evaluate(rule, quotes, i, entry))
        }
        Rule::AnyOf { rule, count } => {
            if *count == 0 {
                return false;
            }
            let start = index.saturating_sub(*count - 1);
            (start..=index).any(|i| evaluate(rule, quotes, i, entry))
        }
        Rule::Signal(flag) => quotes[index].signal == Some(*flag),
    }
}

fn resolve_operand(operand: &Operand, quote: &Quote, entry: Option<&Quote>) -> f64 {
    match operand {
        Operand::Open => quote.open,
        Operand::High => quote.high,
        Operand::Low => quote.low,
        Operand::Close => quote.close,
        Operand::Volume => quote.volume as f64,
        Operand::Constant(v) => *v,
        Operand::Indicator(field) => field.read(quote),
        Operand::EntryClose => entry.map_or(f64::NAN, |e| e.close),
        Operand::EntryAtr => entry.map_or(f64::NAN, |e| e.atr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quote::SignalFlag;
    use crate::domain::rule::IndicatorField;
    use chrono::NaiveDate;

    fn make_quote(day: u32, open: f64, close: f64, volume: i64) -> Quote {
        Quote::ohlcv(
            "TEST",
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open,
            open.max(close),
            open.min(close),
            close,
            volume,
        )
    }

    fn closes(values: &[f64]) -> Vec<Quote> {
        values
            .iter()
            .enumerate()
            .map(|(i, &c)| make_quote(i as u32 + 1, c, c, 1000))
            .collect()
    }

    fn close_above(level: f64) -> Rule {
        Rule::Above {
            left: Operand::Close,
            right: Operand::Constant(level),
        }
    }

    #[test]
    fn evaluate_above_and_below() {
        let quotes = closes(&[105.0]);
        assert!(evaluate(&close_above(100.0), &quotes, 0, None));
        assert!(!evaluate(&close_above(110.0), &quotes, 0, None));
        let below = Rule::Below {
            left: Operand::Close,
            right: Operand::Constant(110.0),
        };
        assert!(evaluate(&below, &quotes, 0, None));
    }

    #[test]
    fn evaluate_at_least_includes_equality() {
        let quotes = closes(&[100.0]);
        let at_least = Rule::AtLeast {
            left: Operand::Close,
            right: Operand::Constant(100.0),
        };
        let at_most = Rule::AtMost {
            left: Operand::Close,
            right: Operand::Constant(100.0),
        };
        assert!(evaluate(&at_least, &quotes, 0, None));
        assert!(evaluate(&at_most, &quotes, 0, None));
        assert!(!evaluate(&close_above(100.0), &quotes, 0, None));
    }

    #[test]
    fn evaluate_between_boundary() {
        let quotes = closes(&[50.0]);
        let rule = Rule::Between {
            operand: Operand::Close,
            lower: 50.0,
            upper: 60.0,
        };
        assert!(evaluate(&rule, &quotes, 0, None));
    }

    #[test]
    fn evaluate_equals_uses_epsilon() {
        let quotes = closes(&[100.0]);
        let rule = Rule::Equals {
            left: Operand::Close,
            right: Operand::Constant(100.0 + 1e-12),
        };
        assert!(evaluate(&rule, &quotes, 0, None));
    }

    #[test]
    fn evaluate_cross_above_at_index_0() {
        let quotes = closes(&[110.0]);
        let rule = Rule::CrossAbove {
            left: Operand::Close,
            right: Operand::Constant(100.0),
        };
        assert!(!evaluate(&rule, &quotes, 0, None));
    }

    #[test]
    fn evaluate_cross_above_and_below() {
        let quotes = closes(&[95.0, 105.0, 99.0]);
        let above = Rule::CrossAbove {
            left: Operand::Close,
            right: Operand::Constant(100.0),
        };
        let below = Rule::CrossBelow {
            left: Operand::Close,
            right: Operand::Constant(100.0),
        };
        assert!(evaluate(&above, &quotes, 1, None));
        assert!(!evaluate(&above, &quotes, 2, None));
        assert!(evaluate(&below, &quotes, 2, None));
    }

    #[test]
    fn evaluate_cross_with_indicator() {
        let mut quotes = closes(&[100.0, 100.0]);
        quotes[0].ema10 = 101.0;
        quotes[1].ema10 = 99.0;
        let rule = Rule::CrossAbove {
            left: Operand::Close,
            right: Operand::Indicator(IndicatorField::Ema10),
        };
        assert!(evaluate(&rule, &quotes, 1, None));
    }

    #[test]
    fn evaluate_composites() {
        let quotes = closes(&[105.0]);
        let and = Rule::And(vec![close_above(100.0), close_above(110.0)]);
        let or = Rule::Or(vec![close_above(110.0), close_above(100.0)]);
        let not = Rule::Not(Box::new(close_above(110.0)));
        assert!(!evaluate(&and, &quotes, 0, None));
        assert!(evaluate(&or, &quotes, 0, None));
        assert!(evaluate(&not, &quotes, 0, None));
    }

    #[test]
    fn evaluate_consecutive() {
        let quotes = closes(&[101.0, 102.0, 99.0, 103.0, 104.0, 105.0]);
        let rule = Rule::Consecutive {
            rule: Box::new(close_above(100.0)),
            count: 3,
        };
        assert!(!evaluate(&rule, &quotes, 1, None));
        assert!(!evaluate(&rule, &quotes, 3, None));
        assert!(evaluate(&rule, &quotes, 5, None));
    }

    #[test]
    fn evaluate_any_of() {
        let quotes = closes(&[101.0, 90.0, 90.0, 90.0]);
        let rule = Rule::AnyOf {
            rule: Box::new(close_above(100.0)),
            count: 3,
        };
        assert!(evaluate(&rule, &quotes, 2, None));
        assert!(!evaluate(&rule, &quotes, 3, None));
    }

    #[test]
    fn never_reads_future_quotes() {
        // A later quote satisfying the rule must not affect index 0.
        let quotes = closes(&[90.0, 200.0]);
        let rule = Rule::AnyOf {
            rule: Box::new(close_above(100.0)),
            count: 5,
        };
        assert!(!evaluate(&rule, &quotes, 0, None));
    }

    #[test]
    fn evaluate_signal_flag() {
        let mut quotes = closes(&[100.0, 100.0]);
        quotes[1].signal = Some(SignalFlag::Buy);
        let rule = Rule::Signal(SignalFlag::Buy);
        assert!(!evaluate(&rule, &quotes, 0, None));
        assert!(evaluate(&rule, &quotes, 1, None));
        assert!(!evaluate(&Rule::Signal(SignalFlag::Sell), &quotes, 1, None));
    }

    #[test]
    fn entry_operands_need_entry_quote() {
        let quotes = closes(&[95.0]);
        let entry = make_quote(1, 100.0, 100.0, 0);
        let rule = Rule::Below {
            left: Operand::Close,
            right: Operand::EntryClose,
        };
        assert!(evaluate(&rule, &quotes, 0, Some(&entry)));
        assert!(!evaluate(&rule, &quotes, 0, None));
    }

    #[test]
    fn evaluate_operand_volume() {
        let quotes = vec![make_quote(1, 10.0, 10.0, 5000)];
        let rule = Rule::AtLeast {
            left: Operand::Volume,
            right: Operand::Constant(5000.0),
        };
        assert!(evaluate(&rule, &quotes, 0, None));
    }

    #[test]
    fn out_of_range_index_is_false() {
        let quotes = closes(&[105.0]);
        assert!(!evaluate(&close_above(100.0), &quotes, 3, None));
    }
}

//! Rule AST data structures.
//!
//! - `Operand`: what can be compared (price fields, constants, quote
//!   indicator fields, entry references)
//! - `IndicatorField`: which pre-computed indicator field of a quote to read
//! - `Rule`: comparison, composite, temporal and flag variants
//!
//! `Display` renders a rule back into text the parser accepts.

use crate::domain::quote::{Quote, SignalFlag};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorField {
    Ema5,
    Ema10,
    Ema20,
    Ema50,
    Atr,
    Heatmap,
    SectorHeatmap,
    DonchianUpper,
}

impl IndicatorField {
    pub fn read(self, quote: &Quote) -> f64 {
        match self {
            IndicatorField::Ema5 => quote.ema5,
            IndicatorField::Ema10 => quote.ema10,
            IndicatorField::Ema20 => quote.ema20,
            IndicatorField::Ema50 => quote.ema50,
            IndicatorField::Atr => quote.atr,
            IndicatorField::Heatmap => quote.heatmap,
            IndicatorField::SectorHeatmap => quote.sector_heatmap,
            IndicatorField::DonchianUpper => quote.donchian_upper,
        }
    }

    pub fn ema(period: usize) -> Option<Self> {
        match period {
            5 => Some(IndicatorField::Ema5),
            10 => Some(IndicatorField::Ema10),
            20 => Some(IndicatorField::Ema20),
            50 => Some(IndicatorField::Ema50),
            _ => None,
        }
    }
}

impl fmt::Display for IndicatorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorField::Ema5 => f.write_str("EMA(5)"),
            IndicatorField::Ema10 => f.write_str("EMA(10)"),
            IndicatorField::Ema20 => f.write_str("EMA(20)"),
            IndicatorField::Ema50 => f.write_str("EMA(50)"),
            IndicatorField::Atr => f.write_str("ATR"),
            IndicatorField::Heatmap => f.write_str("HEATMAP"),
            IndicatorField::SectorHeatmap => f.write_str("SECTOR_HEATMAP"),
            IndicatorField::DonchianUpper => f.write_str("DONCHIAN_UPPER"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Open,
    High,
    Low,
    Close,
    Volume,
    Constant(f64),
    Indicator(IndicatorField),
    /// Close of the entry quote; exit rules only.
    EntryClose,
    /// ATR of the entry quote; exit rules only.
    EntryAtr,
}

impl Operand {
    pub fn needs_entry(&self) -> bool {
        matches!(self, Operand::EntryClose | Operand::EntryAtr)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Open => f.write_str("open"),
            Operand::High => f.write_str("high"),
            Operand::Low => f.write_str("low"),
            Operand::Close => f.write_str("close"),
            Operand::Volume => f.write_str("volume"),
            Operand::Constant(v) => write!(f, "{}", v),
            Operand::Indicator(field) => write!(f, "{}", field),
            Operand::EntryClose => f.write_str("ENTRY_CLOSE"),
            Operand::EntryAtr => f.write_str("ENTRY_ATR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
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
    AtLeast {
        left: Operand,
        right: Operand,
    },
    AtMost {
        left: Operand,
        right: Operand,
    },
    Between {
        operand: Operand,
        lower: f64,
        upper: f64,
    },
    Equals {
        left: Operand,
        right: Operand,
    },
    And(Vec<Rule>),
    Or(Vec<Rule>),
    Not(Box<Rule>),
    Consecutive {
        rule: Box<Rule>,
        count: usize,
    },
    AnyOf {
        rule: Box<Rule>,
        count: usize,
    },
    Signal(SignalFlag),
}

impl Rule {
    /// Whether any operand refers to the entry quote.
    pub fn references_entry(&self) -> bool {
        match self {
            Rule::CrossAbove { left, right }
            | Rule::CrossBelow { left, right }
            | Rule::Above { left, right }
            | Rule::Below { left, right }
            | Rule::AtLeast { left, right }
            | Rule::AtMost { left, right }
            | Rule::Equals { left, right } => left.needs_entry() || right.needs_entry(),
            Rule::Between { operand, .. } => operand.needs_entry(),
            Rule::And(rules) | Rule::Or(rules) => rules.iter().any(Rule::references_entry),
            Rule::Not(rule) => rule.references_entry(),
            Rule::Consecutive { rule, .. } | Rule::AnyOf { rule, .. } => rule.references_entry(),
            Rule::Signal(_) => false,
        }
    }

    /// Number of earlier quotes the rule reads besides the current one.
    pub fn lookback(&self) -> usize {
        match self {
            Rule::CrossAbove { .. } | Rule::CrossBelow { .. } => 1,
            Rule::And(rules) | Rule::Or(rules) => {
                rules.iter().map(Rule::lookback).max().unwrap_or(0)
            }
            Rule::Not(rule) => rule.lookback(),
            Rule::Consecutive { rule, count } | Rule::AnyOf { rule, count } => {
                rule.lookback() + count.saturating_sub(1)
            }
            _ => 0,
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, name: &str, rules: &[Rule]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", rule)?;
    }
    f.write_str(")")
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::CrossAbove { left, right } => write!(f, "CROSS_ABOVE({}, {})", left, right),
            Rule::CrossBelow { left, right } => write!(f, "CROSS_BELOW({}, {})", left, right),
            Rule::Above { left, right } => write!(f, "ABOVE({}, {})", left, right),
            Rule::Below { left, right } => write!(f, "BELOW({}, {})", left, right),
            Rule::AtLeast { left, right } => write!(f, "AT_LEAST({}, {})", left, right),
            Rule::AtMost { left, right } => write!(f, "AT_MOST({}, {})", left, right),
            Rule::Between {
                operand,
                lower,
                upper,
            } => write!(f, "BETWEEN({}, {}, {})", operand, lower, upper),
            Rule::Equals { left, right } => write!(f, "EQUALS({}, {})", left, right),
            Rule::And(rules) => write_list(f, "AND", rules),
            Rule::Or(rules) => write_list(f, "OR", rules),
            Rule::Not(rule) => write!(f, "NOT({})", rule),
            Rule::Consecutive { rule, count } => write!(f, "CONSECUTIVE({}, {})", rule, count),
            Rule::AnyOf { rule, count } => write!(f, "ANY_OF({}, {})", rule, count),
            Rule::Signal(SignalFlag::Buy) => f.write_str("SIGNAL(BUY)"),
            Rule::Signal(SignalFlag::Sell) => f.write_str("SIGNAL(SELL)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn operand_display() {
        assert_eq!(Operand::Close.to_string(), "close");
        assert_eq!(Operand::Constant(100.0).to_string(), "100");
        assert_eq!(Operand::Constant(-2.5).to_string(), "-2.5");
        assert_eq!(Operand::Indicator(IndicatorField::Ema20).to_string(), "EMA(20)");
        assert_eq!(Operand::EntryAtr.to_string(), "ENTRY_ATR");
    }

    #[test]
    fn indicator_field_reads_quote() {
        let mut q = Quote::ohlcv(
            "SPY",
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            1.0,
            1.0,
            1.0,
            1.0,
            0,
        );
        q.ema10 = 42.0;
        q.donchian_upper = 7.5;
        assert_eq!(IndicatorField::Ema10.read(&q), 42.0);
        assert_eq!(IndicatorField::DonchianUpper.read(&q), 7.5);
        assert_eq!(IndicatorField::ema(50), Some(IndicatorField::Ema50));
        assert_eq!(IndicatorField::ema(200), None);
    }

    #[test]
    fn rule_display_nested() {
        let rule = Rule::And(vec![
            Rule::Above {
                left: Operand::Close,
                right: Operand::Indicator(IndicatorField::Ema10),
            },
            Rule::Not(Box::new(Rule::Signal(SignalFlag::Sell))),
            Rule::Consecutive {
                rule: Box::new(Rule::AtLeast {
                    left: Operand::Volume,
                    right: Operand::Constant(1000.0),
                }),
                count: 3,
            },
        ]);
        assert_eq!(
            rule.to_string(),
            "AND(ABOVE(close, EMA(10)), NOT(SIGNAL(SELL)), CONSECUTIVE(AT_LEAST(volume, 1000), 3))"
        );
    }

    #[test]
    fn references_entry_walks_tree() {
        let plain = Rule::Below {
            left: Operand::Close,
            right: Operand::Constant(10.0),
        };
        assert!(!plain.references_entry());
        let nested = Rule::Or(vec![
            plain.clone(),
            Rule::Not(Box::new(Rule::Below {
                left: Operand::Close,
                right: Operand::EntryClose,
            })),
        ]);
        assert!(nested.references_entry());
    }

    #[test]
    fn lookback_accounts_for_temporal_nesting() {
        let cross = Rule::CrossAbove {
            left: Operand::Close,
            right: Operand::Indicator(IndicatorField::Ema20),
        };
        assert_eq!(cross.lookback(), 1);
        let any = Rule::AnyOf {
            rule: Box::new(cross),
            count: 5,
        };
        assert_eq!(any.lookback(), 5);
    }
}

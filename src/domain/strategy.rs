//! Strategy configuration and composition.
//!
//! A strategy is an entry rule, an optional exit rule and optional stop
//! loss / take profit levels. `RuleEntry` and `RuleExit` adapt those to the
//! engine's signal traits.

use crate::domain::error::SwingtestError;
use crate::domain::instrument::Instrument;
use crate::domain::quote::Quote;
use crate::domain::ranking::RankerKind;
use crate::domain::rule::Rule;
use crate::domain::rule_eval::evaluate;
use crate::domain::signal::{EntrySignal, ExitDecision, ExitSignal};

pub const STOP_LOSS_REASON: &str = "Stop loss";
pub const TAKE_PROFIT_REASON: &str = "Take profit";
pub const DEFAULT_EXIT_REASON: &str = "Exit rule";

#[derive(Debug, Clone)]
pub struct Strategy {
    pub name: String,
    pub description: String,
    pub entry: Rule,
    pub exit: Option<Rule>,
    pub exit_reason: String,
    /// Percent below the entry close; 0 disables.
    pub stop_loss_pct: f64,
    /// Percent above the entry close; 0 disables.
    pub take_profit_pct: f64,
    pub ranker: RankerKind,
}

impl Strategy {
    pub fn validate(&self) -> Result<(), SwingtestError> {
        if self.entry.references_entry() {
            return Err(SwingtestError::RuleInvalid {
                reason: format!(
                    "entry rule cannot use ENTRY_CLOSE or ENTRY_ATR: {}",
                    self.entry
                ),
            });
        }
        for (name, value) in [
            ("stop_loss", self.stop_loss_pct),
            ("take_profit", self.take_profit_pct),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SwingtestError::RuleInvalid {
                    reason: format!("{} must be a non-negative percentage, got {}", name, value),
                });
            }
        }
        if self.stop_loss_pct >= 100.0 {
            return Err(SwingtestError::RuleInvalid {
                reason: format!("stop_loss must be below 100%, got {}", self.stop_loss_pct),
            });
        }
        if self.exit.is_none() && self.stop_loss_pct == 0.0 && self.take_profit_pct == 0.0 {
            return Err(SwingtestError::RuleInvalid {
                reason: "strategy needs an exit rule, a stop loss or a take profit".into(),
            });
        }
        Ok(())
    }

    pub fn entry_signal(&self) -> RuleEntry {
        RuleEntry {
            rule: self.entry.clone(),
        }
    }

    pub fn exit_signal(&self) -> RuleExit {
        RuleExit {
            rule: self.exit.clone(),
            reason: if self.exit_reason.trim().is_empty() {
                DEFAULT_EXIT_REASON.to_string()
            } else {
                self.exit_reason.clone()
            },
            stop_loss_pct: self.stop_loss_pct,
            take_profit_pct: self.take_profit_pct,
        }
    }
}

/// Position of `quote` inside `instrument`, or a predicate error if the
/// quote is not one of the instrument's own.
fn locate(instrument: &Instrument, quote: &Quote) -> Result<usize, SwingtestError> {
    let position = quote
        .date
        .filter(|_| quote.symbol == instrument.symbol)
        .and_then(|date| instrument.position_of(date));
    position.ok_or_else(|| SwingtestError::Predicate {
        symbol: instrument.symbol.clone(),
        reason: format!(
            "quote {} {:?} is not part of the instrument",
            quote.symbol, quote.date
        ),
    })
}

#[derive(Debug, Clone)]
pub struct RuleEntry {
    rule: Rule,
}

impl RuleEntry {
    pub fn new(rule: Rule) -> Self {
        Self { rule }
    }
}

impl EntrySignal for RuleEntry {
    fn test(&self, instrument: &Instrument, quote: &Quote) -> Result<bool, SwingtestError> {
        let index = locate(instrument, quote)?;
        Ok(evaluate(&self.rule, &instrument.quotes, index, None))
    }

    fn describe(&self) -> String {
        self.rule.to_string()
    }
}

/// Stop loss, then take profit, then the exit rule; first match wins.
#[derive(Debug, Clone)]
pub struct RuleExit {
    rule: Option<Rule>,
    reason: String,
    stop_loss_pct: f64,
    take_profit_pct: f64,
}

impl RuleExit {
    pub fn new(rule: Rule, reason: impl Into<String>) -> Self {
        Self {
            rule: Some(rule),
            reason: reason.into(),
            stop_loss_pct: 0.0,
            take_profit_pct: 0.0,
        }
    }

    pub fn with_stop_loss(mut self, pct: f64) -> Self {
        self.stop_loss_pct = pct;
        self
    }

    pub fn with_take_profit(mut self, pct: f64) -> Self {
        self.take_profit_pct = pct;
        self
    }

    fn stop_hit(&self, entry: &Quote, current: &Quote) -> bool {
        self.stop_loss_pct > 0.0 && current.close <= entry.close * (1.0 - self.stop_loss_pct / 100.0)
    }

    fn target_hit(&self, entry: &Quote, current: &Quote) -> bool {
        self.take_profit_pct > 0.0
            && current.close >= entry.close * (1.0 + self.take_profit_pct / 100.0)
    }
}

impl ExitSignal for RuleExit {
    fn check(
        &self,
        instrument: &Instrument,
        entry: &Quote,
        current: &Quote,
    ) -> Result<ExitDecision, SwingtestError> {
        let index = locate(instrument, current)?;
        if self.stop_hit(entry, current) {
            return Ok(ExitDecision::exit(STOP_LOSS_REASON));
        }
        if self.target_hit(entry, current) {
            return Ok(ExitDecision::exit(TAKE_PROFIT_REASON));
        }
        match &self.rule {
            Some(rule) if evaluate(rule, &instrument.quotes, index, Some(entry)) => {
                Ok(ExitDecision::exit(self.reason.clone()))
            }
            _ => Ok(ExitDecision::hold()),
        }
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.stop_loss_pct > 0.0 {
            parts.push(format!("stop loss {}%", self.stop_loss_pct));
        }
        if self.take_profit_pct > 0.0 {
            parts.push(format!("take profit {}%", self.take_profit_pct));
        }
        if let Some(rule) = &self.rule {
            parts.push(format!("{} ({})", rule, self.reason));
        }
        parts.join(", ")
    }
}

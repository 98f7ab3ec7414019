//! Pluggable entry and exit decisions.
//!
//! The engine only sees these traits. Rule-based implementations live in
//! [`crate::domain::strategy`]; tests and embedders can pass closures.

use crate::domain::error::SwingtestError;
use crate::domain::instrument::Instrument;
use crate::domain::quote::Quote;

/// Outcome of an exit check on one quote.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExitDecision {
    pub fired: bool,
    pub reason: String,
}

impl ExitDecision {
    pub fn hold() -> Self {
        Self::default()
    }

    pub fn exit(reason: impl Into<String>) -> Self {
        Self {
            fired: true,
            reason: reason.into(),
        }
    }

    /// Fired with a non-empty reason.
    pub fn is_exit(&self) -> bool {
        self.fired && !self.reason.is_empty()
    }
}

pub trait EntrySignal: Send + Sync {
    fn test(&self, instrument: &Instrument, quote: &Quote) -> Result<bool, SwingtestError>;

    fn describe(&self) -> String {
        String::from("custom entry")
    }
}

pub trait ExitSignal: Send + Sync {
    fn check(
        &self,
        instrument: &Instrument,
        entry: &Quote,
        current: &Quote,
    ) -> Result<ExitDecision, SwingtestError>;

    fn describe(&self) -> String {
        String::from("custom exit")
    }
}

impl<F> EntrySignal for F
where
    F: Fn(&Instrument, &Quote) -> Result<bool, SwingtestError> + Send + Sync,
{
    fn test(&self, instrument: &Instrument, quote: &Quote) -> Result<bool, SwingtestError> {
        self(instrument, quote)
    }
}

impl<F> ExitSignal for F
where
    F: Fn(&Instrument, &Quote, &Quote) -> Result<ExitDecision, SwingtestError> + Send + Sync,
{
    fn check(
        &self,
        instrument: &Instrument,
        entry: &Quote,
        current: &Quote,
    ) -> Result<ExitDecision, SwingtestError> {
        self(instrument, entry, current)
    }
}

//! Per-instrument date → quote lookup.

use crate::domain::quote::Quote;
use chrono::NaiveDate;
use log::warn;
use std::collections::HashMap;

/// Maps each date to the position of its quote in the owning instrument's
/// quote list. Built once, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct QuoteIndex {
    by_date: HashMap<NaiveDate, usize>,
}

impl QuoteIndex {
    /// Index `quotes` by date. Dateless quotes are skipped with a warning.
    /// If two quotes share a date the first one wins.
    pub fn build(symbol: &str, quotes: &[Quote]) -> Self {
        let mut by_date = HashMap::with_capacity(quotes.len());
        let mut dropped = 0usize;

        for (i, quote) in quotes.iter().enumerate() {
            match quote.date {
                Some(date) => {
                    if by_date.contains_key(&date) {
                        warn!("{}: duplicate quote for {}, keeping the first", symbol, date);
                    } else {
                        by_date.insert(date, i);
                    }
                }
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!("{}: dropped {} quote(s) without a date", symbol, dropped);
        }

        Self { by_date }
    }

    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.by_date.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.by_date.keys().copied()
    }
}

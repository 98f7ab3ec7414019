//! Instruments and the in-memory instrument store.

use crate::domain::quote::Quote;
use crate::domain::quote_index::QuoteIndex;
use chrono::NaiveDate;
use log::warn;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Instrument {
    pub symbol: String,
    pub sector: String,
    pub quotes: Vec<Quote>,
    index: QuoteIndex,
}

impl Instrument {
    /// `quotes` are expected in ascending date order. Dateless quotes are
    /// dropped so that index lookback only ever steps onto a real day.
    pub fn new(symbol: String, sector: String, mut quotes: Vec<Quote>) -> Self {
        let before = quotes.len();
        quotes.retain(|q| q.date.is_some());
        if quotes.len() < before {
            warn!("{}: dropped {} quote(s) without a date", symbol, before - quotes.len());
        }
        let index = QuoteIndex::build(&symbol, &quotes);
        Self {
            symbol,
            sector,
            quotes,
            index,
        }
    }

    pub fn quote_count(&self) -> usize {
        self.quotes.len()
    }

    pub fn quote_on(&self, date: NaiveDate) -> Option<&Quote> {
        self.index.position(date).map(|i| &self.quotes[i])
    }

    pub fn position_of(&self, date: NaiveDate) -> Option<usize> {
        self.index.position(date)
    }

    /// Dated quotes strictly after `date`, in list order.
    pub fn quotes_after(&self, date: NaiveDate) -> impl Iterator<Item = &Quote> {
        let start = self.position_of(date).map(|p| p + 1).unwrap_or(0);
        self.quotes[start..]
            .iter()
            .filter(move |q| q.date.is_some_and(|d| d > date))
    }

    /// Dated quotes with `from <= date <= to`.
    pub fn quotes_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<Quote> {
        let start = self.position_of(from).unwrap_or(0);
        self.quotes[start..]
            .iter()
            .filter(|q| q.date.is_some_and(|d| d >= from && d <= to))
            .cloned()
            .collect()
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.quotes.iter().filter_map(|q| q.date);
        let first = dates.next()?;
        let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some((min, max))
    }
}

/// Symbol → instrument lookup, used to resolve underlying assets.
pub trait InstrumentLookup {
    fn instrument(&self, symbol: &str) -> Option<&Instrument>;
}

impl InstrumentLookup for HashMap<String, Instrument> {
    fn instrument(&self, symbol: &str) -> Option<&Instrument> {
        self.get(symbol)
    }
}

/// Owned collection of loaded instruments, keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct InstrumentStore {
    instruments: HashMap<String, Instrument>,
}

impl InstrumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_instruments(instruments: Vec<Instrument>) -> Self {
        let mut store = Self::new();
        for instrument in instruments {
            store.insert(instrument);
        }
        store
    }

    pub fn insert(&mut self, instrument: Instrument) {
        self.instruments.insert(instrument.symbol.clone(), instrument);
    }

    pub fn get(&self, symbol: &str) -> Option<&Instrument> {
        self.instruments.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.instruments.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Instruments for `symbols` in the given order; unknown symbols are skipped.
    pub fn select(&self, symbols: &[String]) -> Vec<&Instrument> {
        symbols.iter().filter_map(|s| self.get(s)).collect()
    }
}

impl InstrumentLookup for InstrumentStore {
    fn instrument(&self, symbol: &str) -> Option<&Instrument> {
        self.get(symbol)
    }
}

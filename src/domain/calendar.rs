//! Trading calendar: the sorted, deduplicated dates a run iterates over.
//!
//! Cooldown and entry-delay arithmetic work on positions in this list, so
//! weekends and holidays never stretch a window.

use crate::domain::instrument::Instrument;
use chrono::NaiveDate;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradingCalendar {
    dates: Vec<NaiveDate>,
}

impl TradingCalendar {
    /// Union of every instrument's quote dates within `[from, to]`.
    pub fn build<'a, I>(instruments: I, from: NaiveDate, to: NaiveDate) -> Self
    where
        I: IntoIterator<Item = &'a Instrument>,
    {
        let unique: BTreeSet<NaiveDate> = instruments
            .into_iter()
            .flat_map(|inst| inst.quotes.iter().filter_map(|q| q.date))
            .filter(|d| *d >= from && *d <= to)
            .collect();
        Self {
            dates: unique.into_iter().collect(),
        }
    }

    pub fn from_dates(mut dates: Vec<NaiveDate>) -> Self {
        dates.sort_unstable();
        dates.dedup();
        Self { dates }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn date_at(&self, index: usize) -> Option<NaiveDate> {
        self.dates.get(index).copied()
    }

    /// Trading-day index of `date`, if it is a trading day.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Index of the first trading day on or after `date`. Equals `len()`
    /// when `date` is past the last trading day.
    pub fn index_at_or_after(&self, date: NaiveDate) -> usize {
        self.dates.partition_point(|d| *d < date)
    }
}

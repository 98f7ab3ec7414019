//! Position-limit admission and the bookkeeping it relies on.

use crate::domain::ranking::RankedCandidate;
use crate::domain::trade::Trade;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

/// Admitted trades that have not yet exited as of the date being processed.
///
/// A trade takes its slot on the date it is admitted, which is earlier than
/// its entry date under an entry delay, and keeps it through its exit date
/// inclusive. It is released on the first later date.
#[derive(Debug, Default)]
pub struct OpenPositionSet {
    open: Vec<(NaiveDate, NaiveDate)>,
}

impl OpenPositionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, trade: &Trade) {
        self.open.push((trade.entry_date, trade.exit_date()));
    }

    /// Drop every position whose exit is before `date`.
    pub fn release_before(&mut self, date: NaiveDate) {
        self.open.retain(|&(_, exit)| exit >= date);
    }

    /// Slots taken on `date`, including trades admitted for a later entry.
    pub fn count_on(&self, date: NaiveDate) -> usize {
        self.open.iter().filter(|&&(_, exit)| date <= exit).count()
    }
}

/// Traded quotes already consumed by a trade, keyed by traded symbol.
#[derive(Debug, Default)]
pub struct CoveredQuotes {
    by_symbol: HashMap<String, HashSet<NaiveDate>>,
}

impl CoveredQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cover(&mut self, trade: &Trade) {
        let dates = self.by_symbol.entry(trade.traded_symbol.clone()).or_default();
        dates.extend(trade.quotes.iter().filter_map(|q| q.date));
    }

    pub fn contains(&self, symbol: &str, date: NaiveDate) -> bool {
        self.by_symbol
            .get(symbol)
            .is_some_and(|dates| dates.contains(&date))
    }
}

/// Slots left under `limit` given `open` positions. `None` means no limit.
pub fn available_slots(limit: Option<usize>, open: usize) -> usize {
    match limit {
        Some(limit) => limit.saturating_sub(open),
        None => usize::MAX,
    }
}

/// Split ranked candidates into the admitted head and the eligible rest.
pub fn split_admitted<'a>(
    ranked: Vec<RankedCandidate<'a>>,
    slots: usize,
) -> (Vec<RankedCandidate<'a>>, Vec<RankedCandidate<'a>>) {
    let mut admitted = ranked;
    let rest = if slots < admitted.len() {
        admitted.split_off(slots)
    } else {
        Vec::new()
    };
    (admitted, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::Instrument;
    use crate::domain::pairing::InstrumentPair;
    use crate::domain::quote::Quote;
    use crate::domain::scanner::CandidateEntry;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, n).unwrap()
    }

    fn trade(symbol: &str, from: u32, to: u32) -> Trade {
        let quotes: Vec<Quote> = (from..=to)
            .map(|d| Quote::ohlcv(symbol, day(d), 10.0, 10.0, 10.0, 10.0, 0))
            .collect();
        Trade {
            traded_symbol: symbol.into(),
            signal_symbol: None,
            entry_quote: quotes[0].clone(),
            quotes,
            exit_reason: "exit".into(),
            profit: 0.0,
            entry_date: day(from),
            sector: String::new(),
        }
    }

    #[test]
    fn slot_held_through_exit_day() {
        let mut open = OpenPositionSet::new();
        open.add(&trade("A", 3, 5));
        assert_eq!(open.count_on(day(3)), 1);
        assert_eq!(open.count_on(day(5)), 1);
        assert_eq!(open.count_on(day(6)), 0);
    }

    #[test]
    fn delayed_entry_reserves_slot_before_entry() {
        // Admitted on day 1 for an entry on day 3.
        let mut open = OpenPositionSet::new();
        open.add(&trade("A", 3, 5));
        open.release_before(day(1));
        assert_eq!(open.count_on(day(1)), 1);
        assert_eq!(open.count_on(day(2)), 1);
    }

    #[test]
    fn release_before_prunes_closed_positions() {
        let mut open = OpenPositionSet::new();
        open.add(&trade("A", 1, 2));
        open.add(&trade("B", 1, 9));
        open.release_before(day(4));
        assert_eq!(open.count_on(day(4)), 1);
    }

    #[test]
    fn covered_quotes_are_per_symbol() {
        let mut covered = CoveredQuotes::new();
        covered.cover(&trade("A", 1, 3));
        assert!(covered.contains("A", day(2)));
        assert!(!covered.contains("A", day(4)));
        assert!(!covered.contains("B", day(2)));
    }

    #[test]
    fn available_slots_never_negative() {
        assert_eq!(available_slots(Some(3), 1), 2);
        assert_eq!(available_slots(Some(2), 5), 0);
        assert_eq!(available_slots(None, 100), usize::MAX);
    }

    #[test]
    fn split_keeps_top_ranked() {
        let a = Instrument::new(
            "A".into(),
            String::new(),
            vec![Quote::ohlcv("A", day(1), 1.0, 1.0, 1.0, 1.0, 0)],
        );
        let ranked: Vec<RankedCandidate> = (0..4)
            .map(|i| RankedCandidate {
                candidate: CandidateEntry {
                    pair: InstrumentPair::own(&a),
                    signal_quote: &a.quotes[0],
                    traded_quote: &a.quotes[0],
                },
                score: 10.0 - i as f64,
            })
            .collect();
        let (admitted, rest) = split_admitted(ranked.clone(), 1);
        assert_eq!(admitted.len(), 1);
        assert_eq!(admitted[0].score, 10.0);
        assert_eq!(rest.len(), 3);

        let (admitted, rest) = split_admitted(ranked, usize::MAX);
        assert_eq!(admitted.len(), 4);
        assert!(rest.is_empty());
    }
}

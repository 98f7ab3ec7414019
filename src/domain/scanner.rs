//! Per-date candidate entry scanning.

use crate::domain::calendar::TradingCalendar;
use crate::domain::cooldown::CooldownTracker;
use crate::domain::error::SwingtestError;
use crate::domain::pairing::InstrumentPair;
use crate::domain::quote::Quote;
use crate::domain::signal::EntrySignal;
use chrono::NaiveDate;

/// A pair whose entry fired, with the signal and traded quotes it would
/// enter on. Both quotes share a date.
#[derive(Debug, Clone, Copy)]
pub struct CandidateEntry<'a> {
    pub pair: InstrumentPair<'a>,
    pub signal_quote: &'a Quote,
    pub traded_quote: &'a Quote,
}

impl<'a> CandidateEntry<'a> {
    pub fn entry_date(&self) -> Option<NaiveDate> {
        self.traded_quote.date
    }
}

#[derive(Debug, Default)]
pub struct ScanOutcome<'a> {
    pub candidates: Vec<CandidateEntry<'a>>,
    /// Pairs with data on the date that were skipped because of cooldown.
    pub blocked: usize,
}

/// Evaluate the entry signal for every pair on `date`, in pair order.
///
/// Pairs missing a quote on either side are skipped silently. While the
/// cooldown blocks `day_index` the entry signal is never called.
pub fn scan_candidates<'a>(
    pairs: &[InstrumentPair<'a>],
    date: NaiveDate,
    day_index: usize,
    cooldown: &CooldownTracker,
    entry: &dyn EntrySignal,
) -> Result<ScanOutcome<'a>, SwingtestError> {
    let mut outcome = ScanOutcome::default();

    for pair in pairs {
        let (Some(signal_quote), Some(traded_quote)) =
            (pair.signal.quote_on(date), pair.traded.quote_on(date))
        else {
            continue;
        };

        if cooldown.is_blocked(day_index) {
            outcome.blocked += 1;
            continue;
        }

        if entry.test(pair.signal, signal_quote)? {
            outcome.candidates.push(CandidateEntry {
                pair: *pair,
                signal_quote,
                traded_quote,
            });
        }
    }

    Ok(outcome)
}

/// Move candidates that fired on `day_index` onto the quotes of the trading
/// day `delay` positions later. Candidates without data there are dropped,
/// as are all of them when the delayed day falls off the calendar.
pub fn delay_candidates<'a>(
    candidates: Vec<CandidateEntry<'a>>,
    calendar: &TradingCalendar,
    day_index: usize,
    delay: usize,
) -> Vec<CandidateEntry<'a>> {
    if delay == 0 {
        return candidates;
    }
    let Some(delayed) = calendar.date_at(day_index + delay) else {
        return Vec::new();
    };
    candidates
        .into_iter()
        .filter_map(|c| {
            let signal_quote = c.pair.signal.quote_on(delayed)?;
            let traded_quote = c.pair.traded.quote_on(delayed)?;
            Some(CandidateEntry {
                pair: c.pair,
                signal_quote,
                traded_quote,
            })
        })
        .collect()
}

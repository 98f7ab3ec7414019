//! Trades and the forward exit simulation that builds them.

use crate::domain::error::SwingtestError;
use crate::domain::quote::Quote;
use crate::domain::scanner::CandidateEntry;
use crate::domain::signal::ExitSignal;
use chrono::NaiveDate;

/// A completed round trip on the traded instrument.
///
/// Prices always come from the traded instrument; `signal_symbol` records
/// the instrument whose quotes drove the decisions when it differs.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub traded_symbol: String,
    pub signal_symbol: Option<String>,
    pub entry_quote: Quote,
    /// Traded-instrument quotes from entry through exit, inclusive.
    pub quotes: Vec<Quote>,
    pub exit_reason: String,
    pub profit: f64,
    pub entry_date: NaiveDate,
    pub sector: String,
}

/// Price path statistics for a single trade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExcursionMetrics {
    /// Highest close-to-entry gain in percent, never below 0.
    pub mfe_pct: f64,
    /// Deepest close-to-entry loss in percent, never above 0.
    pub mae_pct: f64,
    pub mfe_atr: f64,
    /// Reported as a positive distance.
    pub mae_atr: f64,
    pub mfe_reached: bool,
}

impl Trade {
    pub fn exit_quote(&self) -> Option<&Quote> {
        self.quotes.last()
    }

    pub fn exit_date(&self) -> NaiveDate {
        self.exit_quote()
            .and_then(|q| q.date)
            .unwrap_or(self.entry_date)
    }

    pub fn exit_close(&self) -> f64 {
        self.exit_quote().map_or(self.entry_quote.close, |q| q.close)
    }

    pub fn profit_pct(&self) -> f64 {
        if self.entry_quote.close == 0.0 {
            return 0.0;
        }
        self.profit / self.entry_quote.close * 100.0
    }

    /// Calendar days between entry and exit.
    pub fn holding_days(&self) -> i64 {
        (self.exit_date() - self.entry_date).num_days()
    }

    pub fn is_win(&self) -> bool {
        self.profit > 0.0
    }

    /// Whether `date` lies within entry..=exit.
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.entry_date && date <= self.exit_date()
    }

    pub fn excursion(&self) -> ExcursionMetrics {
        let entry_price = self.entry_quote.close;
        let entry_atr = self.entry_quote.atr;

        let mut mfe_pct = 0.0_f64;
        let mut mae_pct = 0.0_f64;
        let mut mfe_atr = 0.0_f64;
        let mut mae_atr = 0.0_f64;

        if entry_price != 0.0 {
            for quote in &self.quotes {
                let move_pct = (quote.close - entry_price) / entry_price * 100.0;
                let move_atr = if entry_atr != 0.0 {
                    (quote.close - entry_price) / entry_atr
                } else {
                    0.0
                };
                if move_pct > mfe_pct {
                    mfe_pct = move_pct;
                    mfe_atr = move_atr;
                }
                if move_pct < mae_pct {
                    mae_pct = move_pct;
                    mae_atr = move_atr;
                }
            }
        }

        ExcursionMetrics {
            mfe_pct,
            mae_pct,
            mfe_atr,
            mae_atr: mae_atr.abs(),
            mfe_reached: mfe_pct > 0.0,
        }
    }
}

/// Run the exit signal forward from a candidate's entry and materialise
/// the trade.
///
/// Only signal-instrument quotes dated strictly after the entry are
/// checked, in order, and the first non-empty exit wins. Returns `None`
/// when no exit fires in the available data, or when the traded
/// instrument has no quote on the exit date.
pub fn build_trade(
    candidate: &CandidateEntry<'_>,
    exit: &dyn ExitSignal,
) -> Result<Option<Trade>, SwingtestError> {
    let (Some(entry_date), Some(signal_entry_date)) =
        (candidate.traded_quote.date, candidate.signal_quote.date)
    else {
        return Ok(None);
    };
    let signal = candidate.pair.signal;
    let traded = candidate.pair.traded;

    for current in signal.quotes_after(signal_entry_date) {
        let decision = exit.check(signal, candidate.signal_quote, current)?;
        if !decision.is_exit() {
            continue;
        }
        let Some(exit_date) = current.date else {
            continue;
        };
        let Some(traded_exit) = traded.quote_on(exit_date) else {
            return Ok(None);
        };

        return Ok(Some(Trade {
            traded_symbol: traded.symbol.clone(),
            signal_symbol: candidate.pair.signal_symbol().map(str::to_string),
            entry_quote: candidate.traded_quote.clone(),
            quotes: traded.quotes_between(entry_date, exit_date),
            exit_reason: decision.reason,
            profit: traded_exit.close - candidate.traded_quote.close,
            entry_date,
            sector: traded.sector.clone(),
        }));
    }

    Ok(None)
}

#![allow(dead_code)]

use chrono::NaiveDate;
use swingtest::domain::backtest::BacktestConfig;
use swingtest::domain::error::SwingtestError;
use swingtest::domain::instrument::{Instrument, InstrumentStore};
pub use swingtest::domain::quote::Quote;
use swingtest::domain::signal::ExitDecision;
use swingtest::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Quote>>,
    pub sectors: HashMap<String, String>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            sectors: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_quotes(mut self, symbol: &str, quotes: Vec<Quote>) -> Self {
        self.data.insert(symbol.to_string(), quotes);
        self
    }

    pub fn with_sector(mut self, symbol: &str, sector: &str) -> Self {
        self.sectors.insert(symbol.to_string(), sector.to_string());
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_quotes(&self, symbol: &str) -> Result<Vec<Quote>, SwingtestError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(SwingtestError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, SwingtestError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SwingtestError> {
        let dates: Vec<NaiveDate> = self
            .data
            .get(symbol)
            .map(|qs| qs.iter().filter_map(|q| q.date).collect())
            .unwrap_or_default();
        match (dates.iter().min(), dates.iter().max()) {
            (Some(&min), Some(&max)) => Ok(Some((min, max, dates.len()))),
            _ => Ok(None),
        }
    }

    fn sector_of(&self, symbol: &str) -> Option<String> {
        self.sectors.get(symbol).cloned()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// First trading day used by the generated series.
pub fn day0() -> NaiveDate {
    date(2024, 1, 1)
}

pub fn day(index: usize) -> NaiveDate {
    day0() + chrono::Duration::days(index as i64)
}

pub fn make_quote(symbol: &str, index: usize, open: f64, close: f64) -> Quote {
    Quote::ohlcv(
        symbol,
        day(index),
        open,
        open.max(close) + 1.0,
        open.min(close) - 1.0,
        close,
        1000,
    )
}

/// Consecutive daily quotes with open equal to close.
pub fn series(symbol: &str, closes: &[f64]) -> Vec<Quote> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_quote(symbol, i, c, c))
        .collect()
}

pub fn series_with_opens(symbol: &str, opens: &[f64], closes: &[f64]) -> Vec<Quote> {
    opens
        .iter()
        .zip(closes)
        .enumerate()
        .map(|(i, (&o, &c))| make_quote(symbol, i, o, c))
        .collect()
}

pub fn instrument(symbol: &str, quotes: Vec<Quote>) -> Instrument {
    Instrument::new(symbol.to_string(), String::new(), quotes)
}

pub fn flat_instrument(symbol: &str, days: usize) -> Instrument {
    instrument(symbol, series(symbol, &vec![100.0; days]))
}

pub fn store(instruments: Vec<Instrument>) -> InstrumentStore {
    InstrumentStore::from_instruments(instruments)
}

pub fn config_for_days(days: usize) -> BacktestConfig {
    BacktestConfig::new(day0(), day(days.saturating_sub(1)))
}

pub fn index_of(date: NaiveDate) -> usize {
    (date - day0()).num_days() as usize
}

/// Entry that fires on the given day indices of one symbol.
pub fn entry_on(
    symbol: &'static str,
    indices: Vec<usize>,
) -> impl Fn(&Instrument, &Quote) -> Result<bool, SwingtestError> {
    move |inst: &Instrument, quote: &Quote| {
        Ok(inst.symbol == symbol && quote.date.is_some_and(|d| indices.contains(&index_of(d))))
    }
}

pub fn always_enter() -> impl Fn(&Instrument, &Quote) -> Result<bool, SwingtestError> {
    |_: &Instrument, _: &Quote| Ok(true)
}

/// Exit `days` trading days after entry.
pub fn exit_after(
    days: i64,
) -> impl Fn(&Instrument, &Quote, &Quote) -> Result<ExitDecision, SwingtestError> {
    move |_: &Instrument, entry: &Quote, current: &Quote| {
        let held = match (entry.date, current.date) {
            (Some(e), Some(c)) => (c - e).num_days(),
            _ => 0,
        };
        if held >= days {
            Ok(ExitDecision::exit("Time exit"))
        } else {
            Ok(ExitDecision::hold())
        }
    }
}

pub fn entry_indices(trades: &[&swingtest::domain::trade::Trade]) -> Vec<usize> {
    trades.iter().map(|t| index_of(t.entry_date)).collect()
}

//! Universe loading.
//!
//! Parses the configured symbol list and loads the traded instruments plus
//! every underlying asset their signals need into an [`InstrumentStore`].

use crate::domain::error::SwingtestError;
use crate::domain::instrument::{Instrument, InstrumentStore};
use crate::domain::pairing::required_underlyings;
use crate::ports::data_port::DataPort;
use log::{info, warn};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

/// Instruments loaded for a run and the traded symbols that had data.
#[derive(Debug)]
pub struct Universe {
    pub store: InstrumentStore,
    pub traded: Vec<String>,
    pub skipped: Vec<String>,
}

impl Universe {
    pub fn traded_instruments(&self) -> Vec<&Instrument> {
        self.store.select(&self.traded)
    }
}

fn load_instrument(
    data_port: &dyn DataPort,
    symbol: &str,
) -> Result<Option<Instrument>, SwingtestError> {
    let quotes = match data_port.fetch_quotes(symbol) {
        Ok(q) => q,
        Err(SwingtestError::DataSource { reason }) => {
            warn!("skipping {} ({})", symbol, reason);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    if quotes.is_empty() {
        warn!("skipping {} (no data found)", symbol);
        return Ok(None);
    }
    let sector = data_port.sector_of(symbol).unwrap_or_default();
    Ok(Some(Instrument::new(symbol.to_string(), sector, quotes)))
}

/// Load `symbols` and the underlying assets they map to.
///
/// Traded symbols without data are skipped with a warning. Missing
/// underlying assets are left out of the store so pair resolution can
/// report all of them at once. Fails with `NoData` when no traded symbol
/// has data.
pub fn load_universe(
    data_port: &dyn DataPort,
    symbols: &[String],
    use_underlying: bool,
    overrides: &HashMap<String, String>,
) -> Result<Universe, SwingtestError> {
    let mut store = InstrumentStore::new();
    let mut traded = Vec::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        match load_instrument(data_port, symbol)? {
            Some(instrument) => {
                info!("{}: {} quotes", symbol, instrument.quote_count());
                store.insert(instrument);
                traded.push(symbol.clone());
            }
            None => skipped.push(symbol.clone()),
        }
    }

    if traded.is_empty() {
        return Err(SwingtestError::NoData {
            symbol: symbols.join(", "),
        });
    }

    for symbol in required_underlyings(&traded, use_underlying, overrides) {
        if let Some(instrument) = load_instrument(data_port, &symbol)? {
            info!("{}: {} quotes (underlying)", symbol, instrument.quote_count());
            store.insert(instrument);
        }
    }

    if !skipped.is_empty() {
        info!(
            "backtesting {} of {} symbols",
            traded.len(),
            traded.len() + skipped.len()
        );
    }

    Ok(Universe {
        store,
        traded,
        skipped,
    })
}

//! Traded/signal instrument pairing.
//!
//! A traded instrument may take its entry and exit signals from another
//! instrument, typically a leveraged ETF driven by the index it tracks.
//! Resolution order: explicit override, then the built-in leveraged-ETF
//! table, then the instrument itself.

use crate::domain::error::SwingtestError;
use crate::domain::instrument::{Instrument, InstrumentLookup};
use log::warn;
use std::collections::HashMap;

/// Leveraged and inverse ETFs mapped to the asset they track.
const LEVERAGED_UNDERLYING: &[(&str, &str)] = &[
    ("TQQQ", "QQQ"),
    ("SQQQ", "QQQ"),
    ("QLD", "QQQ"),
    ("QID", "QQQ"),
    ("UPRO", "SPY"),
    ("SPXU", "SPY"),
    ("SSO", "SPY"),
    ("SDS", "SPY"),
    ("SOXL", "SOXX"),
    ("SOXS", "SOXX"),
    ("TNA", "IWM"),
    ("TZA", "IWM"),
    ("UWM", "IWM"),
    ("TWM", "IWM"),
    ("UDOW", "DIA"),
    ("SDOW", "DIA"),
    ("FAS", "XLF"),
    ("FAZ", "XLF"),
    ("ERX", "XLE"),
    ("ERY", "XLE"),
    ("TECL", "XLK"),
    ("TECS", "XLK"),
    ("LABU", "XBI"),
    ("LABD", "XBI"),
    ("NUGT", "GDX"),
    ("DUST", "GDX"),
    ("GUSH", "XOP"),
    ("DRIP", "XOP"),
    ("EDC", "EEM"),
    ("EDZ", "EEM"),
];

/// Built-in underlying for `symbol`, case-insensitive.
pub fn default_underlying(symbol: &str) -> Option<&'static str> {
    let upper = symbol.to_uppercase();
    LEVERAGED_UNDERLYING
        .iter()
        .find(|(leveraged, _)| *leveraged == upper)
        .map(|(_, underlying)| *underlying)
}

/// Symbol whose quotes drive signals for `traded`.
pub fn signal_symbol_for(
    traded: &str,
    use_underlying: bool,
    overrides: &HashMap<String, String>,
) -> String {
    if !use_underlying {
        return traded.to_string();
    }
    if let Some(custom) = overrides.get(traded) {
        return custom.clone();
    }
    default_underlying(traded)
        .map(str::to_string)
        .unwrap_or_else(|| traded.to_string())
}

/// A traded instrument and the instrument that drives its signals.
#[derive(Debug, Clone, Copy)]
pub struct InstrumentPair<'a> {
    pub traded: &'a Instrument,
    pub signal: &'a Instrument,
}

impl<'a> InstrumentPair<'a> {
    pub fn own(instrument: &'a Instrument) -> Self {
        Self {
            traded: instrument,
            signal: instrument,
        }
    }

    /// The signal symbol, only when it differs from the traded one.
    pub fn signal_symbol(&self) -> Option<&'a str> {
        if self.signal.symbol == self.traded.symbol {
            None
        } else {
            Some(self.signal.symbol.as_str())
        }
    }
}

/// Resolve a pair for every traded instrument, in input order.
///
/// Fails before anything else runs if any resolved signal symbol is absent
/// from `lookup`; the error names every missing symbol once.
pub fn resolve_pairs<'a>(
    traded: &[&'a Instrument],
    use_underlying: bool,
    overrides: &HashMap<String, String>,
    lookup: &'a dyn InstrumentLookup,
) -> Result<Vec<InstrumentPair<'a>>, SwingtestError> {
    let mut pairs = Vec::with_capacity(traded.len());
    let mut missing: Vec<String> = Vec::new();

    for &instrument in traded {
        let signal_symbol = signal_symbol_for(&instrument.symbol, use_underlying, overrides);
        if signal_symbol == instrument.symbol {
            pairs.push(InstrumentPair::own(instrument));
            continue;
        }
        match lookup.instrument(&signal_symbol) {
            Some(signal) => pairs.push(InstrumentPair {
                traded: instrument,
                signal,
            }),
            None => {
                warn!(
                    "missing underlying asset {} (for {})",
                    signal_symbol, instrument.symbol
                );
                if !missing.contains(&signal_symbol) {
                    missing.push(signal_symbol);
                }
            }
        }
    }

    if missing.is_empty() {
        Ok(pairs)
    } else {
        Err(SwingtestError::MissingUnderlying { symbols: missing })
    }
}

/// Symbols that must be loaded alongside `traded` for pairing to succeed.
pub fn required_underlyings(
    traded: &[String],
    use_underlying: bool,
    overrides: &HashMap<String, String>,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for symbol in traded {
        let signal = signal_symbol_for(symbol, use_underlying, overrides);
        if signal != *symbol && !traded.contains(&signal) && !out.contains(&signal) {
            out.push(signal);
        }
    }
    out
}

//! CSV file data adapter.
//!
//! One file per symbol, `<data_dir>/<SYMBOL>.csv`, with a header row. The
//! OHLCV columns are required; indicator columns (`ema5`, `ema10`, `ema20`,
//! `ema50`, `atr`, `heatmap`, `sector_heatmap`, `donchian_upper`) and the
//! `signal` flag column are optional. An optional `sectors.csv` with
//! `symbol,sector` rows supplies sectors.

use crate::domain::error::SwingtestError;
use crate::domain::quote::{Quote, SignalFlag};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use log::warn;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

const SECTORS_FILE: &str = "sectors.csv";

#[derive(Debug, Deserialize)]
struct QuoteRecord {
    #[serde(default)]
    date: Option<String>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
    #[serde(default)]
    ema5: Option<f64>,
    #[serde(default)]
    ema10: Option<f64>,
    #[serde(default)]
    ema20: Option<f64>,
    #[serde(default)]
    ema50: Option<f64>,
    #[serde(default)]
    atr: Option<f64>,
    #[serde(default)]
    heatmap: Option<f64>,
    #[serde(default)]
    sector_heatmap: Option<f64>,
    #[serde(default)]
    donchian_upper: Option<f64>,
    #[serde(default)]
    signal: Option<String>,
}

impl QuoteRecord {
    fn into_quote(self, symbol: &str, row: usize) -> Result<Quote, SwingtestError> {
        let date = match self.date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(s) => Some(NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
                SwingtestError::DataSource {
                    reason: format!("{} row {}: invalid date '{}': {}", symbol, row, s, e),
                }
            })?),
        };
        let signal = match self.signal.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(s) => Some(SignalFlag::parse(s).ok_or_else(|| SwingtestError::DataSource {
                reason: format!("{} row {}: invalid signal '{}'", symbol, row, s),
            })?),
        };

        Ok(Quote {
            symbol: symbol.to_string(),
            date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            ema5: self.ema5.unwrap_or(0.0),
            ema10: self.ema10.unwrap_or(0.0),
            ema20: self.ema20.unwrap_or(0.0),
            ema50: self.ema50.unwrap_or(0.0),
            atr: self.atr.unwrap_or(0.0),
            heatmap: self.heatmap.unwrap_or(0.0),
            sector_heatmap: self.sector_heatmap.unwrap_or(0.0),
            donchian_upper: self.donchian_upper.unwrap_or(0.0),
            signal,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SectorRecord {
    symbol: String,
    sector: String,
}

pub struct CsvAdapter {
    base_path: PathBuf,
    sectors: HashMap<String, String>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        let sectors = load_sectors(&base_path.join(SECTORS_FILE));
        Self { base_path, sectors }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn load_sectors(path: &PathBuf) -> HashMap<String, String> {
    if !path.exists() {
        return HashMap::new();
    }
    let mut rdr = match csv::Reader::from_path(path) {
        Ok(r) => r,
        Err(e) => {
            warn!("ignoring {}: {}", path.display(), e);
            return HashMap::new();
        }
    };
    let mut sectors = HashMap::new();
    for result in rdr.deserialize::<SectorRecord>() {
        match result {
            Ok(rec) => {
                sectors.insert(rec.symbol.trim().to_uppercase(), rec.sector.trim().to_string());
            }
            Err(e) => warn!("skipping sector row in {}: {}", path.display(), e),
        }
    }
    sectors
}

impl DataPort for CsvAdapter {
    fn fetch_quotes(&self, symbol: &str) -> Result<Vec<Quote>, SwingtestError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| SwingtestError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut quotes = Vec::new();
        let mut dateless = 0usize;

        for (i, result) in rdr.deserialize::<QuoteRecord>().enumerate() {
            let record = result.map_err(|e| SwingtestError::DataSource {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;
            let quote = record.into_quote(symbol, i + 1)?;
            if quote.date.is_some() {
                quotes.push(quote);
            } else {
                dateless += 1;
            }
        }

        if dateless > 0 {
            warn!("{}: skipped {} row(s) without a date", path.display(), dateless);
        }

        quotes.sort_by_key(|q| q.date);
        Ok(quotes)
    }

    fn list_symbols(&self) -> Result<Vec<String>, SwingtestError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SwingtestError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SwingtestError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if name_str == SECTORS_FILE {
                continue;
            }
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SwingtestError> {
        let dates: Vec<NaiveDate> = self
            .fetch_quotes(symbol)?
            .iter()
            .filter_map(|q| q.date)
            .collect();
        Ok(match (dates.first(), dates.last()) {
            (Some(&first), Some(&last)) => Some((first, last, dates.len())),
            _ => None,
        })
    }

    fn sector_of(&self, symbol: &str) -> Option<String> {
        self.sectors.get(&symbol.to_uppercase()).cloned()
    }
}

//! Trade ledger CSV adapter implementing `ReportPort`.
//!
//! Writes one row per admitted and missed trade, admitted trades first in
//! entry-date order, with a `status` column of `winning`, `losing` or
//! `missed`.

use crate::domain::backtest::BacktestReport;
use crate::domain::error::SwingtestError;
use crate::domain::strategy::Strategy;
use crate::domain::trade::Trade;
use crate::ports::report_port::ReportPort;
use log::info;
use serde::Serialize;
use std::fs::File;
use std::io::Write;

#[derive(Debug, Serialize)]
struct TradeRow<'a> {
    strategy: &'a str,
    status: &'static str,
    symbol: &'a str,
    signal_symbol: &'a str,
    sector: &'a str,
    entry_date: String,
    exit_date: String,
    entry_close: f64,
    exit_close: f64,
    profit: f64,
    profit_pct: f64,
    holding_days: i64,
    mfe_pct: f64,
    mae_pct: f64,
    exit_reason: &'a str,
}

impl<'a> TradeRow<'a> {
    fn new(strategy: &'a str, status: &'static str, trade: &'a Trade) -> Self {
        let excursion = trade.excursion();
        Self {
            strategy,
            status,
            symbol: &trade.traded_symbol,
            signal_symbol: trade.signal_symbol.as_deref().unwrap_or(""),
            sector: &trade.sector,
            entry_date: trade.entry_date.to_string(),
            exit_date: trade.exit_date().to_string(),
            entry_close: trade.entry_quote.close,
            exit_close: trade.exit_close(),
            profit: round4(trade.profit),
            profit_pct: round4(trade.profit_pct()),
            holding_days: trade.holding_days(),
            mfe_pct: round4(excursion.mfe_pct),
            mae_pct: round4(excursion.mae_pct),
            exit_reason: &trade.exit_reason,
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Serialize the ledger into any writer.
    pub fn write_to<W: Write>(
        &self,
        writer: W,
        report: &BacktestReport,
        strategy: &Strategy,
    ) -> Result<(), SwingtestError> {
        let mut wtr = csv::Writer::from_writer(writer);
        let name = strategy.name.as_str();

        for trade in report.trades() {
            let status = if trade.is_win() { "winning" } else { "losing" };
            wtr.serialize(TradeRow::new(name, status, trade))
                .map_err(csv_error)?;
        }
        for trade in &report.missed_trades {
            wtr.serialize(TradeRow::new(name, "missed", trade))
                .map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn csv_error(e: csv::Error) -> SwingtestError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => SwingtestError::Io(io),
        other => SwingtestError::Io(std::io::Error::other(format!("{:?}", other))),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        report: &BacktestReport,
        strategy: &Strategy,
        output_path: &str,
    ) -> Result<(), SwingtestError> {
        let file = File::create(output_path)?;
        self.write_to(file, report, strategy)?;
        info!(
            "wrote {} trades and {} missed trades to {}",
            report.total_trades(),
            report.missed_trades.len(),
            output_path
        );
        Ok(())
    }
}

//! Backtest engine and date-ordered event loop.
//!
//! One call to [`run_backtest`] owns all mutable state for the run (cooldown,
//! open positions, dedup ledgers), so independent runs can execute on
//! separate threads over the same instruments.

use crate::domain::admission::{
    available_slots, split_admitted, CoveredQuotes, OpenPositionSet,
};
use crate::domain::calendar::TradingCalendar;
use crate::domain::cooldown::CooldownTracker;
use crate::domain::error::SwingtestError;
use crate::domain::instrument::{Instrument, InstrumentLookup};
use crate::domain::pairing::resolve_pairs;
use crate::domain::ranking::{rank_candidates, Ranker};
use crate::domain::scanner::{delay_candidates, scan_candidates};
use crate::domain::signal::{EntrySignal, ExitSignal};
use crate::domain::trade::{build_trade, Trade};
use chrono::NaiveDate;
use log::{debug, info};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// `None` admits every candidate.
    pub max_positions: Option<usize>,
    /// Trading days blocked after any exit; 0 disables the cooldown.
    pub cooldown_days: usize,
    pub use_underlying_assets: bool,
    /// Traded symbol → signal symbol, checked before the built-in table.
    pub underlying_overrides: HashMap<String, String>,
    pub entry_delay_days: usize,
}

impl BacktestConfig {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            max_positions: None,
            cooldown_days: 0,
            use_underlying_assets: true,
            underlying_overrides: HashMap::new(),
            entry_delay_days: 0,
        }
    }

    pub fn validate(&self) -> Result<(), SwingtestError> {
        if self.start_date > self.end_date {
            return Err(SwingtestError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        Ok(())
    }
}

/// The decision functions a run is parameterised with.
#[derive(Clone, Copy)]
pub struct Signals<'s> {
    pub entry: &'s dyn EntrySignal,
    pub exit: &'s dyn ExitSignal,
    pub ranker: &'s dyn Ranker,
}

/// Informational counters gathered during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub trading_days: usize,
    pub pairs: usize,
    pub candidates: usize,
    pub cooldown_blocked: usize,
    pub deduplicated: usize,
    pub admitted: usize,
    pub missed: usize,
    /// Candidates that produced no trade: no exit in the data, or no traded
    /// quote on the exit date.
    pub voided: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktestReport {
    pub winning_trades: Vec<Trade>,
    pub losing_trades: Vec<Trade>,
    pub missed_trades: Vec<Trade>,
    pub stats: RunStats,
}

impl BacktestReport {
    /// Split admitted trades by sign of profit; zero counts as a loss.
    pub fn from_trades(trades: Vec<Trade>, missed_trades: Vec<Trade>, stats: RunStats) -> Self {
        let (winning_trades, losing_trades) = trades.into_iter().partition(Trade::is_win);
        Self {
            winning_trades,
            losing_trades,
            missed_trades,
            stats,
        }
    }

    pub fn total_trades(&self) -> usize {
        self.winning_trades.len() + self.losing_trades.len()
    }

    /// All admitted trades ordered by entry date; same-day trades keep
    /// winners before losers.
    pub fn trades(&self) -> Vec<&Trade> {
        let mut all: Vec<&Trade> = self
            .winning_trades
            .iter()
            .chain(self.losing_trades.iter())
            .collect();
        all.sort_by_key(|t| t.entry_date);
        all
    }
}

struct Progress {
    total: usize,
    last_logged: usize,
}

impl Progress {
    fn new(total: usize) -> Self {
        Self {
            total,
            last_logged: 0,
        }
    }

    fn tick(&mut self, index: usize, trades: usize) {
        if self.total == 0 {
            return;
        }
        let pct = (index + 1) * 100 / self.total;
        if pct >= self.last_logged + 5 && pct < 100 {
            info!(
                "backtest progress: {}% ({}/{} days, {} trades)",
                pct,
                index + 1,
                self.total,
                trades
            );
            self.last_logged = pct;
        }
    }
}

/// Run a backtest over `traded` between the configured dates.
///
/// `lookup` resolves signal instruments for underlying-asset substitution.
/// Every missing signal instrument is reported at once before any date is
/// processed. Errors from the signals abort the run.
pub fn run_backtest<'a>(
    traded: &[&'a Instrument],
    lookup: &'a dyn InstrumentLookup,
    signals: &Signals<'_>,
    config: &BacktestConfig,
) -> Result<BacktestReport, SwingtestError> {
    config.validate()?;
    let pairs = resolve_pairs(
        traded,
        config.use_underlying_assets,
        &config.underlying_overrides,
        lookup,
    )?;
    let calendar =
        TradingCalendar::build(traded.iter().copied(), config.start_date, config.end_date);

    info!(
        "backtest {} to {}: {} instruments, {} trading days, max positions {}, cooldown {}",
        config.start_date,
        config.end_date,
        pairs.len(),
        calendar.len(),
        config
            .max_positions
            .map_or_else(|| "unlimited".to_string(), |n| n.to_string()),
        config.cooldown_days
    );

    let mut stats = RunStats {
        trading_days: calendar.len(),
        pairs: pairs.len(),
        ..RunStats::default()
    };
    let mut cooldown = CooldownTracker::new(config.cooldown_days);
    let mut open = OpenPositionSet::new();
    let mut covered_by_trades = CoveredQuotes::new();
    let mut covered_by_missed = CoveredQuotes::new();
    let mut trades: Vec<Trade> = Vec::new();
    let mut missed: Vec<Trade> = Vec::new();
    let mut progress = Progress::new(calendar.len());

    for (index, &date) in calendar.dates().iter().enumerate() {
        progress.tick(index, trades.len());

        let scan = scan_candidates(&pairs, date, index, &cooldown, signals.entry)?;
        stats.cooldown_blocked += scan.blocked;
        stats.candidates += scan.candidates.len();
        if scan.candidates.is_empty() {
            continue;
        }

        let fresh: Vec<_> =
            delay_candidates(scan.candidates, &calendar, index, config.entry_delay_days)
                .into_iter()
                .filter(|c| {
                    let covered = c.entry_date().is_some_and(|d| {
                        covered_by_trades.contains(&c.pair.traded.symbol, d)
                    });
                    if covered {
                        stats.deduplicated += 1;
                    }
                    !covered
                })
                .collect();
        let ranked = rank_candidates(fresh, signals.ranker)?;

        open.release_before(date);
        let open_count = open.count_on(date);
        let slots = available_slots(config.max_positions, open_count);
        let (admitted, rest) = split_admitted(ranked, slots);
        debug!(
            "{}: {} open, {} slots, {} admitted, {} over the limit",
            date,
            open_count,
            slots,
            admitted.len(),
            rest.len()
        );

        for ranked in admitted {
            let candidate = ranked.candidate;
            let Some(entry_date) = candidate.entry_date() else {
                continue;
            };
            if covered_by_trades.contains(&candidate.pair.traded.symbol, entry_date) {
                stats.deduplicated += 1;
                continue;
            }
            match build_trade(&candidate, signals.exit)? {
                Some(trade) => {
                    cooldown.record_exit(calendar.index_at_or_after(trade.exit_date()));
                    open.add(&trade);
                    covered_by_trades.cover(&trade);
                    stats.admitted += 1;
                    trades.push(trade);
                }
                None => stats.voided += 1,
            }
        }

        for ranked in rest {
            let candidate = ranked.candidate;
            let Some(entry_date) = candidate.entry_date() else {
                continue;
            };
            let symbol = &candidate.pair.traded.symbol;
            if covered_by_missed.contains(symbol, entry_date)
                || covered_by_trades.contains(symbol, entry_date)
            {
                stats.deduplicated += 1;
                continue;
            }
            match build_trade(&candidate, signals.exit)? {
                Some(trade) => {
                    cooldown.record_exit(calendar.index_at_or_after(trade.exit_date()));
                    covered_by_missed.cover(&trade);
                    stats.missed += 1;
                    missed.push(trade);
                }
                None => stats.voided += 1,
            }
        }
    }

    info!(
        "backtest complete: {} trades, {} missed, {} candidates ({} blocked by cooldown)",
        trades.len(),
        missed.len(),
        stats.candidates,
        stats.cooldown_blocked
    );

    Ok(BacktestReport::from_trades(trades, missed, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quote::Quote;
    use crate::domain::ranking::HeatmapRanker;
    use crate::domain::signal::ExitDecision;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, n).unwrap()
    }

    fn inst(symbol: &str, closes: &[f64]) -> Instrument {
        let quotes = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Quote::ohlcv(symbol, day(i as u32 + 1), c, c, c, c, 0))
            .collect();
        Instrument::new(symbol.into(), String::new(), quotes)
    }

    fn entry_at_least(level: f64) -> impl Fn(&Instrument, &Quote) -> Result<bool, SwingtestError> {
        move |_: &Instrument, q: &Quote| Ok(q.close >= level)
    }

    fn exit_after_one_day() -> impl Fn(&Instrument, &Quote, &Quote) -> Result<ExitDecision, SwingtestError>
    {
        |_: &Instrument, _: &Quote, _: &Quote| Ok(ExitDecision::exit("next day"))
    }

    #[test]
    fn config_rejects_inverted_range() {
        let config = BacktestConfig::new(day(10), day(1));
        assert!(matches!(
            config.validate(),
            Err(SwingtestError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn invalid_range_fails_before_any_signal() {
        let a = inst("A", &[100.0, 101.0]);
        let lookup: HashMap<String, Instrument> = HashMap::new();
        let entry = |_: &Instrument, _: &Quote| -> Result<bool, SwingtestError> {
            panic!("entry evaluated")
        };
        let exit = exit_after_one_day();
        let signals = Signals {
            entry: &entry,
            exit: &exit,
            ranker: &HeatmapRanker,
        };
        let result = run_backtest(&[&a], &lookup, &signals, &BacktestConfig::new(day(5), day(1)));
        assert!(result.is_err());
    }

    #[test]
    fn report_partitions_by_profit_sign() {
        // Entries on days 1 and 3; day 2 is covered by the first trade.
        let a = inst("A", &[100.0, 102.0, 102.0, 101.0]);
        let lookup: HashMap<String, Instrument> = HashMap::new();
        let entry = entry_at_least(100.0);
        let exit = exit_after_one_day();
        let signals = Signals {
            entry: &entry,
            exit: &exit,
            ranker: &HeatmapRanker,
        };
        let report =
            run_backtest(&[&a], &lookup, &signals, &BacktestConfig::new(day(1), day(31))).unwrap();
        assert_eq!(report.total_trades(), 2);
        assert_eq!(report.winning_trades.len(), 1);
        assert_eq!(report.losing_trades.len(), 1);
        assert_eq!(report.stats.deduplicated, 1);
        let entries: Vec<NaiveDate> = report.trades().iter().map(|t| t.entry_date).collect();
        assert_eq!(entries, vec![day(1), day(3)]);
    }

    #[test]
    fn stats_count_days_and_pairs() {
        let a = inst("A", &[90.0, 91.0, 92.0]);
        let b = inst("B", &[90.0, 91.0]);
        let lookup: HashMap<String, Instrument> = HashMap::new();
        let entry = entry_at_least(100.0);
        let exit = exit_after_one_day();
        let signals = Signals {
            entry: &entry,
            exit: &exit,
            ranker: &HeatmapRanker,
        };
        let report = run_backtest(
            &[&a, &b],
            &lookup,
            &signals,
            &BacktestConfig::new(day(1), day(31)),
        )
        .unwrap();
        assert_eq!(report.stats.trading_days, 3);
        assert_eq!(report.stats.pairs, 2);
        assert_eq!(report.stats.candidates, 0);
        assert_eq!(report.total_trades(), 0);
    }

    #[test]
    fn last_day_entry_without_exit_is_voided() {
        let a = inst("A", &[90.0, 100.0]);
        let lookup: HashMap<String, Instrument> = HashMap::new();
        let entry = entry_at_least(100.0);
        let exit = exit_after_one_day();
        let signals = Signals {
            entry: &entry,
            exit: &exit,
            ranker: &HeatmapRanker,
        };
        let report =
            run_backtest(&[&a], &lookup, &signals, &BacktestConfig::new(day(1), day(31))).unwrap();
        assert_eq!(report.total_trades(), 0);
        assert_eq!(report.stats.voided, 1);
    }
}

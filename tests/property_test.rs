//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Cooldown: no entry lands within the cooldown window after any exit
//! 2. Position limit: admitted trades never overlap more than the limit,
//!    with or without an entry delay
//! 3. Admission order: admitted trades outscore same-day missed trades
//! 4. No overlap: an instrument never holds two admitted trades at once
//! 5. Determinism: identical inputs give identical reports

mod common;

use common::*;
use proptest::prelude::*;
use std::collections::HashMap;
use swingtest::domain::backtest::{run_backtest, BacktestConfig, BacktestReport, Signals};
use swingtest::domain::error::SwingtestError;
use swingtest::domain::instrument::Instrument;
use swingtest::domain::ranking::HeatmapRanker;
use swingtest::domain::trade::Trade;

const DAYS: usize = 24;

#[derive(Debug, Clone)]
struct Scenario {
    signals: Vec<Vec<bool>>,
    /// Per instrument, per day.
    heatmaps: Vec<Vec<f64>>,
    hold_days: i64,
}

fn arb_scenario() -> impl Strategy<Value = Scenario> {
    (1usize..5)
        .prop_flat_map(|n| {
            (
                prop::collection::vec(prop::collection::vec(prop::bool::weighted(0.3), DAYS), n),
                prop::collection::vec(prop::collection::vec(0.0..100.0_f64, DAYS), n),
                1i64..5,
            )
        })
        .prop_map(|(signals, heatmaps, hold_days)| Scenario {
            signals,
            heatmaps,
            hold_days,
        })
}

fn instruments(scenario: &Scenario) -> Vec<Instrument> {
    scenario
        .heatmaps
        .iter()
        .enumerate()
        .map(|(i, heatmaps)| {
            let symbol = format!("S{}", i);
            let mut quotes = series(&symbol, &[100.0; DAYS]);
            for (q, &heatmap) in quotes.iter_mut().zip(heatmaps) {
                q.heatmap = heatmap;
            }
            instrument(&symbol, quotes)
        })
        .collect()
}

fn run(scenario: &Scenario, max_positions: Option<usize>, cooldown_days: usize) -> BacktestReport {
    run_delayed(scenario, max_positions, cooldown_days, 0)
}

fn run_delayed(
    scenario: &Scenario,
    max_positions: Option<usize>,
    cooldown_days: usize,
    entry_delay_days: usize,
) -> BacktestReport {
    let instruments = instruments(scenario);
    let traded: Vec<&Instrument> = instruments.iter().collect();
    let lookup: HashMap<String, Instrument> = HashMap::new();
    let table: HashMap<String, Vec<bool>> = scenario
        .signals
        .iter()
        .enumerate()
        .map(|(i, row)| (format!("S{}", i), row.clone()))
        .collect();
    let entry = move |inst: &Instrument, q: &Quote| -> Result<bool, SwingtestError> {
        let fires = match (table.get(&inst.symbol), q.date) {
            (Some(row), Some(d)) => row.get(index_of(d)).copied().unwrap_or(false),
            _ => false,
        };
        Ok(fires)
    };
    let exit = exit_after(scenario.hold_days);
    let signals = Signals {
        entry: &entry,
        exit: &exit,
        ranker: &HeatmapRanker,
    };
    let mut config: BacktestConfig = config_for_days(DAYS);
    config.max_positions = max_positions;
    config.cooldown_days = cooldown_days;
    config.entry_delay_days = entry_delay_days;
    run_backtest(&traded, &lookup, &signals, &config).unwrap()
}

fn span(trade: &Trade) -> (usize, usize) {
    (index_of(trade.entry_date), index_of(trade.exit_date()))
}

proptest! {
    #[test]
    fn no_entry_inside_cooldown_window(scenario in arb_scenario(), cooldown in 0usize..6) {
        let report = run(&scenario, Some(2), cooldown);
        let all: Vec<(usize, usize)> = report
            .trades()
            .into_iter()
            .chain(report.missed_trades.iter())
            .map(span)
            .collect();
        for &(_, exit) in &all {
            for &(entry, _) in &all {
                prop_assert!(
                    entry <= exit || entry > exit + cooldown,
                    "entry {} inside cooldown after exit {}",
                    entry,
                    exit
                );
            }
        }
    }

    #[test]
    fn open_positions_never_exceed_limit(
        scenario in arb_scenario(),
        limit in 1usize..4,
        delay in 0usize..4,
    ) {
        let report = run_delayed(&scenario, Some(limit), 0, delay);
        let spans: Vec<(usize, usize)> = report.trades().into_iter().map(span).collect();
        for day in 0..DAYS {
            let open = spans.iter().filter(|(s, e)| *s <= day && day <= *e).count();
            prop_assert!(open <= limit, "{} open on day {} with limit {}", open, day, limit);
        }
    }

    #[test]
    fn admitted_trades_outscore_same_day_missed(scenario in arb_scenario(), limit in 1usize..3) {
        let report = run(&scenario, Some(limit), 0);
        for missed in &report.missed_trades {
            let missed_score = 100.0 - missed.entry_quote.heatmap;
            for admitted in report.trades() {
                if admitted.entry_date != missed.entry_date {
                    continue;
                }
                let admitted_score = 100.0 - admitted.entry_quote.heatmap;
                prop_assert!(
                    admitted_score >= missed_score,
                    "{} ({}) admitted over {} ({}) on {}",
                    admitted.traded_symbol,
                    admitted_score,
                    missed.traded_symbol,
                    missed_score,
                    missed.entry_date
                );
            }
        }
    }

    #[test]
    fn one_trade_per_instrument_at_a_time(scenario in arb_scenario()) {
        let report = run(&scenario, None, 0);
        let mut by_symbol: HashMap<&str, Vec<(usize, usize)>> = HashMap::new();
        for trade in report.trades() {
            by_symbol.entry(trade.traded_symbol.as_str()).or_default().push(span(trade));
        }
        for spans in by_symbol.values() {
            for pair in spans.windows(2) {
                prop_assert!(pair[1].0 > pair[0].1);
            }
        }
    }

    #[test]
    fn reruns_are_identical(scenario in arb_scenario(), cooldown in 0usize..4) {
        let first = run(&scenario, Some(1), cooldown);
        let second = run(&scenario, Some(1), cooldown);
        prop_assert_eq!(first, second);
    }
}

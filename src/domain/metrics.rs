//! Report statistics and breakdowns.

use crate::domain::backtest::BacktestReport;
use crate::domain::trade::Trade;
use chrono::Datelike;
use std::collections::BTreeMap;

/// Win rate, average win/loss (in percent, loss as a positive number) and
/// edge for a set of trades. Zero profit counts as a loss.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EdgeSummary {
    pub trades: usize,
    pub win_rate: f64,
    pub avg_win_pct: f64,
    pub avg_loss_pct: f64,
    pub edge: f64,
}

impl EdgeSummary {
    pub fn of<'t, I>(trades: I) -> Self
    where
        I: IntoIterator<Item = &'t Trade>,
    {
        let mut count = 0usize;
        let mut wins = 0usize;
        let mut win_pct = 0.0_f64;
        let mut loss_pct = 0.0_f64;

        for trade in trades {
            count += 1;
            if trade.is_win() {
                wins += 1;
                win_pct += trade.profit_pct();
            } else {
                loss_pct += trade.profit_pct();
            }
        }

        if count == 0 {
            return Self::default();
        }

        let losses = count - wins;
        let win_rate = wins as f64 / count as f64;
        let avg_win_pct = if wins > 0 { win_pct / wins as f64 } else { 0.0 };
        let avg_loss_pct = if losses > 0 {
            (loss_pct / losses as f64).abs()
        } else {
            0.0
        };

        Self {
            trades: count,
            win_rate,
            avg_win_pct,
            avg_loss_pct,
            edge: avg_win_pct * win_rate - (1.0 - win_rate) * avg_loss_pct,
        }
    }
}

impl BacktestReport {
    fn summary(&self) -> EdgeSummary {
        EdgeSummary::of(self.winning_trades.iter().chain(self.losing_trades.iter()))
    }

    pub fn win_rate(&self) -> f64 {
        self.summary().win_rate
    }

    pub fn average_win_pct(&self) -> f64 {
        self.summary().avg_win_pct
    }

    pub fn average_loss_pct(&self) -> f64 {
        self.summary().avg_loss_pct
    }

    /// Expected percent gain per trade.
    pub fn edge(&self) -> f64 {
        self.summary().edge
    }

    /// Gross profit over gross loss; `None` without losing trades.
    pub fn profit_factor(&self) -> Option<f64> {
        if self.losing_trades.is_empty() {
            return None;
        }
        let gross_profit: f64 = self.winning_trades.iter().map(|t| t.profit).sum();
        let gross_loss: f64 = self.losing_trades.iter().map(|t| t.profit).sum::<f64>().abs();
        if gross_loss == 0.0 {
            Some(0.0)
        } else {
            Some(gross_profit / gross_loss)
        }
    }

    pub fn missed_profit_pct(&self) -> f64 {
        self.missed_trades.iter().map(Trade::profit_pct).sum()
    }

    pub fn exit_reason_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for trade in self.winning_trades.iter().chain(self.losing_trades.iter()) {
            *counts.entry(trade.exit_reason.clone()).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub missed_trades: usize,
    pub win_rate: f64,
    pub avg_win_pct: f64,
    pub avg_loss_pct: f64,
    pub edge: f64,
    pub profit_factor: Option<f64>,
    pub largest_win_pct: f64,
    pub largest_loss_pct: f64,
    pub avg_holding_days: f64,
    /// Deepest peak-to-trough fall of the cumulative profit-percent curve,
    /// in percentage points.
    pub max_drawdown_pct: f64,
    /// Longest drawdown, in trades.
    pub max_drawdown_trades: usize,
    pub avg_mfe_pct: f64,
    pub avg_mae_pct: f64,
    pub missed_profit_pct: f64,
}

impl Metrics {
    pub fn compute(report: &BacktestReport) -> Self {
        let trades = report.trades();
        let summary = report.summary();

        let largest_win_pct = report
            .winning_trades
            .iter()
            .map(Trade::profit_pct)
            .fold(0.0_f64, f64::max);
        let largest_loss_pct = report
            .losing_trades
            .iter()
            .map(|t| t.profit_pct().abs())
            .fold(0.0_f64, f64::max);

        let n = trades.len();
        let (avg_holding_days, avg_mfe_pct, avg_mae_pct) = if n > 0 {
            let holding: i64 = trades.iter().map(|t| t.holding_days()).sum();
            let (mfe, mae) = trades.iter().fold((0.0, 0.0), |(mfe, mae), t| {
                let ex = t.excursion();
                (mfe + ex.mfe_pct, mae + ex.mae_pct)
            });
            (holding as f64 / n as f64, mfe / n as f64, mae / n as f64)
        } else {
            (0.0, 0.0, 0.0)
        };

        let curve: Vec<f64> = trades
            .iter()
            .scan(0.0_f64, |acc, t| {
                *acc += t.profit_pct();
                Some(*acc)
            })
            .collect();
        let (max_drawdown_pct, max_drawdown_trades) = compute_drawdown(&curve);

        Metrics {
            total_trades: n,
            winning_trades: report.winning_trades.len(),
            losing_trades: report.losing_trades.len(),
            missed_trades: report.missed_trades.len(),
            win_rate: summary.win_rate,
            avg_win_pct: summary.avg_win_pct,
            avg_loss_pct: summary.avg_loss_pct,
            edge: summary.edge,
            profit_factor: report.profit_factor(),
            largest_win_pct,
            largest_loss_pct,
            avg_holding_days,
            max_drawdown_pct,
            max_drawdown_trades,
            avg_mfe_pct,
            avg_mae_pct,
            missed_profit_pct: report.missed_profit_pct(),
        }
    }
}

/// Drawdown of a cumulative curve that starts from zero.
fn compute_drawdown(curve: &[f64]) -> (f64, usize) {
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    let mut current_len = 0usize;
    let mut max_len = 0usize;

    for &value in curve {
        if value >= peak {
            peak = value;
            current_len = 0;
        } else {
            max_dd = max_dd.max(peak - value);
            current_len += 1;
            max_len = max_len.max(current_len);
        }
    }

    (max_dd, max_len)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolPerformance {
    pub symbol: String,
    pub summary: EdgeSummary,
    pub total_profit_pct: f64,
}

impl SymbolPerformance {
    /// One row per traded symbol, best total profit first.
    pub fn compute_per_symbol(report: &BacktestReport) -> Vec<Self> {
        let mut grouped: BTreeMap<&str, Vec<&Trade>> = BTreeMap::new();
        for trade in report.trades() {
            grouped.entry(trade.traded_symbol.as_str()).or_default().push(trade);
        }
        let mut rows: Vec<Self> = grouped
            .into_iter()
            .map(|(symbol, trades)| Self {
                symbol: symbol.to_string(),
                summary: EdgeSummary::of(trades.iter().copied()),
                total_profit_pct: trades.iter().map(|t| t.profit_pct()).sum(),
            })
            .collect();
        rows.sort_by(|a, b| b.total_profit_pct.total_cmp(&a.total_profit_pct));
        rows
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectorPerformance {
    pub sector: String,
    pub summary: EdgeSummary,
}

impl SectorPerformance {
    /// One row per sector, highest edge first.
    pub fn compute(report: &BacktestReport) -> Vec<Self> {
        let mut grouped: BTreeMap<&str, Vec<&Trade>> = BTreeMap::new();
        for trade in report.trades() {
            grouped.entry(trade.sector.as_str()).or_default().push(trade);
        }
        let mut rows: Vec<Self> = grouped
            .into_iter()
            .map(|(sector, trades)| Self {
                sector: sector.to_string(),
                summary: EdgeSummary::of(trades.iter().copied()),
            })
            .collect();
        rows.sort_by(|a, b| b.summary.edge.total_cmp(&a.summary.edge));
        rows
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitReasonStats {
    pub reason: String,
    pub count: usize,
    pub win_rate: f64,
    pub avg_profit_pct: f64,
}

impl ExitReasonStats {
    /// One row per exit reason, most frequent first.
    pub fn compute(report: &BacktestReport) -> Vec<Self> {
        let mut grouped: BTreeMap<&str, Vec<&Trade>> = BTreeMap::new();
        for trade in report.trades() {
            grouped.entry(trade.exit_reason.as_str()).or_default().push(trade);
        }
        let mut rows: Vec<Self> = grouped
            .into_iter()
            .map(|(reason, trades)| {
                let count = trades.len();
                let wins = trades.iter().filter(|t| t.is_win()).count();
                let total: f64 = trades.iter().map(|t| t.profit_pct()).sum();
                Self {
                    reason: reason.to_string(),
                    count,
                    win_rate: wins as f64 / count as f64,
                    avg_profit_pct: total / count as f64,
                }
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count));
        rows
    }
}

/// Statistics for the trades entered within one year, quarter or month.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PeriodStats {
    pub trades: usize,
    pub win_rate: f64,
    pub avg_profit_pct: f64,
    pub avg_holding_days: f64,
    pub edge: f64,
    pub exit_reasons: BTreeMap<String, usize>,
}

impl PeriodStats {
    pub fn of(trades: &[&Trade]) -> Self {
        if trades.is_empty() {
            return Self::default();
        }
        let n = trades.len() as f64;
        let summary = EdgeSummary::of(trades.iter().copied());
        let mut exit_reasons = BTreeMap::new();
        for trade in trades {
            *exit_reasons.entry(trade.exit_reason.clone()).or_insert(0) += 1;
        }
        Self {
            trades: trades.len(),
            win_rate: summary.win_rate,
            avg_profit_pct: trades.iter().map(|t| t.profit_pct()).sum::<f64>() / n,
            avg_holding_days: trades.iter().map(|t| t.holding_days()).sum::<i64>() as f64 / n,
            edge: summary.edge,
            exit_reasons,
        }
    }
}

/// Admitted trades grouped by the year, quarter (`2024-Q1`) and month
/// (`2024-01`) of their entry date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeBasedStats {
    pub by_year: BTreeMap<i32, PeriodStats>,
    pub by_quarter: BTreeMap<String, PeriodStats>,
    pub by_month: BTreeMap<String, PeriodStats>,
}

impl TimeBasedStats {
    pub fn compute(report: &BacktestReport) -> Self {
        let trades = report.trades();
        let mut years: BTreeMap<i32, Vec<&Trade>> = BTreeMap::new();
        let mut quarters: BTreeMap<String, Vec<&Trade>> = BTreeMap::new();
        let mut months: BTreeMap<String, Vec<&Trade>> = BTreeMap::new();

        for trade in trades {
            let date = trade.entry_date;
            years.entry(date.year()).or_default().push(trade);
            quarters
                .entry(format!("{}-Q{}", date.year(), (date.month() - 1) / 3 + 1))
                .or_default()
                .push(trade);
            months
                .entry(format!("{}-{:02}", date.year(), date.month()))
                .or_default()
                .push(trade);
        }

        Self {
            by_year: years.into_iter().map(|(k, v)| (k, PeriodStats::of(&v))).collect(),
            by_quarter: quarters.into_iter().map(|(k, v)| (k, PeriodStats::of(&v))).collect(),
            by_month: months.into_iter().map(|(k, v)| (k, PeriodStats::of(&v))).collect(),
        }
    }
}

/// How steady the edge is from one year to the next, scored 0 to 100.
///
/// `score = profitable * 0.4 + stability * 0.4 + downside * 0.2` where
/// `profitable` is the share of years with a positive edge, `stability` is
/// `100 * (1 - stddev / |mean|)` floored at 0 and `downside` is 100 when the
/// worst year is not negative, else `100 * (1 + worst / 10)` floored at 0.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeConsistency {
    pub score: f64,
    pub profitable_periods_score: f64,
    pub stability_score: f64,
    pub downside_score: f64,
    pub years_analyzed: usize,
    pub yearly_edges: BTreeMap<i32, f64>,
}

impl EdgeConsistency {
    /// `None` when fewer than two years have trades.
    pub fn compute(by_year: &BTreeMap<i32, PeriodStats>) -> Option<Self> {
        let yearly_edges: BTreeMap<i32, f64> = by_year
            .iter()
            .filter(|(_, stats)| stats.trades > 0)
            .map(|(&year, stats)| (year, stats.edge))
            .collect();
        if yearly_edges.len() < 2 {
            return None;
        }

        let edges: Vec<f64> = yearly_edges.values().copied().collect();
        let n = edges.len() as f64;

        let profitable = edges.iter().filter(|&&e| e > 0.0).count() as f64;
        let profitable_periods_score = profitable / n * 100.0;

        let mean = edges.iter().sum::<f64>() / n;
        let variance = edges.iter().map(|e| (e - mean) * (e - mean)).sum::<f64>() / n;
        let std_dev = variance.sqrt();
        let stability_score = if mean.abs() < 0.001 {
            if std_dev < 0.001 { 50.0 } else { 0.0 }
        } else {
            (100.0 * (1.0 - std_dev / mean.abs())).max(0.0)
        };

        let worst = edges.iter().copied().fold(f64::INFINITY, f64::min);
        let downside_score = if worst >= 0.0 {
            100.0
        } else {
            (100.0 * (1.0 + worst / 10.0)).max(0.0)
        };

        Some(Self {
            score: profitable_periods_score * 0.4 + stability_score * 0.4 + downside_score * 0.2,
            profitable_periods_score,
            stability_score,
            downside_score,
            years_analyzed: yearly_edges.len(),
            yearly_edges,
        })
    }

    pub fn interpretation(&self) -> &'static str {
        match self.score {
            s if s >= 80.0 => "Excellent",
            s if s >= 60.0 => "Good",
            s if s >= 40.0 => "Moderate",
            s if s >= 20.0 => "Poor",
            _ => "Very Poor",
        }
    }
}

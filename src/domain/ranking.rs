//! Candidate scoring and same-day ranking.

use crate::domain::error::SwingtestError;
use crate::domain::instrument::Instrument;
use crate::domain::quote::Quote;
use crate::domain::scanner::CandidateEntry;
use std::cmp::Ordering;
use std::fmt;

/// Scores a candidate; higher is preferred.
pub trait Ranker: Send + Sync {
    fn score(&self, instrument: &Instrument, quote: &Quote) -> Result<f64, SwingtestError>;

    fn describe(&self) -> String {
        String::from("custom ranker")
    }
}

impl<F> Ranker for F
where
    F: Fn(&Instrument, &Quote) -> Result<f64, SwingtestError> + Send + Sync,
{
    fn score(&self, instrument: &Instrument, quote: &Quote) -> Result<f64, SwingtestError> {
        self(instrument, quote)
    }
}

/// Lower heatmap ranks higher: `100 - heatmap`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeatmapRanker;

impl Ranker for HeatmapRanker {
    fn score(&self, _instrument: &Instrument, quote: &Quote) -> Result<f64, SwingtestError> {
        Ok(100.0 - quote.heatmap)
    }

    fn describe(&self) -> String {
        "Heatmap (lower = better)".into()
    }
}

/// ATR as a percentage of the close.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolatilityRanker;

impl Ranker for VolatilityRanker {
    fn score(&self, _instrument: &Instrument, quote: &Quote) -> Result<f64, SwingtestError> {
        if quote.close == 0.0 {
            return Ok(0.0);
        }
        Ok(quote.atr / quote.close * 100.0)
    }

    fn describe(&self) -> String {
        "ATR as % of price (higher volatility = better)".into()
    }
}

/// Negative percentage distance from the 10 EMA; closer is better.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceFromEma10Ranker;

impl Ranker for DistanceFromEma10Ranker {
    fn score(&self, _instrument: &Instrument, quote: &Quote) -> Result<f64, SwingtestError> {
        if quote.ema10 == 0.0 {
            return Ok(0.0);
        }
        let distance = (quote.close - quote.ema10) / quote.ema10 * 100.0;
        Ok(-distance.abs())
    }

    fn describe(&self) -> String {
        "Distance from 10 EMA (closer = better)".into()
    }
}

/// Sector heatmap of the quote's sector.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectorStrengthRanker;

impl Ranker for SectorStrengthRanker {
    fn score(&self, _instrument: &Instrument, quote: &Quote) -> Result<f64, SwingtestError> {
        Ok(quote.sector_heatmap)
    }

    fn describe(&self) -> String {
        "Sector strength".into()
    }
}

/// Weighted blend of volatility, EMA distance and sector strength, each
/// normalised to 0..100 first.
#[derive(Debug, Clone, Copy)]
pub struct CompositeRanker {
    pub volatility_weight: f64,
    pub distance_weight: f64,
    pub sector_weight: f64,
}

impl Default for CompositeRanker {
    fn default() -> Self {
        Self {
            volatility_weight: 0.4,
            distance_weight: 0.3,
            sector_weight: 0.3,
        }
    }
}

fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        return 50.0;
    }
    (value - min) / (max - min) * 100.0
}

impl Ranker for CompositeRanker {
    fn score(&self, instrument: &Instrument, quote: &Quote) -> Result<f64, SwingtestError> {
        let volatility = VolatilityRanker.score(instrument, quote)?;
        let distance = DistanceFromEma10Ranker.score(instrument, quote)?;
        let sector = SectorStrengthRanker.score(instrument, quote)?;
        Ok(normalize(volatility, 0.0, 10.0) * self.volatility_weight
            + normalize(distance, -10.0, 0.0) * self.distance_weight
            + normalize(sector, 0.0, 100.0) * self.sector_weight)
    }

    fn describe(&self) -> String {
        format!(
            "Composite (Vol {}%, Dist10EMA {}%, Sector {}%)",
            self.volatility_weight * 100.0,
            self.distance_weight * 100.0,
            self.sector_weight * 100.0
        )
    }
}

/// Built-in rankers selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankerKind {
    #[default]
    Heatmap,
    Volatility,
    DistanceEma10,
    SectorStrength,
    Composite,
}

impl RankerKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "heatmap" => Some(Self::Heatmap),
            "volatility" => Some(Self::Volatility),
            "distance_ema10" | "distance10ema" => Some(Self::DistanceEma10),
            "sector_strength" | "sector" => Some(Self::SectorStrength),
            "composite" => Some(Self::Composite),
            _ => None,
        }
    }

    pub fn build(self) -> Box<dyn Ranker> {
        match self {
            Self::Heatmap => Box::new(HeatmapRanker),
            Self::Volatility => Box::new(VolatilityRanker),
            Self::DistanceEma10 => Box::new(DistanceFromEma10Ranker),
            Self::SectorStrength => Box::new(SectorStrengthRanker),
            Self::Composite => Box::new(CompositeRanker::default()),
        }
    }
}

impl fmt::Display for RankerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Heatmap => "heatmap",
            Self::Volatility => "volatility",
            Self::DistanceEma10 => "distance_ema10",
            Self::SectorStrength => "sector_strength",
            Self::Composite => "composite",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct RankedCandidate<'a> {
    pub candidate: CandidateEntry<'a>,
    pub score: f64,
}

/// NaN sorts below every real score.
fn score_order(a: f64, b: f64) -> Ordering {
    let key = |s: f64| if s.is_nan() { f64::NEG_INFINITY } else { s };
    key(a).total_cmp(&key(b))
}

/// Score every candidate with its signal instrument and quote, then sort
/// descending. Equal scores keep their input order.
pub fn rank_candidates<'a>(
    candidates: Vec<CandidateEntry<'a>>,
    ranker: &dyn Ranker,
) -> Result<Vec<RankedCandidate<'a>>, SwingtestError> {
    let mut ranked = candidates
        .into_iter()
        .map(|candidate| {
            let score = ranker.score(candidate.pair.signal, candidate.signal_quote)?;
            Ok(RankedCandidate { candidate, score })
        })
        .collect::<Result<Vec<_>, SwingtestError>>()?;
    ranked.sort_by(|a, b| score_order(b.score, a.score));
    Ok(ranked)
}

//! Daily quote representation.
//!
//! A `Quote` is one instrument on one date: OHLCV plus the indicator fields
//! attached by the enrichment pipeline. Quotes are built once and never
//! mutated by the backtest.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalFlag {
    Buy,
    Sell,
}

impl SignalFlag {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "buy" => Some(SignalFlag::Buy),
            "sell" => Some(SignalFlag::Sell),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    /// `None` when the upstream row carried no date; such quotes are
    /// dropped by the quote index.
    pub date: Option<NaiveDate>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub ema5: f64,
    pub ema10: f64,
    pub ema20: f64,
    pub ema50: f64,
    pub atr: f64,
    pub heatmap: f64,
    pub sector_heatmap: f64,
    pub donchian_upper: f64,
    pub signal: Option<SignalFlag>,
}

impl Quote {
    /// A quote with only OHLCV populated; indicator fields are zero.
    pub fn ohlcv(
        symbol: &str,
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: i64,
    ) -> Self {
        Quote {
            symbol: symbol.to_string(),
            date: Some(date),
            open,
            high,
            low,
            close,
            volume,
            ema5: 0.0,
            ema10: 0.0,
            ema20: 0.0,
            ema50: 0.0,
            atr: 0.0,
            heatmap: 0.0,
            sector_heatmap: 0.0,
            donchian_upper: 0.0,
            signal: None,
        }
    }

    pub fn is_dated(&self, date: NaiveDate) -> bool {
        self.date == Some(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ohlcv_constructor_zeroes_indicators() {
        let q = Quote::ohlcv(
            "QQQ",
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            100.0,
            110.0,
            90.0,
            105.0,
            50_000,
        );
        assert_eq!(q.symbol, "QQQ");
        assert!((q.close - 105.0).abs() < f64::EPSILON);
        assert_eq!(q.heatmap, 0.0);
        assert_eq!(q.ema10, 0.0);
        assert!(q.signal.is_none());
    }

    #[test]
    fn is_dated_matches_only_same_day() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let q = Quote::ohlcv("QQQ", d, 1.0, 1.0, 1.0, 1.0, 0);
        assert!(q.is_dated(d));
        assert!(!q.is_dated(d.succ_opt().unwrap()));
    }

    #[test]
    fn signal_flag_parse() {
        assert_eq!(SignalFlag::parse("Buy"), Some(SignalFlag::Buy));
        assert_eq!(SignalFlag::parse(" SELL "), Some(SignalFlag::Sell));
        assert_eq!(SignalFlag::parse("hold"), None);
    }
}

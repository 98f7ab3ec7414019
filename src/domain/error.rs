//! Domain error types.

use chrono::NaiveDate;

/// A parse error with position information for rule parsing.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for swingtest.
#[derive(Debug, thiserror::Error)]
pub enum SwingtestError {
    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error(
        "missing underlying asset data for: {}. Load these symbols before running the backtest",
        .symbols.join(", ")
    )]
    MissingUnderlying { symbols: Vec<String> },

    #[error(transparent)]
    RuleParse(#[from] ParseError),

    #[error("invalid rule: {reason}")]
    RuleInvalid { reason: String },

    #[error("predicate failed for {symbol}: {reason}")]
    Predicate { symbol: String, reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SwingtestError> for std::process::ExitCode {
    fn from(err: &SwingtestError) -> Self {
        let code: u8 = match err {
            SwingtestError::Io(_) => 1,
            SwingtestError::ConfigParse { .. }
            | SwingtestError::ConfigMissing { .. }
            | SwingtestError::ConfigInvalid { .. }
            | SwingtestError::InvalidDateRange { .. }
            | SwingtestError::MissingUnderlying { .. } => 2,
            SwingtestError::DataSource { .. } => 3,
            SwingtestError::RuleParse(_) | SwingtestError::RuleInvalid { .. } => 4,
            SwingtestError::NoData { .. } => 5,
            SwingtestError::Predicate { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

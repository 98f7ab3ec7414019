//! Quote source port.

use crate::domain::error::SwingtestError;
use crate::domain::quote::Quote;
use chrono::NaiveDate;

pub trait DataPort {
    /// Every quote stored for `symbol`, oldest first. An unknown symbol is a
    /// data source error; a known symbol with no rows returns an empty list.
    fn fetch_quotes(&self, symbol: &str) -> Result<Vec<Quote>, SwingtestError>;

    fn list_symbols(&self) -> Result<Vec<String>, SwingtestError>;

    /// First date, last date and quote count, or `None` when the symbol has
    /// no dated quotes.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SwingtestError>;

    fn sector_of(&self, symbol: &str) -> Option<String>;
}

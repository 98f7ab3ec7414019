//! Report output port.

use crate::domain::backtest::BacktestReport;
use crate::domain::error::SwingtestError;
use crate::domain::strategy::Strategy;

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(
        &self,
        report: &BacktestReport,
        strategy: &Strategy,
        output_path: &str,
    ) -> Result<(), SwingtestError>;
}

//! Report output port trait.

use crate::domain::error::TradebookError;
use crate::domain::report::Report;
use std::path::Path;

/// Port for writing an assembled report.
pub trait ReportPort {
    fn render(&self, report: &Report) -> Result<Vec<u8>, TradebookError>;

    /// Default implementation: render, then write the bytes to `output_path`.
    fn write(&self, report: &Report, output_path: &Path) -> Result<(), TradebookError> {
        let bytes = self.render(report)?;
        std::fs::write(output_path, bytes)?;
        Ok(())
    }
}

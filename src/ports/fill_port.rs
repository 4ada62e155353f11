//! Fill ingestion port trait.

use crate::domain::error::TradebookError;
use crate::domain::leg::RawFill;

/// Anything that can hand over the executed fills of one account.
pub trait FillSource {
    /// Human-readable name used in errors and report metadata.
    fn source_name(&self) -> String;

    fn load_fills(&self) -> Result<Vec<RawFill>, TradebookError>;
}

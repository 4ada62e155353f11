//! Domain error types.

/// Top-level error type for tradebook.
///
/// Only failures that prevent a report from being produced live here. Bad
/// rows and unrecognised instruments are reported as
/// [`DataWarning`](crate::domain::warning::DataWarning)s instead.
#[derive(Debug, thiserror::Error)]
pub enum TradebookError {
    #[error("input error in {source_name}: {reason}")]
    Input { source_name: String, reason: String },

    #[error("missing column '{column}' in {source_name}")]
    MissingColumn { source_name: String, column: String },

    #[error("no rows found in {source_name}")]
    EmptyInput { source_name: String },

    #[error("no valid trade legs in {source_name} ({rejected} rows rejected)")]
    NoValidLegs { source_name: String, rejected: usize },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TradebookError> for std::process::ExitCode {
    fn from(err: &TradebookError) -> Self {
        let code: u8 = match err {
            TradebookError::Io(_) | TradebookError::Report { .. } => 1,
            TradebookError::ConfigParse { .. } | TradebookError::ConfigInvalid { .. } => 2,
            TradebookError::Input { .. } | TradebookError::MissingColumn { .. } => 3,
            TradebookError::EmptyInput { .. } | TradebookError::NoValidLegs { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

//! Instrument classification port trait.

use crate::domain::leg::Classification;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifyError {
    #[error("unrecognized instrument code: {0}")]
    Unrecognized(String),

    #[error("invalid expiry in {code}: {reason}")]
    InvalidExpiry { code: String, reason: String },
}

/// Maps a raw instrument code to its attributes.
///
/// Implementations must be deterministic: the same code always yields the
/// same classification.
pub trait InstrumentClassifier: Sync {
    fn classify(&self, code: &str) -> Result<Classification, ClassifyError>;
}

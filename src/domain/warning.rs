//! Data-quality warnings collected while building a report.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    MissingInstrument,
    InvalidSide { value: String },
    InvalidQuantity { value: String },
    InvalidPrice { value: String },
    InvalidTimestamp { value: String },
    Unclassified { reason: String },
    NegativeDte { dte: i64 },
}

impl WarningKind {
    /// True when the row was dropped rather than kept with a caveat.
    pub fn rejects_row(&self) -> bool {
        !matches!(
            self,
            WarningKind::Unclassified { .. } | WarningKind::NegativeDte { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataWarning {
    pub row: Option<usize>,
    pub instrument_code: String,
    #[serde(flatten)]
    pub kind: WarningKind,
}

impl DataWarning {
    pub fn for_row(row: usize, instrument_code: &str, kind: WarningKind) -> Self {
        DataWarning {
            row: Some(row),
            instrument_code: instrument_code.to_string(),
            kind,
        }
    }

    pub fn for_instrument(instrument_code: &str, kind: WarningKind) -> Self {
        DataWarning {
            row: None,
            instrument_code: instrument_code.to_string(),
            kind,
        }
    }
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(row) = self.row {
            write!(f, "row {row}")?;
        } else {
            write!(f, "instrument")?;
        }
        if !self.instrument_code.is_empty() {
            write!(f, " ({})", self.instrument_code)?;
        }
        match &self.kind {
            WarningKind::MissingInstrument => write!(f, ": missing instrument code"),
            WarningKind::InvalidSide { value } => write!(f, ": invalid side '{value}'"),
            WarningKind::InvalidQuantity { value } => write!(f, ": invalid quantity '{value}'"),
            WarningKind::InvalidPrice { value } => write!(f, ": invalid price '{value}'"),
            WarningKind::InvalidTimestamp { value } => {
                write!(f, ": invalid timestamp '{value}'")
            }
            WarningKind::Unclassified { reason } => write!(f, ": unclassified ({reason})"),
            WarningKind::NegativeDte { dte } => write!(f, ": negative days to expiry ({dte})"),
        }
    }
}

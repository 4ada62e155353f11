//! A ratio that may be undefined.

use serde::{Serialize, Serializer};
use std::fmt;

/// Result of a division that has no meaningful value when the denominator
/// is zero. Serializes as a number, or `null` when undefined, so NaN and
/// infinity never reach the output.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Ratio {
    Value(f64),
    #[default]
    Undefined,
}

impl Ratio {
    pub fn divide(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            return Ratio::Undefined;
        }
        Ratio::from_f64(numerator / denominator)
    }

    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Ratio::Value(value)
        } else {
            Ratio::Undefined
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Ratio::Value(v) => Some(v),
            Ratio::Undefined => None,
        }
    }
}

impl Serialize for Ratio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Ratio::Value(v) => serializer.serialize_f64(*v),
            Ratio::Undefined => serializer.serialize_none(),
        }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ratio::Value(v) => match f.precision() {
                Some(p) => write!(f, "{v:.p$}"),
                None => write!(f, "{v}"),
            },
            Ratio::Undefined => write!(f, "N/A"),
        }
    }
}

//! Raw fills and canonical trade legs.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// One row as handed over by a fill source, before any validation.
///
/// `row` is the 1-based data row number and is the tie-breaker for fills
/// sharing a timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFill {
    pub row: usize,
    pub instrument_code: String,
    pub side: String,
    pub quantity: String,
    pub price: String,
    pub timestamp: String,
    pub expiry_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "b" => Ok(Side::Buy),
            "sell" | "s" => Ok(Side::Sell),
            other => Err(format!("unknown side: {other}")),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentType {
    Future,
    Call,
    Put,
    Unknown,
}

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstrumentType::Future => "future",
            InstrumentType::Call => "call",
            InstrumentType::Put => "put",
            InstrumentType::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// What the instrument classifier knows about a trading code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub underlying: String,
    pub instrument_type: InstrumentType,
    pub strike: Option<f64>,
    pub expiry_date: Option<NaiveDate>,
    pub is_weekly: bool,
    pub is_monthly: bool,
    pub is_index: bool,
}

impl Classification {
    /// Fallback used when a code cannot be classified: the raw code stands in
    /// for the underlying so grouping still works.
    pub fn unclassified(code: &str) -> Self {
        Classification {
            underlying: code.to_string(),
            instrument_type: InstrumentType::Unknown,
            strike: None,
            expiry_date: None,
            is_weekly: false,
            is_monthly: false,
            is_index: false,
        }
    }
}

/// One executed fill after normalization. Never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeLeg {
    pub row: usize,
    pub instrument_code: String,
    pub classification: Classification,
    pub side: Side,
    pub quantity: u64,
    pub price: f64,
    pub timestamp: NaiveDateTime,
}

impl TradeLeg {
    pub fn underlying(&self) -> &str {
        &self.classification.underlying
    }

    pub fn expiry_date(&self) -> Option<NaiveDate> {
        self.classification.expiry_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_parses_case_insensitively() {
        assert_eq!("BUY".parse::<Side>(), Ok(Side::Buy));
        assert_eq!(" sell ".parse::<Side>(), Ok(Side::Sell));
        assert_eq!("b".parse::<Side>(), Ok(Side::Buy));
        assert!("hold".parse::<Side>().is_err());
    }

    #[test]
    fn side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn unclassified_keeps_raw_code() {
        let c = Classification::unclassified("WEIRD123");
        assert_eq!(c.underlying, "WEIRD123");
        assert_eq!(c.instrument_type, InstrumentType::Unknown);
        assert!(c.expiry_date.is_none());
        assert!(!c.is_index);
    }

    #[test]
    fn instrument_type_serializes_lowercase() {
        let json = serde_json::to_string(&InstrumentType::Call).unwrap();
        assert_eq!(json, "\"call\"");
    }
}

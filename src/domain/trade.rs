//! Matched round trips and residual open positions.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

use super::leg::{InstrumentType, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// The opening side decides the direction: buy opens long, sell opens short.
    pub fn opened_by(side: Side) -> Self {
        match side {
            Side::Buy => Direction::Long,
            Side::Sell => Direction::Short,
        }
    }

    pub fn opening_side(self) -> Side {
        match self {
            Direction::Long => Side::Buy,
            Direction::Short => Side::Sell,
        }
    }

    /// Signed P&L per unit for a move from `entry` to `exit`.
    pub fn unit_pnl(self, entry: f64, exit: f64) -> f64 {
        match self {
            Direction::Long => exit - entry,
            Direction::Short => entry - exit,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// A fully closed round trip. `quantity` is the matched chunk, which may be
/// smaller than either source leg.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedTrade {
    pub instrument_code: String,
    pub underlying: String,
    pub instrument_type: InstrumentType,
    pub strike: Option<f64>,
    pub direction: Direction,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub opened_at: NaiveDateTime,
    pub closed_at: NaiveDateTime,
    pub quantity: u64,
    pub pnl: f64,
    pub pnl_pct: Option<f64>,
    pub capital: f64,
    pub hold_days: i64,
    pub dte: Option<i64>,
    pub expiry_date: Option<NaiveDate>,
    pub is_weekly: bool,
    pub is_monthly: bool,
    pub is_index: bool,
}

impl MatchedTrade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.pnl < 0.0
    }
}

/// Unmatched exposure left for one instrument once every leg is processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenPosition {
    pub instrument_code: String,
    pub underlying: String,
    pub instrument_type: InstrumentType,
    pub side: Side,
    pub direction: Direction,
    pub quantity: u64,
    pub price: f64,
    pub open_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub is_index: bool,
}

impl OpenPosition {
    pub fn open_value(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

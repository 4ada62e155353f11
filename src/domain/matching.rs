//! FIFO lot matching per instrument.
//!
//! Each instrument owns one [`InstrumentBook`]: a state (`Flat`, `Long`,
//! `Short`) and a queue of open [`Lot`]s, oldest at the front. A leg on the
//! open side extends the queue; an opposite leg consumes lots from the front,
//! emitting one [`MatchedTrade`] per consumed chunk. Any quantity left over
//! once the queue is empty flips the book to the other direction.
//!
//! Instruments share no state, so books may be matched in parallel. Within
//! one instrument the legs are processed strictly in input order.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, VecDeque};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::leg::{Classification, Side, TradeLeg};
use super::trade::{Direction, MatchedTrade, OpenPosition};
use super::warning::{DataWarning, WarningKind};

pub const DEFAULT_PARALLEL_THRESHOLD: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookState {
    Flat,
    Long,
    Short,
}

impl BookState {
    fn direction(self) -> Option<Direction> {
        match self {
            BookState::Flat => None,
            BookState::Long => Some(Direction::Long),
            BookState::Short => Some(Direction::Short),
        }
    }

    fn opened_by(side: Side) -> Self {
        match side {
            Side::Buy => BookState::Long,
            Side::Sell => BookState::Short,
        }
    }
}

/// Unmatched exposure from one opening leg.
#[derive(Debug, Clone, PartialEq)]
pub struct Lot {
    pub side: Side,
    pub remaining_quantity: u64,
    pub price: f64,
    pub opened_at: NaiveDateTime,
    pub expiry_date: Option<NaiveDate>,
}

impl Lot {
    fn from_leg(leg: &TradeLeg, quantity: u64) -> Self {
        Lot {
            side: leg.side,
            remaining_quantity: quantity,
            price: leg.price,
            opened_at: leg.timestamp,
            expiry_date: leg.expiry_date(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    pub parallel: bool,
    pub parallel_threshold: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions {
            parallel: true,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    pub trades: Vec<MatchedTrade>,
    pub open_positions: Vec<OpenPosition>,
    pub warnings: Vec<DataWarning>,
}

#[derive(Debug, Clone)]
pub struct InstrumentBook {
    instrument_code: String,
    classification: Classification,
    state: BookState,
    lots: VecDeque<Lot>,
}

impl InstrumentBook {
    pub fn new(instrument_code: &str, classification: Classification) -> Self {
        InstrumentBook {
            instrument_code: instrument_code.to_string(),
            classification,
            state: BookState::Flat,
            lots: VecDeque::new(),
        }
    }

    pub fn state(&self) -> BookState {
        self.state
    }

    pub fn lots(&self) -> &VecDeque<Lot> {
        &self.lots
    }

    /// Net open quantity, positive when long and negative when short.
    pub fn net_quantity(&self) -> i64 {
        let open: u64 = self.lots.iter().map(|l| l.remaining_quantity).sum();
        match self.state {
            BookState::Flat => 0,
            BookState::Long => open as i64,
            BookState::Short => -(open as i64),
        }
    }

    /// Apply one leg, appending any trades it closes to `trades`.
    pub fn apply(&mut self, leg: &TradeLeg, trades: &mut Vec<MatchedTrade>) {
        let direction = match self.state.direction() {
            None => {
                self.lots.push_back(Lot::from_leg(leg, leg.quantity));
                self.state = BookState::opened_by(leg.side);
                return;
            }
            Some(d) if d.opening_side() == leg.side => {
                self.lots.push_back(Lot::from_leg(leg, leg.quantity));
                return;
            }
            Some(d) => d,
        };

        let mut remaining = leg.quantity;
        while remaining > 0 {
            let Some(front) = self.lots.front() else {
                break;
            };
            let matched = remaining.min(front.remaining_quantity);
            trades.push(self.close_chunk(front, leg, matched, direction));

            let front = &mut self.lots[0];
            front.remaining_quantity -= matched;
            remaining -= matched;
            if front.remaining_quantity == 0 {
                self.lots.pop_front();
            }
        }

        if remaining > 0 {
            log::debug!(
                "{}: {} closes through flat, flipping with {} remaining",
                self.instrument_code,
                leg.side,
                remaining
            );
            self.lots.push_back(Lot::from_leg(leg, remaining));
            self.state = BookState::opened_by(leg.side);
        } else if self.lots.is_empty() {
            self.state = BookState::Flat;
        }
    }

    fn close_chunk(
        &self,
        lot: &Lot,
        leg: &TradeLeg,
        quantity: u64,
        direction: Direction,
    ) -> MatchedTrade {
        let entry_date = lot.opened_at.date();
        let exit_date = leg.timestamp.date();
        let pnl = direction.unit_pnl(lot.price, leg.price) * quantity as f64;
        let capital = lot.price * quantity as f64;
        let pnl_pct = if capital != 0.0 {
            Some(pnl / capital * 100.0)
        } else {
            None
        };

        MatchedTrade {
            instrument_code: self.instrument_code.clone(),
            underlying: self.classification.underlying.clone(),
            instrument_type: self.classification.instrument_type,
            strike: self.classification.strike,
            direction,
            entry_price: lot.price,
            exit_price: leg.price,
            entry_date,
            exit_date,
            opened_at: lot.opened_at,
            closed_at: leg.timestamp,
            quantity,
            pnl,
            pnl_pct,
            capital,
            hold_days: (exit_date - entry_date).num_days().max(0),
            dte: lot.expiry_date.map(|e| (e - entry_date).num_days()),
            expiry_date: lot.expiry_date,
            is_weekly: self.classification.is_weekly,
            is_monthly: self.classification.is_monthly,
            is_index: self.classification.is_index,
        }
    }

    /// Collapse the remaining lots into one position with a
    /// quantity-weighted average price.
    pub fn open_position(&self) -> Option<OpenPosition> {
        let direction = self.state.direction()?;
        let front = self.lots.front()?;
        let quantity: u64 = self.lots.iter().map(|l| l.remaining_quantity).sum();
        if quantity == 0 {
            return None;
        }
        let notional: f64 = self
            .lots
            .iter()
            .map(|l| l.price * l.remaining_quantity as f64)
            .sum();

        Some(OpenPosition {
            instrument_code: self.instrument_code.clone(),
            underlying: self.classification.underlying.clone(),
            instrument_type: self.classification.instrument_type,
            side: direction.opening_side(),
            direction,
            quantity,
            price: notional / quantity as f64,
            open_date: front.opened_at.date(),
            expiry_date: front.expiry_date,
            is_index: self.classification.is_index,
        })
    }
}

#[derive(Debug, Default)]
struct InstrumentOutcome {
    trades: Vec<MatchedTrade>,
    open: Option<OpenPosition>,
    warnings: Vec<DataWarning>,
}

fn match_instrument(code: &str, legs: &[&TradeLeg]) -> InstrumentOutcome {
    let mut outcome = InstrumentOutcome::default();
    let Some(first) = legs.first() else {
        return outcome;
    };

    let mut book = InstrumentBook::new(code, first.classification.clone());
    for leg in legs {
        book.apply(leg, &mut outcome.trades);
    }

    for trade in &outcome.trades {
        if let Some(dte) = trade.dte.filter(|d| *d < 0) {
            let warning = DataWarning::for_instrument(code, WarningKind::NegativeDte { dte });
            log::warn!("{warning}");
            outcome.warnings.push(warning);
        }
    }

    outcome.open = book.open_position();
    log::debug!(
        "{}: {} legs, {} trades, open {:?}",
        code,
        legs.len(),
        outcome.trades.len(),
        outcome.open.as_ref().map(|p| (p.direction, p.quantity))
    );
    outcome
}

fn run_books(groups: &[(&str, Vec<&TradeLeg>)], parallel: bool) -> Vec<InstrumentOutcome> {
    #[cfg(feature = "parallel")]
    {
        if parallel {
            return groups
                .par_iter()
                .map(|(code, legs)| match_instrument(code, legs))
                .collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    groups
        .iter()
        .map(|(code, legs)| match_instrument(code, legs))
        .collect()
}

/// Match time-ordered legs into round trips and open positions.
///
/// Output is a pure function of the input order: books are merged in
/// instrument-code order and trades are stably sorted by close time, so
/// the parallel and sequential paths produce identical results.
pub fn match_legs(legs: &[TradeLeg], options: MatchOptions) -> MatchOutcome {
    let mut by_instrument: BTreeMap<&str, Vec<&TradeLeg>> = BTreeMap::new();
    for leg in legs {
        by_instrument
            .entry(leg.instrument_code.as_str())
            .or_default()
            .push(leg);
    }
    let groups: Vec<(&str, Vec<&TradeLeg>)> = by_instrument.into_iter().collect();

    let parallel =
        options.parallel && groups.len() > 1 && legs.len() >= options.parallel_threshold;
    log::info!(
        "matching {} legs across {} instruments{}",
        legs.len(),
        groups.len(),
        if parallel { " (parallel)" } else { "" }
    );

    let mut outcome = MatchOutcome::default();
    for book in run_books(&groups, parallel) {
        outcome.trades.extend(book.trades);
        outcome.open_positions.extend(book.open);
        outcome.warnings.extend(book.warnings);
    }
    outcome.trades.sort_by_key(|t| t.closed_at);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::leg::InstrumentType;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn leg(code: &str, side: Side, quantity: u64, price: f64, at: NaiveDateTime) -> TradeLeg {
        TradeLeg {
            row: 0,
            instrument_code: code.to_string(),
            classification: Classification {
                underlying: "NIFTY".into(),
                instrument_type: InstrumentType::Call,
                strike: Some(22000.0),
                expiry_date: NaiveDate::from_ymd_opt(2024, 3, 28),
                is_weekly: false,
                is_monthly: true,
                is_index: true,
            },
            side,
            quantity,
            price,
            timestamp: at,
        }
    }

    fn sequential() -> MatchOptions {
        MatchOptions {
            parallel: false,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    #[test]
    fn state_transitions_flat_long_flat_short() {
        let mut book = InstrumentBook::new("X", Classification::unclassified("X"));
        let mut trades = Vec::new();
        assert_eq!(book.state(), BookState::Flat);

        book.apply(&leg("X", Side::Buy, 2, 10.0, ts(1, 10)), &mut trades);
        assert_eq!(book.state(), BookState::Long);
        assert_eq!(book.net_quantity(), 2);

        book.apply(&leg("X", Side::Sell, 2, 11.0, ts(2, 10)), &mut trades);
        assert_eq!(book.state(), BookState::Flat);
        assert!(book.lots().is_empty());

        book.apply(&leg("X", Side::Sell, 3, 12.0, ts(3, 10)), &mut trades);
        assert_eq!(book.state(), BookState::Short);
        assert_eq!(book.net_quantity(), -3);
        assert_eq!(trades.len(), 1);
    }

    #[test]
    fn partial_closes_split_one_lot() {
        let legs = vec![
            leg("X", Side::Buy, 10, 100.0, ts(1, 10)),
            leg("X", Side::Sell, 4, 110.0, ts(2, 10)),
            leg("X", Side::Sell, 6, 120.0, ts(3, 10)),
        ];
        let out = match_legs(&legs, sequential());

        assert_eq!(out.trades.len(), 2);
        let t0 = &out.trades[0];
        assert_eq!((t0.entry_price, t0.exit_price, t0.quantity), (100.0, 110.0, 4));
        assert!((t0.pnl - 40.0).abs() < 1e-9);
        let t1 = &out.trades[1];
        assert_eq!((t1.entry_price, t1.exit_price, t1.quantity), (100.0, 120.0, 6));
        assert!((t1.pnl - 120.0).abs() < 1e-9);
        assert!(out.open_positions.is_empty());
    }

    #[test]
    fn over_close_flips_direction() {
        let legs = vec![
            leg("X", Side::Buy, 5, 100.0, ts(1, 10)),
            leg("X", Side::Sell, 8, 110.0, ts(2, 10)),
        ];
        let out = match_legs(&legs, sequential());

        assert_eq!(out.trades.len(), 1);
        let t = &out.trades[0];
        assert_eq!(t.direction, Direction::Long);
        assert_eq!(t.quantity, 5);
        assert!((t.pnl - 50.0).abs() < 1e-9);

        assert_eq!(out.open_positions.len(), 1);
        let p = &out.open_positions[0];
        assert_eq!(p.side, Side::Sell);
        assert_eq!(p.direction, Direction::Short);
        assert_eq!(p.quantity, 3);
        assert!((p.price - 110.0).abs() < 1e-9);
        assert_eq!(p.open_date, ts(2, 10).date());
    }

    #[test]
    fn closing_leg_consumes_oldest_lots_first() {
        let legs = vec![
            leg("X", Side::Sell, 3, 50.0, ts(1, 10)),
            leg("X", Side::Sell, 3, 50.0, ts(2, 10)),
            leg("X", Side::Buy, 5, 40.0, ts(4, 10)),
        ];
        let out = match_legs(&legs, sequential());

        assert_eq!(out.trades.len(), 2);
        assert_eq!(out.trades[0].quantity, 3);
        assert_eq!(out.trades[0].entry_date, ts(1, 10).date());
        assert_eq!(out.trades[1].quantity, 2);
        assert_eq!(out.trades[1].entry_date, ts(2, 10).date());
        assert!(out.trades.iter().all(|t| t.direction == Direction::Short));
        assert!((out.trades[0].pnl - 30.0).abs() < 1e-9);

        let p = &out.open_positions[0];
        assert_eq!((p.side, p.quantity), (Side::Sell, 1));
    }

    #[test]
    fn same_direction_lots_merge_into_weighted_position() {
        let legs = vec![
            leg("X", Side::Buy, 1, 100.0, ts(1, 10)),
            leg("X", Side::Buy, 3, 120.0, ts(2, 10)),
        ];
        let out = match_legs(&legs, sequential());
        assert!(out.trades.is_empty());
        assert_eq!(out.open_positions.len(), 1);
        let p = &out.open_positions[0];
        assert_eq!(p.quantity, 4);
        assert!((p.price - 115.0).abs() < 1e-9);
        assert_eq!(p.open_date, ts(1, 10).date());
    }

    #[test]
    fn trade_derived_fields() {
        let legs = vec![
            leg("X", Side::Sell, 2, 200.0, ts(4, 9)),
            leg("X", Side::Buy, 2, 150.0, ts(10, 15)),
        ];
        let out = match_legs(&legs, sequential());
        let t = &out.trades[0];
        assert_eq!(t.direction, Direction::Short);
        assert!((t.capital - 400.0).abs() < 1e-9);
        assert!((t.pnl - 100.0).abs() < 1e-9);
        assert!((t.pnl_pct.unwrap() - 25.0).abs() < 1e-9);
        assert_eq!(t.hold_days, 6);
        assert_eq!(t.dte, Some(24));
        assert_eq!(t.underlying, "NIFTY");
        assert!(t.is_index);
    }

    #[test]
    fn negative_dte_is_flagged_not_fatal() {
        let mut late = leg("X", Side::Buy, 1, 10.0, ts(29, 10));
        late.classification.expiry_date = NaiveDate::from_ymd_opt(2024, 3, 28);
        let legs = vec![late, leg("X", Side::Sell, 1, 12.0, ts(30, 10))];
        let out = match_legs(&legs, sequential());
        assert_eq!(out.trades.len(), 1);
        assert_eq!(out.trades[0].dte, Some(-1));
        assert_eq!(out.warnings.len(), 1);
        assert!(matches!(
            out.warnings[0].kind,
            WarningKind::NegativeDte { dte: -1 }
        ));
    }

    #[test]
    fn instruments_are_independent_and_sorted_by_close() {
        let legs = vec![
            leg("A", Side::Buy, 1, 10.0, ts(1, 10)),
            leg("B", Side::Sell, 1, 20.0, ts(1, 11)),
            leg("B", Side::Buy, 1, 18.0, ts(2, 10)),
            leg("A", Side::Sell, 1, 9.0, ts(3, 10)),
        ];
        let out = match_legs(&legs, sequential());
        let codes: Vec<&str> = out
            .trades
            .iter()
            .map(|t| t.instrument_code.as_str())
            .collect();
        assert_eq!(codes, vec!["B", "A"]);
    }

    #[test]
    fn parallel_matches_sequential() {
        let mut legs = Vec::new();
        for (i, code) in ["A", "B", "C", "D"].iter().enumerate() {
            for day in 1..20u32 {
                let side = if (day + i as u32) % 3 == 0 {
                    Side::Sell
                } else {
                    Side::Buy
                };
                legs.push(leg(code, side, (day % 4 + 1) as u64, 100.0 + day as f64, ts(day, 10)));
            }
        }
        legs.sort_by_key(|l| l.timestamp);
        let seq = match_legs(&legs, sequential());
        let par = match_legs(
            &legs,
            MatchOptions {
                parallel: true,
                parallel_threshold: 1,
            },
        );
        assert_eq!(seq, par);
    }
}

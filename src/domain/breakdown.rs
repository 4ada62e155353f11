//! Trade breakdowns by calendar bucket and by instrument attributes.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;

use super::leg::InstrumentType;
use super::ratio::Ratio;
use super::tally::{BucketStats, TradeTally};
use super::trade::{Direction, MatchedTrade, OpenPosition};

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthRow {
    pub month: String,
    #[serde(flatten)]
    pub stats: BucketStats,
    pub capital: f64,
    pub pnl_pct: Option<f64>,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub profit_factor: Ratio,
    pub cumulative_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayRow {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub stats: BucketStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayRow {
    pub day: String,
    #[serde(flatten)]
    pub stats: BucketStats,
}

/// Monthly table keyed by exit month (`YYYY-MM`), oldest first.
pub fn by_month(trades: &[&MatchedTrade]) -> Vec<MonthRow> {
    let mut groups: BTreeMap<(i32, u32), TradeTally> = BTreeMap::new();
    for trade in trades {
        groups
            .entry((trade.exit_date.year(), trade.exit_date.month()))
            .or_default()
            .add(trade);
    }

    let mut cumulative = 0.0;
    groups
        .into_iter()
        .map(|((year, month), tally)| {
            cumulative += tally.total_pnl;
            MonthRow {
                month: format!("{year:04}-{month:02}"),
                stats: tally.stats(),
                capital: tally.capital,
                pnl_pct: tally.return_on_capital_pct(),
                largest_win: tally.largest_win,
                largest_loss: tally.largest_loss,
                profit_factor: tally.profit_factor(),
                cumulative_pnl: cumulative,
            }
        })
        .collect()
}

/// Calendar heatmap: one row per exit date that saw a close.
pub fn by_day(trades: &[&MatchedTrade]) -> Vec<DayRow> {
    let mut groups: BTreeMap<NaiveDate, TradeTally> = BTreeMap::new();
    for trade in trades {
        groups.entry(trade.exit_date).or_default().add(trade);
    }
    groups
        .into_iter()
        .map(|(date, tally)| DayRow {
            date,
            stats: tally.stats(),
        })
        .collect()
}

/// Monday through Sunday in calendar order; days without closes report zeros.
pub fn by_weekday(trades: &[&MatchedTrade]) -> Vec<WeekdayRow> {
    let mut tallies: [TradeTally; 7] = Default::default();
    for trade in trades {
        tallies[trade.exit_date.weekday().num_days_from_monday() as usize].add(trade);
    }
    WEEKDAYS
        .iter()
        .zip(tallies.iter())
        .map(|(day, tally)| WeekdayRow {
            day: day.to_string(),
            stats: tally.stats(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnderlyingRow {
    pub underlying: String,
    #[serde(flatten)]
    pub stats: BucketStats,
    pub capital: f64,
    pub pnl_pct: Option<f64>,
    pub avg_return_pct: Option<f64>,
    pub long_pnl: f64,
    pub short_pnl: f64,
}

/// Per-underlying table sorted by absolute P&L, largest first.
pub fn by_underlying(trades: &[&MatchedTrade]) -> Vec<UnderlyingRow> {
    let mut groups: BTreeMap<&str, (TradeTally, f64, f64)> = BTreeMap::new();
    for trade in trades {
        let entry = groups.entry(trade.underlying.as_str()).or_default();
        entry.0.add(trade);
        match trade.direction {
            Direction::Long => entry.1 += trade.pnl,
            Direction::Short => entry.2 += trade.pnl,
        }
    }

    let mut rows: Vec<UnderlyingRow> = groups
        .into_iter()
        .map(|(underlying, (tally, long_pnl, short_pnl))| UnderlyingRow {
            underlying: underlying.to_string(),
            stats: tally.stats(),
            capital: tally.capital,
            pnl_pct: tally.return_on_capital_pct(),
            avg_return_pct: tally.avg_return_pct(),
            long_pnl,
            short_pnl,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.stats
            .total_pnl
            .abs()
            .total_cmp(&a.stats.total_pnl.abs())
            .then_with(|| a.underlying.cmp(&b.underlying))
    });
    rows
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstrumentSplit {
    pub futures: BucketStats,
    pub calls: BucketStats,
    pub puts: BucketStats,
    pub unknown: BucketStats,
    pub index: BucketStats,
    pub stock: BucketStats,
}

pub fn by_instrument_type(trades: &[&MatchedTrade]) -> InstrumentSplit {
    let mut futures = TradeTally::default();
    let mut calls = TradeTally::default();
    let mut puts = TradeTally::default();
    let mut unknown = TradeTally::default();
    let mut index = TradeTally::default();
    let mut stock = TradeTally::default();

    for trade in trades {
        match trade.instrument_type {
            InstrumentType::Future => futures.add(trade),
            InstrumentType::Call => calls.add(trade),
            InstrumentType::Put => puts.add(trade),
            InstrumentType::Unknown => unknown.add(trade),
        }
        if trade.is_index {
            index.add(trade);
        } else {
            stock.add(trade);
        }
    }

    InstrumentSplit {
        futures: futures.stats(),
        calls: calls.stats(),
        puts: puts.stats(),
        unknown: unknown.stats(),
        index: index.stats(),
        stock: stock.stats(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DirectionSplit {
    pub long: BucketStats,
    pub short: BucketStats,
}

pub fn by_direction(trades: &[&MatchedTrade]) -> DirectionSplit {
    let mut long = TradeTally::default();
    let mut short = TradeTally::default();
    for trade in trades {
        match trade.direction {
            Direction::Long => long.add(trade),
            Direction::Short => short.add(trade),
        }
    }
    DirectionSplit {
        long: long.stats(),
        short: short.stats(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpiryRow {
    pub expiry_date: NaiveDate,
    #[serde(flatten)]
    pub stats: BucketStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DteBucketRow {
    pub bucket: String,
    #[serde(flatten)]
    pub stats: BucketStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpiryBreakdown {
    pub monthly: BucketStats,
    pub monthly_avg_return_pct: Option<f64>,
    pub weekly: BucketStats,
    pub weekly_avg_return_pct: Option<f64>,
    pub by_expiry: Vec<ExpiryRow>,
    pub dte_buckets: Vec<DteBucketRow>,
}

/// Inclusive DTE ranges; `None` upper bound is open-ended.
const DTE_BUCKETS: [(&str, i64, Option<i64>); 4] = [
    ("0 DTE", 0, Some(0)),
    ("1-3 DTE", 1, Some(3)),
    ("4-7 DTE", 4, Some(7)),
    ("8+ DTE", 8, None),
];

pub fn by_expiry(trades: &[&MatchedTrade]) -> ExpiryBreakdown {
    let mut monthly = TradeTally::default();
    let mut weekly = TradeTally::default();
    let mut expiries: BTreeMap<NaiveDate, TradeTally> = BTreeMap::new();
    let mut dte: [TradeTally; 4] = Default::default();

    for trade in trades {
        if trade.is_monthly {
            monthly.add(trade);
        }
        if trade.is_weekly {
            weekly.add(trade);
        }
        if let Some(expiry) = trade.expiry_date {
            expiries.entry(expiry).or_default().add(trade);
        }
        if let Some(days) = trade.dte {
            let slot = DTE_BUCKETS
                .iter()
                .position(|(_, lo, hi)| days >= *lo && hi.is_none_or(|h| days <= h));
            if let Some(slot) = slot {
                dte[slot].add(trade);
            }
        }
    }

    ExpiryBreakdown {
        monthly: monthly.stats(),
        monthly_avg_return_pct: monthly.avg_return_pct(),
        weekly: weekly.stats(),
        weekly_avg_return_pct: weekly.avg_return_pct(),
        by_expiry: expiries
            .into_iter()
            .map(|(expiry_date, tally)| ExpiryRow {
                expiry_date,
                stats: tally.stats(),
            })
            .collect(),
        dte_buckets: DTE_BUCKETS
            .iter()
            .zip(dte.iter())
            .map(|((name, _, _), tally)| DteBucketRow {
                bucket: name.to_string(),
                stats: tally.stats(),
            })
            .collect(),
    }
}

const TOP_GROUP_SIZE: usize = 3;
const CONCENTRATION_SIZE: usize = 5;
const PARETO_THRESHOLD_PCT: f64 = 80.0;

/// Combined P&L of a group of underlyings. `pct` is relative to the
/// group's reference total and absent when that total is zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnderlyingGroup {
    pub underlyings: Vec<String>,
    pub pnl: f64,
    pub pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoRow {
    pub underlying: String,
    pub pnl: f64,
    pub cumulative_pct: f64,
}

/// Where the net P&L came from, by underlying.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnderlyingAttribution {
    pub top_winners: UnderlyingGroup,
    pub top_losers: UnderlyingGroup,
    pub concentration: UnderlyingGroup,
    pub pareto: Vec<ParetoRow>,
    pub pareto_80_index: Option<usize>,
    pub avg_winning_underlying: f64,
    pub avg_losing_underlying: f64,
    pub win_loss_asymmetry: Ratio,
}

fn share_pct(part: f64, whole: f64) -> Option<f64> {
    (whole != 0.0).then(|| part.abs() / whole.abs() * 100.0)
}

fn group(rows: &[&UnderlyingRow], whole: f64) -> UnderlyingGroup {
    let pnl: f64 = rows.iter().map(|r| r.stats.total_pnl).sum();
    let magnitude: f64 = rows.iter().map(|r| r.stats.total_pnl.abs()).sum();
    UnderlyingGroup {
        underlyings: rows.iter().map(|r| r.underlying.clone()).collect(),
        pnl,
        pct: share_pct(magnitude, whole),
    }
}

/// Top winners and losers against net P&L, top-five concentration against
/// total absolute P&L, and a Pareto table over the winning underlyings.
pub fn attribution(rows: &[UnderlyingRow], net_pnl: f64) -> UnderlyingAttribution {
    let mut winners: Vec<&UnderlyingRow> =
        rows.iter().filter(|r| r.stats.total_pnl > 0.0).collect();
    winners.sort_by(|a, b| {
        b.stats
            .total_pnl
            .total_cmp(&a.stats.total_pnl)
            .then_with(|| a.underlying.cmp(&b.underlying))
    });
    let mut losers: Vec<&UnderlyingRow> =
        rows.iter().filter(|r| r.stats.total_pnl < 0.0).collect();
    losers.sort_by(|a, b| {
        a.stats
            .total_pnl
            .total_cmp(&b.stats.total_pnl)
            .then_with(|| a.underlying.cmp(&b.underlying))
    });
    let mut by_size: Vec<&UnderlyingRow> = rows.iter().collect();
    by_size.sort_by(|a, b| {
        b.stats
            .total_pnl
            .abs()
            .total_cmp(&a.stats.total_pnl.abs())
            .then_with(|| a.underlying.cmp(&b.underlying))
    });

    let total_abs: f64 = rows.iter().map(|r| r.stats.total_pnl.abs()).sum();
    let winning_total: f64 = winners.iter().map(|r| r.stats.total_pnl).sum();
    let losing_total: f64 = losers.iter().map(|r| r.stats.total_pnl).sum();

    let mut cumulative = 0.0;
    let pareto: Vec<ParetoRow> = winners
        .iter()
        .map(|r| {
            cumulative += r.stats.total_pnl;
            ParetoRow {
                underlying: r.underlying.clone(),
                pnl: r.stats.total_pnl,
                cumulative_pct: cumulative / winning_total * 100.0,
            }
        })
        .collect();
    let pareto_80_index = pareto
        .iter()
        .position(|row| row.cumulative_pct >= PARETO_THRESHOLD_PCT);

    let avg_winning_underlying = if winners.is_empty() {
        0.0
    } else {
        winning_total / winners.len() as f64
    };
    let avg_losing_underlying = if losers.is_empty() {
        0.0
    } else {
        losing_total / losers.len() as f64
    };

    UnderlyingAttribution {
        top_winners: group(&winners[..winners.len().min(TOP_GROUP_SIZE)], net_pnl),
        top_losers: group(&losers[..losers.len().min(TOP_GROUP_SIZE)], net_pnl),
        concentration: group(&by_size[..by_size.len().min(CONCENTRATION_SIZE)], total_abs),
        pareto,
        pareto_80_index,
        avg_winning_underlying,
        avg_losing_underlying,
        win_loss_asymmetry: Ratio::divide(
            avg_winning_underlying.abs(),
            avg_losing_underlying.abs(),
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenExposureRow {
    pub underlying: String,
    pub value: f64,
    pub pct: f64,
}

/// Open value per underlying as a share of all open value, largest first.
pub fn open_concentration(positions: &[OpenPosition]) -> Vec<OpenExposureRow> {
    let mut groups: BTreeMap<&str, f64> = BTreeMap::new();
    for position in positions {
        *groups.entry(position.underlying.as_str()).or_insert(0.0) +=
            position.open_value().abs();
    }
    let total: f64 = groups.values().sum();

    let mut rows: Vec<OpenExposureRow> = groups
        .into_iter()
        .map(|(underlying, value)| OpenExposureRow {
            underlying: underlying.to_string(),
            value,
            pct: share_pct(value, total).unwrap_or(0.0),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.pct
            .total_cmp(&a.pct)
            .then_with(|| a.underlying.cmp(&b.underlying))
    });
    rows
}

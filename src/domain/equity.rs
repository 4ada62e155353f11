//! Equity and drawdown curves over closed trades.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use super::trade::MatchedTrade;

/// Cumulative realized P&L after one trade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub instrument_code: String,
    pub pnl: f64,
    pub equity: f64,
}

/// P&L summed over a calendar bucket, with the running total carried forward.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketPoint {
    pub period: String,
    pub trades: usize,
    pub pnl: f64,
    pub equity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resample {
    Daily,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawdownPoint {
    pub date: NaiveDate,
    pub equity: f64,
    pub peak: f64,
    pub drawdown: f64,
    pub drawdown_pct: f64,
}

/// Deepest point of the drawdown curve, as positive magnitudes. Every field
/// describes the same peak and trough.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaxDrawdown {
    pub amount: f64,
    pub pct: f64,
    pub peak_date: Option<NaiveDate>,
    pub trough_date: Option<NaiveDate>,
}

/// Trades in exit order. Ties keep their relative order.
pub fn by_exit(trades: &[MatchedTrade]) -> Vec<&MatchedTrade> {
    let mut ordered: Vec<&MatchedTrade> = trades.iter().collect();
    ordered.sort_by_key(|t| t.closed_at);
    ordered
}

pub fn equity_curve(ordered: &[&MatchedTrade]) -> Vec<EquityPoint> {
    let mut equity = 0.0;
    ordered
        .iter()
        .map(|t| {
            equity += t.pnl;
            EquityPoint {
                date: t.exit_date,
                instrument_code: t.instrument_code.clone(),
                pnl: t.pnl,
                equity,
            }
        })
        .collect()
}

pub fn resample(curve: &[EquityPoint], bucket: Resample) -> Vec<BucketPoint> {
    let mut buckets: BTreeMap<String, (usize, f64)> = BTreeMap::new();
    for point in curve {
        let key = match bucket {
            Resample::Daily => point.date.format("%Y-%m-%d").to_string(),
            Resample::Monthly => format!("{:04}-{:02}", point.date.year(), point.date.month()),
        };
        let entry = buckets.entry(key).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += point.pnl;
    }

    let mut equity = 0.0;
    buckets
        .into_iter()
        .map(|(period, (trades, pnl))| {
            equity += pnl;
            BucketPoint {
                period,
                trades,
                pnl,
                equity,
            }
        })
        .collect()
}

/// Drawdown at every equity point, measured against the running peak.
///
/// The peak starts from the zero-equity baseline before the first trade, so
/// an opening loss counts as drawdown in amount. The percentage is only
/// defined against a positive peak and is 0 otherwise.
///
/// The maximum is the point with the most negative percentage; among equal
/// percentages the larger amount wins.
pub fn drawdown(curve: &[EquityPoint]) -> (Vec<DrawdownPoint>, MaxDrawdown) {
    let mut peak = 0.0_f64;
    let mut peak_date: Option<NaiveDate> = None;
    let mut max = MaxDrawdown::default();
    let mut points = Vec::with_capacity(curve.len());

    for point in curve {
        if point.equity > peak {
            peak = point.equity;
            peak_date = Some(point.date);
        }
        let dd = point.equity - peak;
        let dd_pct = if peak > 0.0 { dd / peak * 100.0 } else { 0.0 };

        let deeper = -dd_pct > max.pct || (-dd_pct == max.pct && -dd > max.amount);
        if dd < 0.0 && deeper {
            max.amount = -dd;
            max.pct = -dd_pct;
            max.peak_date = peak_date;
            max.trough_date = Some(point.date);
        }

        points.push(DrawdownPoint {
            date: point.date,
            equity: point.equity,
            peak,
            drawdown: dd,
            drawdown_pct: dd_pct,
        });
    }

    (points, max)
}

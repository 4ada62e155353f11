//! Leg normalization: raw fills to canonical, time-ordered [`TradeLeg`]s.
//!
//! Bad rows are dropped with a [`DataWarning`] rather than failing the run,
//! and instrument codes the classifier rejects still flow through under
//! their raw code.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

use super::leg::{Classification, RawFill, Side, TradeLeg};
use super::warning::{DataWarning, WarningKind};
use crate::ports::classifier_port::InstrumentClassifier;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

#[derive(Debug, Clone, Default)]
pub struct NormalizedLegs {
    pub legs: Vec<TradeLeg>,
    pub warnings: Vec<DataWarning>,
    pub rejected: usize,
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim().trim_end_matches('Z');
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    let head = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn parse_quantity(value: &str) -> Option<u64> {
    let q: f64 = value.trim().parse().ok()?;
    if !q.is_finite() || q <= 0.0 || q.fract() != 0.0 || q > u64::MAX as f64 {
        return None;
    }
    Some(q as u64)
}

fn parse_price(value: &str) -> Option<f64> {
    let p: f64 = value.trim().parse().ok()?;
    if p.is_finite() && p > 0.0 {
        Some(p)
    } else {
        None
    }
}

fn validate_fill(fill: &RawFill) -> Result<(String, Side, u64, f64, NaiveDateTime), WarningKind> {
    let code = fill.instrument_code.trim().to_uppercase();
    if code.is_empty() {
        return Err(WarningKind::MissingInstrument);
    }
    let side: Side = fill.side.parse().map_err(|_| WarningKind::InvalidSide {
        value: fill.side.clone(),
    })?;
    let quantity = parse_quantity(&fill.quantity).ok_or_else(|| WarningKind::InvalidQuantity {
        value: fill.quantity.clone(),
    })?;
    let price = parse_price(&fill.price).ok_or_else(|| WarningKind::InvalidPrice {
        value: fill.price.clone(),
    })?;
    let timestamp =
        parse_timestamp(&fill.timestamp).ok_or_else(|| WarningKind::InvalidTimestamp {
            value: fill.timestamp.clone(),
        })?;
    Ok((code, side, quantity, price, timestamp))
}

/// Validate, classify and order raw fills.
///
/// The result is ordered by timestamp, and fills sharing a timestamp are
/// ordered by source row. Each distinct instrument code is
/// classified once; a classification failure produces one warning per code.
pub fn normalize(fills: &[RawFill], classifier: &dyn InstrumentClassifier) -> NormalizedLegs {
    let mut out = NormalizedLegs::default();
    let mut classifications: BTreeMap<String, Classification> = BTreeMap::new();

    for fill in fills {
        let (code, side, quantity, price, timestamp) = match validate_fill(fill) {
            Ok(parts) => parts,
            Err(kind) => {
                let warning = DataWarning::for_row(fill.row, fill.instrument_code.trim(), kind);
                log::warn!("dropping {warning}");
                out.warnings.push(warning);
                continue;
            }
        };

        let base = classifications
            .entry(code.clone())
            .or_insert_with(|| match classifier.classify(&code) {
                Ok(c) => c,
                Err(e) => {
                    let warning = DataWarning::for_instrument(
                        &code,
                        WarningKind::Unclassified {
                            reason: e.to_string(),
                        },
                    );
                    log::warn!("{warning}");
                    out.warnings.push(warning);
                    Classification::unclassified(&code)
                }
            });

        let mut classification = base.clone();
        if let Some(expiry) = fill.expiry_date.as_deref().and_then(parse_date) {
            classification.expiry_date = Some(expiry);
        }

        out.legs.push(TradeLeg {
            row: fill.row,
            instrument_code: code,
            classification,
            side,
            quantity,
            price,
            timestamp,
        });
    }

    out.legs.sort_by_key(|leg| (leg.timestamp, leg.row));
    out.rejected = out.warnings.iter().filter(|w| w.kind.rejects_row()).count();
    log::info!(
        "normalized {} legs ({} rows rejected)",
        out.legs.len(),
        out.rejected
    );
    out
}

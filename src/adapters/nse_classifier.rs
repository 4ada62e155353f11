//! NSE F&O trading-symbol classifier.
//!
//! Recognised layouts, after the underlying name:
//!
//! - `{YY}{MMM}FUT`: monthly future
//! - `{YY}{MMM}{STRIKE}{CE|PE}`: monthly option
//! - `{YY}{M}{DD}{STRIKE}{CE|PE}`: weekly option, `M` is `1`-`9`, `O`, `N`
//!   or `D`, and the expiry date is spelled out in full
//!
//! Anything else with a two-digit year is classified by suffix and treated
//! as weekly.

use chrono::NaiveDate;

use crate::domain::leg::{Classification, InstrumentType};
use crate::ports::classifier_port::{ClassifyError, InstrumentClassifier};

pub const INDEX_UNDERLYINGS: &[&str] = &[
    "NIFTY",
    "BANKNIFTY",
    "FINNIFTY",
    "MIDCPNIFTY",
    "SENSEX",
    "BANKEX",
];

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct NseSymbolClassifier;

impl NseSymbolClassifier {
    pub fn new() -> Self {
        Self
    }
}

fn split_underlying(code: &str) -> Option<(&str, &str)> {
    let end = code
        .find(|c: char| !(c.is_ascii_uppercase() || c == '&' || c == '-'))
        .unwrap_or(code.len());
    if end == 0 {
        return None;
    }
    let rest = &code[end..];
    let bytes = rest.as_bytes();
    if bytes.len() < 2 || !bytes[0].is_ascii_digit() || !bytes[1].is_ascii_digit() {
        return None;
    }
    Some((&code[..end], rest))
}

fn month_number(abbrev: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| *m == abbrev)
        .map(|i| i as u32 + 1)
}

fn weekly_month(c: u8) -> Option<u32> {
    match c {
        b'1'..=b'9' => Some(u32::from(c - b'0')),
        b'O' => Some(10),
        b'N' => Some(11),
        b'D' => Some(12),
        _ => None,
    }
}

/// `{STRIKE}{CE|PE}` where the strike is digits with an optional fraction.
fn option_tail(s: &str) -> Option<(f64, InstrumentType)> {
    let (strike, kind) = if let Some(strike) = s.strip_suffix("CE") {
        (strike, InstrumentType::Call)
    } else if let Some(strike) = s.strip_suffix("PE") {
        (strike, InstrumentType::Put)
    } else {
        return None;
    };

    let (whole, frac) = match strike.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (strike, None),
    };
    let digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    if !digits(whole) || frac.is_some_and(|f| !digits(f)) {
        return None;
    }
    strike.parse().ok().map(|v| (v, kind))
}

impl InstrumentClassifier for NseSymbolClassifier {
    fn classify(&self, code: &str) -> Result<Classification, ClassifyError> {
        let code = code.trim();
        let unrecognized = || ClassifyError::Unrecognized(code.to_string());
        if !code.is_ascii() {
            return Err(unrecognized());
        }
        let (underlying, rest) = split_underlying(code).ok_or_else(unrecognized)?;

        let mut c = Classification {
            underlying: underlying.to_string(),
            instrument_type: InstrumentType::Unknown,
            strike: None,
            expiry_date: None,
            is_weekly: false,
            is_monthly: false,
            is_index: INDEX_UNDERLYINGS.contains(&underlying),
        };

        let year = 2000 + rest[..2].parse::<i32>().map_err(|_| unrecognized())?;
        let after_year = &rest[2..];

        if let Some(month) = after_year.get(..3).and_then(month_number) {
            let tail = &after_year[3..];
            if tail == "FUT" {
                c.instrument_type = InstrumentType::Future;
                c.is_monthly = true;
                return Ok(c);
            }
            if let Some((strike, kind)) = option_tail(tail) {
                log::debug!("{code}: monthly {kind} {year}-{month:02} strike {strike}");
                c.instrument_type = kind;
                c.strike = Some(strike);
                c.is_monthly = true;
                return Ok(c);
            }
        }

        let bytes = after_year.as_bytes();
        if bytes.len() > 3
            && let Some(month) = weekly_month(bytes[0])
            && bytes[1].is_ascii_digit()
            && bytes[2].is_ascii_digit()
            && let Some((strike, kind)) = option_tail(&after_year[3..])
        {
            let day: u32 = after_year[1..3].parse().map_err(|_| unrecognized())?;
            let expiry = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
                ClassifyError::InvalidExpiry {
                    code: code.to_string(),
                    reason: format!("{year}-{month:02}-{day:02} is not a date"),
                }
            })?;
            c.instrument_type = kind;
            c.strike = Some(strike);
            c.expiry_date = Some(expiry);
            c.is_weekly = true;
            return Ok(c);
        }

        c.instrument_type = if code.ends_with("CE") {
            InstrumentType::Call
        } else if code.ends_with("PE") {
            InstrumentType::Put
        } else if code.contains("FUT") {
            InstrumentType::Future
        } else {
            InstrumentType::Unknown
        };
        c.is_weekly = true;
        Ok(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(code: &str) -> Classification {
        NseSymbolClassifier::new().classify(code).unwrap()
    }

    #[test]
    fn monthly_future() {
        let c = classify("BANKNIFTY24JANFUT");
        assert_eq!(c.underlying, "BANKNIFTY");
        assert_eq!(c.instrument_type, InstrumentType::Future);
        assert!(c.is_monthly);
        assert!(!c.is_weekly);
        assert!(c.is_index);
        assert_eq!(c.strike, None);
        assert_eq!(c.expiry_date, None);
    }

    #[test]
    fn monthly_option() {
        let c = classify("RELIANCE24MAR2900CE");
        assert_eq!(c.underlying, "RELIANCE");
        assert_eq!(c.instrument_type, InstrumentType::Call);
        assert_eq!(c.strike, Some(2900.0));
        assert!(c.is_monthly);
        assert!(!c.is_index);
    }

    #[test]
    fn fractional_strike_and_ampersand() {
        let c = classify("M&M24APR1662.5PE");
        assert_eq!(c.underlying, "M&M");
        assert_eq!(c.instrument_type, InstrumentType::Put);
        assert_eq!(c.strike, Some(1662.5));
    }

    #[test]
    fn weekly_option_has_exact_expiry() {
        let c = classify("NIFTY2411821500PE");
        assert_eq!(c.underlying, "NIFTY");
        assert_eq!(c.instrument_type, InstrumentType::Put);
        assert_eq!(c.strike, Some(21500.0));
        assert_eq!(c.expiry_date, NaiveDate::from_ymd_opt(2024, 1, 18));
        assert!(c.is_weekly);
        assert!(!c.is_monthly);
    }

    #[test]
    fn weekly_letter_months() {
        let c = classify("NIFTY24O1025000CE");
        assert_eq!(c.expiry_date, NaiveDate::from_ymd_opt(2024, 10, 10));
        let c = classify("NIFTY24D2624000CE");
        assert_eq!(c.expiry_date, NaiveDate::from_ymd_opt(2024, 12, 26));
    }

    #[test]
    fn weekly_with_impossible_date_is_invalid_expiry() {
        let err = NseSymbolClassifier::new()
            .classify("NIFTY2423121500CE")
            .unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidExpiry { .. }));
    }

    #[test]
    fn fallback_by_suffix() {
        let c = classify("FINNIFTY24XYZCE");
        assert_eq!(c.instrument_type, InstrumentType::Call);
        assert!(c.is_weekly);
        assert!(c.is_index);
        let c = classify("SBIN24FUTX");
        assert_eq!(c.instrument_type, InstrumentType::Future);
        let c = classify("SBIN24QQQ");
        assert_eq!(c.instrument_type, InstrumentType::Unknown);
    }

    #[test]
    fn no_year_is_unrecognized() {
        let classifier = NseSymbolClassifier::new();
        for code in ["RELIANCE", "24JANFUT", "NIFTY2", ""] {
            assert_eq!(
                classifier.classify(code),
                Err(ClassifyError::Unrecognized(code.to_string()))
            );
        }
    }
}

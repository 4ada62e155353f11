#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use tradebook::domain::error::TradebookError;
use tradebook::domain::leg::{Classification, InstrumentType, RawFill};
use tradebook::ports::classifier_port::{ClassifyError, InstrumentClassifier};
use tradebook::ports::fill_port::FillSource;

pub struct MockFillSource {
    pub name: String,
    pub fills: Vec<RawFill>,
    pub error: Option<String>,
}

impl MockFillSource {
    pub fn new(fills: Vec<RawFill>) -> Self {
        Self {
            name: "mock.csv".to_string(),
            fills,
            error: None,
        }
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl FillSource for MockFillSource {
    fn source_name(&self) -> String {
        self.name.clone()
    }

    fn load_fills(&self) -> Result<Vec<RawFill>, TradebookError> {
        if let Some(reason) = &self.error {
            return Err(TradebookError::Input {
                source_name: self.name.clone(),
                reason: reason.clone(),
            });
        }
        Ok(self.fills.clone())
    }
}

/// Classifier with a fixed table; unknown codes fail to classify.
pub struct TableClassifier {
    pub entries: HashMap<String, Classification>,
}

impl TableClassifier {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn with(mut self, code: &str, classification: Classification) -> Self {
        self.entries.insert(code.to_string(), classification);
        self
    }
}

impl InstrumentClassifier for TableClassifier {
    fn classify(&self, code: &str) -> Result<Classification, ClassifyError> {
        self.entries
            .get(code)
            .cloned()
            .ok_or_else(|| ClassifyError::Unrecognized(code.to_string()))
    }
}

/// Every code is its own underlying; options are recognised by suffix.
pub struct PassThroughClassifier;

impl InstrumentClassifier for PassThroughClassifier {
    fn classify(&self, code: &str) -> Result<Classification, ClassifyError> {
        let instrument_type = if code.ends_with("CE") {
            InstrumentType::Call
        } else if code.ends_with("PE") {
            InstrumentType::Put
        } else {
            InstrumentType::Future
        };
        Ok(Classification {
            underlying: code.to_string(),
            instrument_type,
            strike: None,
            expiry_date: None,
            is_weekly: false,
            is_monthly: true,
            is_index: false,
        })
    }
}

pub fn option_class(underlying: &str, kind: InstrumentType, expiry: NaiveDate) -> Classification {
    Classification {
        underlying: underlying.to_string(),
        instrument_type: kind,
        strike: Some(100.0),
        expiry_date: Some(expiry),
        is_weekly: true,
        is_monthly: false,
        is_index: underlying == "NIFTY",
    }
}

pub fn make_fill(row: usize, code: &str, side: &str, qty: u64, price: f64, ts: &str) -> RawFill {
    RawFill {
        row,
        instrument_code: code.to_string(),
        side: side.to_string(),
        quantity: qty.to_string(),
        price: price.to_string(),
        timestamp: ts.to_string(),
        expiry_date: None,
    }
}

/// Fills numbered in order, each `(code, side, qty, price, timestamp)`.
pub fn fills(rows: &[(&str, &str, u64, f64, &str)]) -> Vec<RawFill> {
    rows.iter()
        .enumerate()
        .map(|(i, (code, side, qty, price, ts))| make_fill(i + 1, code, side, *qty, *price, ts))
        .collect()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub const SAMPLE_CSV: &str = "symbol,trade_date,exchange,segment,trade_type,quantity,price,order_execution_time,expiry_date\n\
NIFTY24JAN21500CE,2024-01-15,NSE,FO,buy,50,120.5,2024-01-15T09:20:11,2024-01-25\n\
NIFTY24JAN21500CE,2024-01-16,NSE,FO,sell,50,140.0,2024-01-16T10:02:45,2024-01-25\n\
BANKNIFTY24JANFUT,2024-01-17,NSE,FO,sell,15,46000,2024-01-17T09:30:00,2024-01-25\n\
BANKNIFTY24JANFUT,2024-01-18,NSE,FO,buy,15,46200,2024-01-18T14:10:00,2024-01-25\n\
NIFTY2411821500PE,2024-01-16,NSE,FO,buy,100,80,2024-01-16T09:45:00,\n\
NIFTY2411821500PE,2024-01-18,NSE,FO,sell,100,95,2024-01-18T15:00:00,\n\
RELIANCE24JAN2900CE,2024-01-19,NSE,FO,buy,250,30,2024-01-19T11:00:00,2024-01-25\n\
NOTASYMBOL,2024-01-19,NSE,FO,buy,1,10,2024-01-19T11:00:00,\n\
NIFTY24JAN21500CE,2024-01-19,NSE,FO,buy,0,120,2024-01-19T11:00:00,2024-01-25\n";

//! Broker tradebook CSV adapter.

use crate::domain::error::TradebookError;
use crate::domain::leg::RawFill;
use crate::ports::fill_port::FillSource;
use std::fs;
use std::path::PathBuf;

const CODE_COLUMNS: &[&str] = &["symbol", "tradingsymbol", "instrument_code"];
const SIDE_COLUMNS: &[&str] = &["trade_type", "side"];
const QUANTITY_COLUMNS: &[&str] = &["quantity", "qty"];
const PRICE_COLUMNS: &[&str] = &["price"];
const TIME_COLUMNS: &[&str] = &["order_execution_time", "timestamp", "trade_date"];
const EXPIRY_COLUMNS: &[&str] = &["expiry_date"];

pub struct CsvFillSource {
    path: PathBuf,
}

impl CsvFillSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl FillSource for CsvFillSource {
    fn source_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    fn load_fills(&self) -> Result<Vec<RawFill>, TradebookError> {
        let content = fs::read_to_string(&self.path).map_err(|e| TradebookError::Input {
            source_name: self.source_name(),
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        let fills = parse_fills(&self.source_name(), &content)?;
        log::info!("read {} rows from {}", fills.len(), self.path.display());
        Ok(fills)
    }
}

fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .replace(' ', "_")
}

fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| headers.iter().position(|h| h == alias))
}

fn require_column(
    source_name: &str,
    headers: &[String],
    aliases: &[&str],
) -> Result<usize, TradebookError> {
    find_column(headers, aliases).ok_or_else(|| TradebookError::MissingColumn {
        source_name: source_name.to_string(),
        column: aliases.join(" | "),
    })
}

/// Parse tradebook CSV text into raw fills, one per data row.
///
/// Only the header row is validated here; cell contents are kept verbatim
/// for the normalizer to judge.
pub fn parse_fills(source_name: &str, content: &str) -> Result<Vec<RawFill>, TradebookError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| TradebookError::Input {
            source_name: source_name.to_string(),
            reason: format!("CSV header error: {}", e),
        })?
        .iter()
        .map(normalize_header)
        .collect();

    let code = require_column(source_name, &headers, CODE_COLUMNS)?;
    let side = require_column(source_name, &headers, SIDE_COLUMNS)?;
    let quantity = require_column(source_name, &headers, QUANTITY_COLUMNS)?;
    let price = require_column(source_name, &headers, PRICE_COLUMNS)?;
    let timestamp = require_column(source_name, &headers, TIME_COLUMNS)?;
    let expiry = find_column(&headers, EXPIRY_COLUMNS);

    let mut fills = Vec::new();
    for (index, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| TradebookError::Input {
            source_name: source_name.to_string(),
            reason: format!("CSV parse error: {}", e),
        })?;
        let cell = |idx: usize| record.get(idx).unwrap_or("").to_string();

        fills.push(RawFill {
            row: index + 1,
            instrument_code: cell(code),
            side: cell(side),
            quantity: cell(quantity),
            price: cell(price),
            timestamp: cell(timestamp),
            expiry_date: expiry.map(cell).filter(|s| !s.is_empty()),
        });
    }

    Ok(fills)
}

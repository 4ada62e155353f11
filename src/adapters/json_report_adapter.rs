//! JSON report adapter.

use crate::domain::error::TradebookError;
use crate::domain::report::Report;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportAdapter {
    pretty: bool,
}

impl JsonReportAdapter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl ReportPort for JsonReportAdapter {
    fn render(&self, report: &Report) -> Result<Vec<u8>, TradebookError> {
        let result = if self.pretty {
            serde_json::to_vec_pretty(report)
        } else {
            serde_json::to_vec(report)
        };
        let mut bytes = result.map_err(|e| TradebookError::Report {
            reason: format!("failed to serialize report: {}", e),
        })?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::leg::{Classification, RawFill};
    use crate::domain::report::{AnalysisConfig, analyze};
    use crate::ports::classifier_port::{ClassifyError, InstrumentClassifier};
    use tempfile::TempDir;

    struct RawCode;

    impl InstrumentClassifier for RawCode {
        fn classify(&self, code: &str) -> Result<Classification, ClassifyError> {
            Ok(Classification::unclassified(code))
        }
    }

    fn sample_report() -> Report {
        let fills: Vec<RawFill> = [
            ("buy", "10", "100", "2024-01-02 09:15:00"),
            ("sell", "4", "110", "2024-01-03 09:15:00"),
            ("sell", "6", "90", "2024-01-04 09:15:00"),
        ]
        .iter()
        .enumerate()
        .map(|(i, (side, qty, price, ts))| RawFill {
            row: i + 1,
            instrument_code: "X".into(),
            side: side.to_string(),
            quantity: qty.to_string(),
            price: price.to_string(),
            timestamp: ts.to_string(),
            expiry_date: None,
        })
        .collect();
        analyze("t.csv", &fills, &RawCode, &AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn compact_output_is_valid_json() {
        let bytes = JsonReportAdapter::new(false).render(&sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["summary"]["total_trades"], 2);
        assert_eq!(value["metadata"]["source_name"], "t.csv");
        assert_eq!(value["trades"][0]["direction"], "long");
        assert_eq!(value["trades"][0]["entry_date"], "2024-01-02");
        assert!(value["risk"]["win_loss_ratio"].is_number());
        assert!(value["distributions"]["pnl"].is_array());
        assert_eq!(bytes.iter().filter(|b| **b == b'\n').count(), 1);
    }

    #[test]
    fn undefined_ratios_are_null() {
        let mut report = sample_report();
        report.risk.recovery_factor = crate::domain::ratio::Ratio::Undefined;
        let bytes = JsonReportAdapter::new(false).render(&report).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value["risk"]["recovery_factor"].is_null());
    }

    #[test]
    fn pretty_output_spans_lines() {
        let bytes = JsonReportAdapter::new(true).render(&sample_report()).unwrap();
        assert!(bytes.iter().filter(|b| **b == b'\n').count() > 10);
    }

    #[test]
    fn write_is_byte_identical_across_runs() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");
        let adapter = JsonReportAdapter::new(true);
        adapter.write(&sample_report(), &first).unwrap();
        adapter.write(&sample_report(), &second).unwrap();
        assert_eq!(
            std::fs::read(&first).unwrap(),
            std::fs::read(&second).unwrap()
        );
    }

    #[test]
    fn write_to_missing_directory_fails() {
        let result = JsonReportAdapter::new(false)
            .write(&sample_report(), std::path::Path::new("/nonexistent/dir/r.json"));
        assert!(matches!(result, Err(TradebookError::Io(_))));
    }
}

//! Configuration validation.
//!
//! Validates every recognised key before an analysis runs. Absent keys are
//! fine; present keys must hold usable values.

use crate::domain::distribution::BinMode;
use crate::domain::error::TradebookError;
use crate::ports::config_port::ConfigPort;

pub const MAX_HISTOGRAM_BINS: i64 = 200;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TradebookError> {
    validate_analysis_config(config)?;
    validate_matching_config(config)?;
    validate_report_config(config)?;
    Ok(())
}

pub fn validate_analysis_config(config: &dyn ConfigPort) -> Result<(), TradebookError> {
    validate_histogram_bins(config)?;
    validate_histogram_mode(config)?;
    validate_annualization_factor(config)?;
    validate_risk_free_rate(config)?;
    Ok(())
}

pub fn validate_matching_config(config: &dyn ConfigPort) -> Result<(), TradebookError> {
    validate_bool(config, "matching", "parallel")?;
    validate_parallel_threshold(config)?;
    Ok(())
}

pub fn validate_report_config(config: &dyn ConfigPort) -> Result<(), TradebookError> {
    validate_bool(config, "report", "pretty")?;
    if let Some(output) = config.get_string("report", "output")
        && output.trim().is_empty()
    {
        return Err(invalid("report", "output", "output must not be empty"));
    }
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> TradebookError {
    TradebookError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// A present value that does not parse falls back to the lookup default, so
/// parse failures are caught by reading the raw string.
fn raw_number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, TradebookError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| invalid(section, key, &format!("{key} must be a number"))),
    }
}

/// Integer keys are read with `get_int`, which rejects decimal spellings such
/// as `20.0`, so they must parse as integers here too.
fn raw_integer(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<i64>, TradebookError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| invalid(section, key, &format!("{key} must be a whole number"))),
    }
}

fn validate_histogram_bins(config: &dyn ConfigPort) -> Result<(), TradebookError> {
    let Some(value) = raw_integer(config, "analysis", "histogram_bins")? else {
        return Ok(());
    };
    if !(1..=MAX_HISTOGRAM_BINS).contains(&value) {
        return Err(invalid(
            "analysis",
            "histogram_bins",
            &format!("histogram_bins must be a whole number between 1 and {MAX_HISTOGRAM_BINS}"),
        ));
    }
    Ok(())
}

fn validate_histogram_mode(config: &dyn ConfigPort) -> Result<(), TradebookError> {
    match config.get_string("analysis", "histogram_mode") {
        Some(mode) => mode
            .parse::<BinMode>()
            .map(|_| ())
            .map_err(|reason| invalid("analysis", "histogram_mode", &reason)),
        None => Ok(()),
    }
}

fn validate_annualization_factor(config: &dyn ConfigPort) -> Result<(), TradebookError> {
    if let Some(value) = raw_number(config, "analysis", "annualization_factor")?
        && value <= 0.0
    {
        return Err(invalid(
            "analysis",
            "annualization_factor",
            "annualization_factor must be positive",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), TradebookError> {
    if let Some(value) = raw_number(config, "analysis", "risk_free_rate")?
        && value < 0.0
    {
        return Err(invalid(
            "analysis",
            "risk_free_rate",
            "risk_free_rate must be non-negative",
        ));
    }
    Ok(())
}

fn validate_parallel_threshold(config: &dyn ConfigPort) -> Result<(), TradebookError> {
    if let Some(value) = raw_integer(config, "matching", "parallel_threshold")?
        && value < 0
    {
        return Err(invalid(
            "matching",
            "parallel_threshold",
            "parallel_threshold must be a non-negative whole number",
        ));
    }
    Ok(())
}

fn validate_bool(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), TradebookError> {
    match config.get_string(section, key) {
        None => Ok(()),
        Some(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "false" | "yes" | "no" | "on" | "off" | "1" | "0" => Ok(()),
            _ => Err(invalid(section, key, &format!("{key} must be true or false"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn invalid_key(err: TradebookError) -> String {
        match err {
            TradebookError::ConfigInvalid { key, .. } => key,
            other => panic!("expected ConfigInvalid, got {other}"),
        }
    }

    #[test]
    fn valid_config_passes() {
        let config = make_config(
            r#"
[analysis]
histogram_bins = 20
histogram_mode = quantile
annualization_factor = 252
risk_free_rate = 0.0

[matching]
parallel = false
parallel_threshold = 128

[report]
pretty = true
output = out/report.json
"#,
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_config_passes() {
        assert!(validate_config(&make_config("")).is_ok());
    }

    #[test]
    fn histogram_bins_zero_fails() {
        let config = make_config("[analysis]\nhistogram_bins = 0\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "histogram_bins");
    }

    #[test]
    fn histogram_bins_above_max_fails() {
        let config = make_config("[analysis]\nhistogram_bins = 500\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "histogram_bins");
    }

    #[test]
    fn histogram_bins_not_a_number_fails() {
        let config = make_config("[analysis]\nhistogram_bins = lots\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "histogram_bins");
    }

    #[test]
    fn histogram_bins_decimal_spelling_fails() {
        let config = make_config("[analysis]\nhistogram_bins = 20.0\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "histogram_bins");
    }

    #[test]
    fn unknown_histogram_mode_fails() {
        let config = make_config("[analysis]\nhistogram_mode = log\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "histogram_mode");
    }

    #[test]
    fn annualization_factor_zero_fails() {
        let config = make_config("[analysis]\nannualization_factor = 0\n");
        assert_eq!(
            invalid_key(validate_config(&config).unwrap_err()),
            "annualization_factor"
        );
    }

    #[test]
    fn risk_free_rate_negative_fails() {
        let config = make_config("[analysis]\nrisk_free_rate = -0.05\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "risk_free_rate");
    }

    #[test]
    fn parallel_flag_must_be_boolean() {
        let config = make_config("[matching]\nparallel = maybe\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "parallel");
    }

    #[test]
    fn parallel_threshold_negative_fails() {
        let config = make_config("[matching]\nparallel_threshold = -1\n");
        assert_eq!(
            invalid_key(validate_config(&config).unwrap_err()),
            "parallel_threshold"
        );
    }

    #[test]
    fn parallel_threshold_decimal_spelling_fails() {
        let config = make_config("[matching]\nparallel_threshold = 5.0\n");
        assert_eq!(
            invalid_key(validate_config(&config).unwrap_err()),
            "parallel_threshold"
        );
    }
}

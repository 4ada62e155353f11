//! Report assembly: normalize, match, then aggregate.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

use super::breakdown::{
    self, DayRow, DirectionSplit, ExpiryBreakdown, InstrumentSplit, MonthRow, OpenExposureRow,
    UnderlyingAttribution, UnderlyingRow, WeekdayRow,
};
use super::config_validation::validate_config;
use super::distribution::{self, BinMode, DEFAULT_BINS, HistogramBin};
use super::equity::{self, BucketPoint, DrawdownPoint, EquityPoint, MaxDrawdown, Resample};
use super::error::TradebookError;
use super::leg::RawFill;
use super::matching::{self, DEFAULT_PARALLEL_THRESHOLD, MatchOptions};
use super::metrics::{self, RiskMetrics, RiskParams, ScatterPoint, Summary, TRADING_DAYS_PER_YEAR};
use super::normalizer;
use super::trade::{MatchedTrade, OpenPosition};
use super::warning::DataWarning;
use crate::ports::classifier_port::InstrumentClassifier;
use crate::ports::config_port::ConfigPort;

/// Typed analysis settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisConfig {
    pub histogram_bins: usize,
    pub histogram_mode: BinMode,
    pub risk: RiskParams,
    pub matching: MatchOptions,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            histogram_bins: DEFAULT_BINS,
            histogram_mode: BinMode::FixedWidth,
            risk: RiskParams::default(),
            matching: MatchOptions::default(),
        }
    }
}

impl AnalysisConfig {
    /// Validate `config` and read the `[analysis]` and `[matching]` sections.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TradebookError> {
        validate_config(config)?;

        let histogram_mode = match config.get_string("analysis", "histogram_mode") {
            Some(mode) => mode.parse::<BinMode>().map_err(|reason| TradebookError::ConfigInvalid {
                section: "analysis".to_string(),
                key: "histogram_mode".to_string(),
                reason,
            })?,
            None => BinMode::FixedWidth,
        };

        Ok(AnalysisConfig {
            histogram_bins: config.get_int("analysis", "histogram_bins", DEFAULT_BINS as i64)
                as usize,
            histogram_mode,
            risk: RiskParams {
                annualization_factor: config.get_double(
                    "analysis",
                    "annualization_factor",
                    TRADING_DAYS_PER_YEAR,
                ),
                risk_free_rate: config.get_double("analysis", "risk_free_rate", 0.0),
            },
            matching: MatchOptions {
                parallel: config.get_bool("matching", "parallel", true),
                parallel_threshold: config.get_int(
                    "matching",
                    "parallel_threshold",
                    DEFAULT_PARALLEL_THRESHOLD as i64,
                ) as usize,
            },
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    pub source_name: String,
    pub first_trade_date: Option<NaiveDate>,
    pub last_trade_date: Option<NaiveDate>,
    /// Calendar days from first entry to last exit, both inclusive.
    pub period_days: i64,
    pub total_rows: usize,
    pub valid_legs: usize,
    pub rejected_rows: usize,
    pub trade_count: usize,
    pub instrument_count: usize,
    pub underlying_count: usize,
    pub open_position_count: usize,
    pub warning_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OpenPositionSummary {
    pub count: usize,
    pub total_value: f64,
    pub concentration: Vec<OpenExposureRow>,
    pub positions: Vec<OpenPosition>,
}

impl OpenPositionSummary {
    fn new(positions: Vec<OpenPosition>) -> Self {
        OpenPositionSummary {
            count: positions.len(),
            total_value: positions.iter().map(OpenPosition::open_value).sum(),
            concentration: breakdown::open_concentration(&positions),
            positions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdowns {
    pub monthly: Vec<MonthRow>,
    pub daily: Vec<DayRow>,
    pub day_of_week: Vec<WeekdayRow>,
    pub underlyings: Vec<UnderlyingRow>,
    pub attribution: UnderlyingAttribution,
    pub instrument_types: InstrumentSplit,
    pub directions: DirectionSplit,
    pub expiry: ExpiryBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distributions {
    pub pnl: Vec<HistogramBin>,
    pub return_pct: Vec<HistogramBin>,
}

/// Everything computed for one input, ready for serialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub metadata: Metadata,
    pub summary: Summary,
    pub risk: RiskMetrics,
    pub equity_curve: Vec<EquityPoint>,
    pub daily_equity: Vec<BucketPoint>,
    pub monthly_equity: Vec<BucketPoint>,
    pub drawdown_curve: Vec<DrawdownPoint>,
    pub max_drawdown: MaxDrawdown,
    pub distributions: Distributions,
    pub risk_reward_scatter: Vec<ScatterPoint>,
    pub breakdowns: Breakdowns,
    pub trades: Vec<MatchedTrade>,
    pub open_positions: OpenPositionSummary,
    pub warnings: Vec<DataWarning>,
}

/// Run the full pipeline over raw fills.
///
/// Fails only when no report can be produced: no rows at all, or every row
/// rejected. Input with legs but no closed trades yields zeroed metrics.
pub fn analyze(
    source_name: &str,
    fills: &[RawFill],
    classifier: &dyn InstrumentClassifier,
    config: &AnalysisConfig,
) -> Result<Report, TradebookError> {
    if fills.is_empty() {
        return Err(TradebookError::EmptyInput {
            source_name: source_name.to_string(),
        });
    }

    let normalized = normalizer::normalize(fills, classifier);
    if normalized.legs.is_empty() {
        return Err(TradebookError::NoValidLegs {
            source_name: source_name.to_string(),
            rejected: normalized.rejected,
        });
    }

    let valid_legs = normalized.legs.len();
    let outcome = matching::match_legs(&normalized.legs, config.matching);
    log::info!(
        "matched {} legs into {} trades, {} open positions",
        valid_legs,
        outcome.trades.len(),
        outcome.open_positions.len()
    );

    let mut warnings = normalized.warnings;
    warnings.extend(outcome.warnings);

    let report = assemble(
        source_name,
        outcome.trades,
        outcome.open_positions,
        warnings,
        config,
        (fills.len(), valid_legs, normalized.rejected),
    );
    log::info!(
        "report ready: net P&L {:.2} over {} trades",
        report.summary.total_pnl,
        report.summary.total_trades
    );
    Ok(report)
}

fn assemble(
    source_name: &str,
    trades: Vec<MatchedTrade>,
    open_positions: Vec<OpenPosition>,
    warnings: Vec<DataWarning>,
    config: &AnalysisConfig,
    (total_rows, valid_legs, rejected_rows): (usize, usize, usize),
) -> Report {
    let ordered = equity::by_exit(&trades);

    let summary = Summary::compute(&ordered);
    let equity_curve = equity::equity_curve(&ordered);
    let (drawdown_curve, max_drawdown) = equity::drawdown(&equity_curve);
    let risk = RiskMetrics::compute(&ordered, &summary, &max_drawdown, config.risk);

    let pnls: Vec<f64> = ordered.iter().map(|t| t.pnl).collect();
    let returns: Vec<f64> = ordered.iter().filter_map(|t| t.pnl_pct).collect();
    let distributions = Distributions {
        pnl: distribution::histogram(&pnls, config.histogram_bins, config.histogram_mode, ""),
        return_pct: distribution::histogram(
            &returns,
            config.histogram_bins,
            config.histogram_mode,
            "%",
        ),
    };

    let underlying_rows = breakdown::by_underlying(&ordered);
    let breakdowns = Breakdowns {
        monthly: breakdown::by_month(&ordered),
        daily: breakdown::by_day(&ordered),
        day_of_week: breakdown::by_weekday(&ordered),
        attribution: breakdown::attribution(&underlying_rows, summary.total_pnl),
        underlyings: underlying_rows,
        instrument_types: breakdown::by_instrument_type(&ordered),
        directions: breakdown::by_direction(&ordered),
        expiry: breakdown::by_expiry(&ordered),
    };

    let first_trade_date = trades.iter().map(|t| t.entry_date).min();
    let last_trade_date = trades.iter().map(|t| t.exit_date).max();
    let period_days = match (first_trade_date, last_trade_date) {
        (Some(first), Some(last)) => (last - first).num_days() + 1,
        _ => 0,
    };
    let instruments: BTreeSet<&str> = trades.iter().map(|t| t.instrument_code.as_str()).collect();
    let underlyings: BTreeSet<&str> = trades.iter().map(|t| t.underlying.as_str()).collect();

    let metadata = Metadata {
        source_name: source_name.to_string(),
        first_trade_date,
        last_trade_date,
        period_days,
        total_rows,
        valid_legs,
        rejected_rows,
        trade_count: trades.len(),
        instrument_count: instruments.len(),
        underlying_count: underlyings.len(),
        open_position_count: open_positions.len(),
        warning_count: warnings.len(),
    };

    let risk_reward_scatter = metrics::risk_reward_scatter(&ordered);
    let daily_equity = equity::resample(&equity_curve, Resample::Daily);
    let monthly_equity = equity::resample(&equity_curve, Resample::Monthly);
    let ordered_trades: Vec<MatchedTrade> = ordered.into_iter().cloned().collect();

    Report {
        metadata,
        summary,
        risk,
        equity_curve,
        daily_equity,
        monthly_equity,
        drawdown_curve,
        max_drawdown,
        distributions,
        risk_reward_scatter,
        breakdowns,
        trades: ordered_trades,
        open_positions: OpenPositionSummary::new(open_positions),
        warnings,
    }
}

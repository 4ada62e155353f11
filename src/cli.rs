//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvFillSource;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::adapters::nse_classifier::NseSymbolClassifier;
use crate::domain::config_validation::validate_config;
use crate::domain::error::TradebookError;
use crate::domain::matching::{self, MatchOutcome};
use crate::domain::normalizer;
use crate::domain::report::{self, AnalysisConfig, Report};
use crate::domain::trade::MatchedTrade;
use crate::ports::config_port::ConfigPort;
use crate::ports::fill_port::FillSource;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_OUTPUT: &str = "report.json";

#[derive(Parser, Debug)]
#[command(name = "tradebook", about = "F&O tradebook matcher and performance analyzer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Match fills and write the full performance report as JSON
    Analyze {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        pretty: bool,
        /// Histogram bin count, overrides [analysis] histogram_bins
        #[arg(long)]
        bins: Option<usize>,
    },
    /// Print matched round trips as CSV on stdout
    Match {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Analyze {
            input,
            config,
            output,
            pretty,
            bins,
        } => run_analyze(&input, config.as_ref(), output.as_ref(), pretty, bins),
        Command::Match { input, config } => run_match(&input, config.as_ref()),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Typed analysis settings from an optional config file, with CLI overrides
/// applied last.
pub fn build_analysis_config(
    config: Option<&dyn ConfigPort>,
    bins_override: Option<usize>,
) -> Result<AnalysisConfig, TradebookError> {
    let mut analysis = match config {
        Some(c) => AnalysisConfig::from_config(c)?,
        None => AnalysisConfig::default(),
    };
    if let Some(bins) = bins_override {
        if bins == 0 {
            return Err(TradebookError::ConfigInvalid {
                section: "analysis".into(),
                key: "histogram_bins".into(),
                reason: "--bins must be at least 1".into(),
            });
        }
        analysis.histogram_bins = bins;
    }
    Ok(analysis)
}

/// Output path and formatting: CLI flags win over `[report]`.
pub fn resolve_report_settings(
    config: Option<&dyn ConfigPort>,
    output: Option<&PathBuf>,
    pretty: bool,
) -> (PathBuf, bool) {
    let output = output.cloned().unwrap_or_else(|| {
        config
            .and_then(|c| c.get_string("report", "output"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
    });
    let pretty = pretty || config.is_some_and(|c| c.get_bool("report", "pretty", false));
    (output, pretty)
}

/// Load fills from `source` and run the whole pipeline.
pub fn analyze_source(
    source: &dyn FillSource,
    config: &AnalysisConfig,
) -> Result<Report, TradebookError> {
    let fills = source.load_fills()?;
    report::analyze(&source.source_name(), &fills, &NseSymbolClassifier::new(), config)
}

fn run_analyze(
    input: &Path,
    config_path: Option<&PathBuf>,
    output_path: Option<&PathBuf>,
    pretty: bool,
    bins: Option<usize>,
) -> ExitCode {
    // Stage 1: Load config
    let adapter = match config_path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            match load_config(path) {
                Ok(a) => Some(a),
                Err(code) => return code,
            }
        }
        None => None,
    };
    let config = adapter.as_ref().map(|a| a as &dyn ConfigPort);

    let analysis = match build_analysis_config(config, bins) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let (output, pretty) = resolve_report_settings(config, output_path, pretty);

    // Stage 2: Read, match and aggregate
    eprintln!("Analyzing {}", input.display());
    let source = CsvFillSource::new(input.to_path_buf());
    let report = match analyze_source(&source, &analysis) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 3: Console summary
    print_summary(&report);

    // Stage 4: Write report
    match JsonReportAdapter::new(pretty).write(&report, &output) {
        Ok(()) => {
            eprintln!("\nReport written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to write report: {e}");
            (&e).into()
        }
    }
}

pub fn print_summary(report: &Report) {
    let meta = &report.metadata;
    let s = &report.summary;
    let r = &report.risk;

    eprintln!("\n=== Summary ===");
    if let (Some(first), Some(last)) = (meta.first_trade_date, meta.last_trade_date) {
        eprintln!("Period:           {} to {} ({} days)", first, last, meta.period_days);
    }
    eprintln!("Net P&L:          {:.2}", s.total_pnl);
    eprintln!("Total Trades:     {}", s.total_trades);
    eprintln!("Win Rate:         {:.1}%", s.win_rate * 100.0);
    eprintln!("Avg Winner:       {:.2}", s.avg_winner);
    eprintln!("Avg Loser:        {:.2}", s.avg_loser);
    eprintln!("Profit Factor:    {:.2}", r.profit_factor);
    eprintln!("Win/Loss Ratio:   {:.2}", r.win_loss_ratio);
    eprintln!("Expectancy:       {:.2}", r.expectancy);
    eprintln!("Sharpe Ratio:     {:.2}", r.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", r.sortino_ratio);
    eprintln!(
        "Max Drawdown:     -{:.2} (-{:.1}%)",
        r.max_drawdown, r.max_drawdown_pct
    );
    eprintln!("Recovery Factor:  {:.2}", r.recovery_factor);
    eprintln!(
        "Streaks:          {} wins / {} losses",
        r.max_consecutive_wins, r.max_consecutive_losses
    );

    let underlyings = &report.breakdowns.underlyings;
    if !underlyings.is_empty() {
        eprintln!("\n=== Per-Underlying Summary ===");
        for row in underlyings {
            let pnl_sign = if row.stats.total_pnl >= 0.0 { "+" } else { "" };
            eprintln!(
                "  {}:  {} trades, {:.1}% win rate, {}{:.0}",
                row.underlying,
                row.stats.trades,
                row.stats.win_rate * 100.0,
                pnl_sign,
                row.stats.total_pnl,
            );
        }
    }

    if report.open_positions.count > 0 {
        eprintln!(
            "\nOpen positions:   {} (value {:.2})",
            report.open_positions.count, report.open_positions.total_value
        );
    }
    if meta.warning_count > 0 {
        eprintln!("Warnings:         {}", meta.warning_count);
    }
}

/// Normalize and match without aggregating.
pub fn match_source(
    source: &dyn FillSource,
    config: &AnalysisConfig,
) -> Result<MatchOutcome, TradebookError> {
    let fills = source.load_fills()?;
    if fills.is_empty() {
        return Err(TradebookError::EmptyInput {
            source_name: source.source_name(),
        });
    }
    let normalized = normalizer::normalize(&fills, &NseSymbolClassifier::new());
    if normalized.legs.is_empty() {
        return Err(TradebookError::NoValidLegs {
            source_name: source.source_name(),
            rejected: normalized.rejected,
        });
    }
    let mut outcome = matching::match_legs(&normalized.legs, config.matching);
    let mut warnings = normalized.warnings;
    warnings.append(&mut outcome.warnings);
    outcome.warnings = warnings;
    Ok(outcome)
}

pub fn write_trades_csv<W: Write>(trades: &[MatchedTrade], writer: W) -> Result<(), TradebookError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for trade in trades {
        wtr.serialize(trade).map_err(|e| TradebookError::Report {
            reason: format!("failed to write trade CSV: {}", e),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

fn run_match(input: &Path, config_path: Option<&PathBuf>) -> ExitCode {
    let adapter = match config_path {
        Some(path) => match load_config(path) {
            Ok(a) => Some(a),
            Err(code) => return code,
        },
        None => None,
    };
    let analysis = match build_analysis_config(adapter.as_ref().map(|a| a as &dyn ConfigPort), None)
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let source = CsvFillSource::new(input.to_path_buf());
    let outcome = match match_source(&source, &analysis) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if let Err(e) = write_trades_csv(&outcome.trades, std::io::stdout().lock()) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    eprintln!(
        "{} trades, {} open positions, {} warnings",
        outcome.trades.len(),
        outcome.open_positions.len(),
        outcome.warnings.len()
    );
    for pos in &outcome.open_positions {
        eprintln!(
            "  open {} {} {} @ {:.2} since {}",
            pos.instrument_code, pos.direction, pos.quantity, pos.price, pos.open_date
        );
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let analysis = match AnalysisConfig::from_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let (output, pretty) = resolve_report_settings(Some(&adapter), None, false);

    eprintln!("Config validated successfully");
    eprintln!(
        "  histogram: {} bins ({:?})",
        analysis.histogram_bins, analysis.histogram_mode
    );
    eprintln!(
        "  annualization factor: {}, risk-free rate: {}",
        analysis.risk.annualization_factor, analysis.risk.risk_free_rate
    );
    eprintln!(
        "  matching: parallel={} threshold={}",
        analysis.matching.parallel, analysis.matching.parallel_threshold
    );
    eprintln!("  report: {} (pretty={})", output.display(), pretty);
    ExitCode::SUCCESS
}

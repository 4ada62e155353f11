//! Histograms over trade P&L and returns.

use serde::Serialize;
use std::str::FromStr;

pub const DEFAULT_BINS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinMode {
    #[default]
    FixedWidth,
    Quantile,
}

impl FromStr for BinMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" | "fixed_width" => Ok(BinMode::FixedWidth),
            "quantile" => Ok(BinMode::Quantile),
            other => Err(format!("unknown histogram mode: {other}")),
        }
    }
}

/// One bin covering `[min, max)`; the last bin also includes `max`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub min: f64,
    pub max: f64,
    pub label: String,
    pub count: usize,
}

fn label(lo: f64, hi: f64, suffix: &str) -> String {
    format!("{lo:.0}{suffix} to {hi:.0}{suffix}")
}

/// Bin `values` into at most `bins` buckets. `suffix` is appended to each
/// bound in the label (e.g. `"%"`).
///
/// Every finite value lands in exactly one bin. When all values are equal a
/// single degenerate bin with `min == max` is returned.
pub fn histogram(values: &[f64], bins: usize, mode: BinMode, suffix: &str) -> Vec<HistogramBin> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }
    finite.sort_by(f64::total_cmp);
    let lo = finite[0];
    let hi = finite[finite.len() - 1];

    if lo == hi {
        return vec![HistogramBin {
            min: lo,
            max: hi,
            label: format!("{lo:.0}{suffix}"),
            count: finite.len(),
        }];
    }

    let edges = match mode {
        BinMode::FixedWidth => fixed_edges(lo, hi, bins),
        BinMode::Quantile => quantile_edges(&finite, bins),
    };
    count_into(&finite, &edges, suffix)
}

fn fixed_edges(lo: f64, hi: f64, bins: usize) -> Vec<f64> {
    let width = (hi - lo) / bins as f64;
    let mut edges: Vec<f64> = (0..bins).map(|i| lo + i as f64 * width).collect();
    edges.push(hi);
    edges
}

fn quantile_edges(sorted: &[f64], bins: usize) -> Vec<f64> {
    let n = sorted.len();
    let mut edges: Vec<f64> = (0..bins).map(|k| sorted[(k * n / bins).min(n - 1)]).collect();
    edges.push(sorted[n - 1]);
    edges.dedup();
    edges
}

fn count_into(sorted: &[f64], edges: &[f64], suffix: &str) -> Vec<HistogramBin> {
    let last = edges.len() - 2;
    let mut counts = vec![0usize; edges.len() - 1];
    for &v in sorted {
        let idx = edges.partition_point(|e| *e <= v).saturating_sub(1).min(last);
        counts[idx] += 1;
    }

    edges
        .windows(2)
        .zip(counts)
        .map(|(w, count)| HistogramBin {
            min: w[0],
            max: w[1],
            label: label(w[0], w[1], suffix),
            count,
        })
        .collect()
}

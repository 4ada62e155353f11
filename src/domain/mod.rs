//! Core domain types and logic.

pub mod breakdown;
pub mod config_validation;
pub mod distribution;
pub mod equity;
pub mod error;
pub mod leg;
pub mod matching;
pub mod metrics;
pub mod normalizer;
pub mod ratio;
pub mod report;
pub mod tally;
pub mod trade;
pub mod warning;

//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod engine;
pub mod equity;
pub mod error;
pub mod featurizer;
pub mod metrics;
pub mod risk;
pub mod schedule;
pub mod series;
pub mod signal;

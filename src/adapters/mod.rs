//! Concrete adapter implementations for ports.

pub mod csv_quote_adapter;
pub mod csv_report_adapter;
pub mod file_config_adapter;
pub mod linear_predictor;
pub mod momentum_predictor;
pub mod tick_file_adapter;

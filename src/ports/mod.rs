//! Port traits for the collaborators the walk-forward core depends on.

pub mod config_port;
pub mod data_port;
pub mod predictor_port;
pub mod report_port;

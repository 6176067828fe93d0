//! Configuration validation.
//!
//! Validates every section before any data is loaded or any segment runs.

use crate::domain::equity::AccumulationMode;
use crate::domain::error::ArlError;
use crate::domain::risk::RiskControl;
use crate::domain::series::PriceField;
use crate::ports::config_port::ConfigPort;

pub const MODEL_KINDS: [&str; 2] = ["linear", "momentum"];
pub const DATA_FORMATS: [&str; 2] = ["dat", "csv"];

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), ArlError> {
    validate_data(config)?;
    validate_model(config)?;
    validate_walkforward(config)?;
    validate_engine(config)?;
    validate_report(config)?;
    Ok(())
}

pub fn validate_data(config: &dyn ConfigPort) -> Result<(), ArlError> {
    match config.get_string("data", "path") {
        Some(p) if !p.trim().is_empty() => {}
        _ => return Err(missing("data", "path")),
    }
    if let Some(format) = config.get_string("data", "format") {
        if !DATA_FORMATS.contains(&format.trim().to_lowercase().as_str()) {
            return Err(invalid("data", "format", "format must be dat or csv"));
        }
    }
    if let Some(field) = config.get_string("data", "field") {
        if PriceField::parse(&field).is_none() {
            return Err(invalid("data", "field", "field must be ask, bid or mid"));
        }
    }
    if let Some(delimiter) = config.get_string("data", "delimiter") {
        if delimiter_byte(&delimiter).is_none() {
            return Err(invalid("data", "delimiter", "delimiter must be a single character"));
        }
    }
    optional_positive(config, "data", "limit")?;
    Ok(())
}

pub fn validate_model(config: &dyn ConfigPort) -> Result<(), ArlError> {
    if let Some(kind) = config.get_string("model", "kind") {
        if !MODEL_KINDS.contains(&kind.trim().to_lowercase().as_str()) {
            return Err(invalid("model", "kind", "kind must be linear or momentum"));
        }
    }
    required_positive(config, "model", "window")?;
    if let Some(rate) = optional_f64(config, "model", "learning_rate")? {
        if rate <= 0.0 {
            return Err(invalid("model", "learning_rate", "learning_rate must be positive"));
        }
    }
    optional_positive(config, "model", "epochs")?;
    Ok(())
}

pub fn validate_walkforward(config: &dyn ConfigPort) -> Result<(), ArlError> {
    required_positive(config, "walkforward", "train")?;
    required_positive(config, "walkforward", "step")?;
    Ok(())
}

pub fn validate_engine(config: &dyn ConfigPort) -> Result<(), ArlError> {
    if let Some(cost) = optional_f64(config, "engine", "cost")? {
        if cost < 0.0 {
            return Err(invalid("engine", "cost", "cost must be non-negative"));
        }
    }

    let kind = config
        .get_string("engine", "risk_control")
        .unwrap_or_else(|| "none".to_string());
    let threshold = optional_f64(config, "engine", "threshold")?;
    let policy = RiskControl::parse(&kind, threshold.unwrap_or(0.0)).ok_or_else(|| {
        invalid(
            "engine",
            "risk_control",
            "risk_control must be none, pnl_drawdown or price_drawdown",
        )
    })?;
    if policy != RiskControl::NoControl && threshold.is_none() {
        return Err(missing("engine", "threshold"));
    }
    policy
        .validate()
        .map_err(|reason| invalid("engine", "threshold", &reason))?;

    if let Some(mode) = config.get_string("engine", "accumulation") {
        if AccumulationMode::parse(&mode).is_none() {
            return Err(invalid("engine", "accumulation", "accumulation must be additive or chained"));
        }
    }
    optional_f64(config, "engine", "initial_equity")?;
    Ok(())
}

pub fn validate_report(config: &dyn ConfigPort) -> Result<(), ArlError> {
    optional_positive(config, "report", "periods")?;
    Ok(())
}

/// Reads a key that must be a positive integer.
pub fn required_positive(config: &dyn ConfigPort, section: &str, key: &str) -> Result<usize, ArlError> {
    optional_positive(config, section, key)?.ok_or_else(|| missing(section, key))
}

/// Reads an optional positive integer; present but malformed is an error.
pub fn optional_positive(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<usize>, ArlError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(None);
    };
    match raw.trim().parse::<usize>() {
        Ok(v) if v > 0 => Ok(Some(v)),
        _ => Err(invalid(
            section,
            key,
            &format!("{key} must be a positive integer, got '{raw}'"),
        )),
    }
}

/// Reads an optional finite float; present but malformed is an error.
pub fn optional_f64(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, ArlError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(None);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(invalid(
            section,
            key,
            &format!("{key} must be a finite number, got '{raw}'"),
        )),
    }
}

/// Single-byte delimiter. INI treats `;` as a comment marker, so named
/// forms are accepted too.
pub fn delimiter_byte(value: &str) -> Option<u8> {
    match value.trim() {
        "\\t" | "tab" => Some(b'\t'),
        "semicolon" => Some(b';'),
        "comma" => Some(b','),
        v if v.len() == 1 => v.bytes().next(),
        _ => None,
    }
}

fn missing(section: &str, key: &str) -> ArlError {
    ArlError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> ArlError {
    ArlError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    const VALID: &str = r#"
[data]
path = ticks.dat
format = dat
field = ask
limit = 1000

[model]
kind = linear
window = 20
learning_rate = 0.01
epochs = 2

[walkforward]
train = 200
step = 50

[engine]
cost = 0.0002
risk_control = pnl_drawdown
threshold = 0.01
accumulation = chained

[report]
periods = 5
"#;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn with(replace: &str, by: &str) -> FileConfigAdapter {
        assert!(VALID.contains(replace));
        make_config(&VALID.replace(replace, by))
    }

    fn invalid_key(err: ArlError) -> String {
        match err {
            ArlError::ConfigInvalid { key, .. } => key,
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate_config(&make_config(VALID)).is_ok());
    }

    #[test]
    fn minimal_config_passes() {
        let config = make_config(
            "[data]\npath = a.dat\n[model]\nwindow = 5\n[walkforward]\ntrain = 10\nstep = 2\n",
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn missing_data_path_fails() {
        let err = validate_config(&with("path = ticks.dat", "")).unwrap_err();
        assert!(matches!(err, ArlError::ConfigMissing { key, .. } if key == "path"));
    }

    #[test]
    fn unknown_format_fails() {
        let err = validate_config(&with("format = dat", "format = xml")).unwrap_err();
        assert_eq!(invalid_key(err), "format");
    }

    #[test]
    fn unknown_field_fails() {
        let err = validate_config(&with("field = ask", "field = last")).unwrap_err();
        assert_eq!(invalid_key(err), "field");
    }

    #[test]
    fn zero_limit_fails() {
        let err = validate_config(&with("limit = 1000", "limit = 0")).unwrap_err();
        assert_eq!(invalid_key(err), "limit");
    }

    #[test]
    fn unknown_model_kind_fails() {
        let err = validate_config(&with("kind = linear", "kind = lstm")).unwrap_err();
        assert_eq!(invalid_key(err), "kind");
    }

    #[test]
    fn zero_window_fails() {
        let err = validate_config(&with("window = 20", "window = 0")).unwrap_err();
        assert_eq!(invalid_key(err), "window");
    }

    #[test]
    fn non_numeric_window_fails() {
        let err = validate_config(&with("window = 20", "window = twenty")).unwrap_err();
        assert_eq!(invalid_key(err), "window");
    }

    #[test]
    fn missing_train_fails() {
        let err = validate_config(&with("train = 200", "")).unwrap_err();
        assert!(matches!(err, ArlError::ConfigMissing { key, .. } if key == "train"));
    }

    #[test]
    fn negative_learning_rate_fails() {
        let err = validate_config(&with("learning_rate = 0.01", "learning_rate = -1")).unwrap_err();
        assert_eq!(invalid_key(err), "learning_rate");
    }

    #[test]
    fn negative_cost_fails() {
        let err = validate_config(&with("cost = 0.0002", "cost = -0.1")).unwrap_err();
        assert_eq!(invalid_key(err), "cost");
    }

    #[test]
    fn unknown_risk_control_fails() {
        let err = validate_config(&with("risk_control = pnl_drawdown", "risk_control = trailing"))
            .unwrap_err();
        assert_eq!(invalid_key(err), "risk_control");
    }

    #[test]
    fn drawdown_policy_needs_threshold() {
        let err = validate_config(&with("threshold = 0.01", "")).unwrap_err();
        assert!(matches!(err, ArlError::ConfigMissing { key, .. } if key == "threshold"));
    }

    #[test]
    fn negative_threshold_fails() {
        let err = validate_config(&with("threshold = 0.01", "threshold = -0.01")).unwrap_err();
        assert_eq!(invalid_key(err), "threshold");
    }

    #[test]
    fn no_control_needs_no_threshold() {
        let config = with("risk_control = pnl_drawdown\nthreshold = 0.01", "risk_control = none");
        assert!(validate_engine(&config).is_ok());
    }

    #[test]
    fn unknown_accumulation_fails() {
        let err = validate_config(&with("accumulation = chained", "accumulation = compound"))
            .unwrap_err();
        assert_eq!(invalid_key(err), "accumulation");
    }

    #[test]
    fn zero_periods_fails() {
        let err = validate_config(&with("periods = 5", "periods = 0")).unwrap_err();
        assert_eq!(invalid_key(err), "periods");
    }

    #[test]
    fn delimiter_parsing() {
        assert_eq!(delimiter_byte(";"), Some(b';'));
        assert_eq!(delimiter_byte("\\t"), Some(b'\t'));
        assert_eq!(delimiter_byte("semicolon"), Some(b';'));
        assert_eq!(delimiter_byte(";;"), None);
    }
}

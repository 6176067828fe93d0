//! Domain error types.

/// Top-level error type for arltrader.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArlError {
    #[error("invalid window: length {window} for a series of {len} returns")]
    InvalidWindow { window: usize, len: usize },

    #[error("invalid schedule: {reason}")]
    InvalidSchedule { reason: String },

    #[error("predictor error: {reason}")]
    Predictor { reason: String },

    #[error("non-finite value at tick {tick}: {reason}")]
    Numeric { tick: usize, reason: String },

    #[error("length mismatch: {what} has {actual} values, expected {expected}")]
    LengthMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("price drawdown control requires an aligned price sequence")]
    MissingPrices,

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("insufficient data: have {have} prices, need at least {minimum}")]
    InsufficientData { have: usize, minimum: usize },

    #[error("i/o error: {reason}")]
    Io { reason: String },
}

impl From<std::io::Error> for ArlError {
    fn from(err: std::io::Error) -> Self {
        ArlError::Io {
            reason: err.to_string(),
        }
    }
}

impl ArlError {
    pub fn invalid_schedule(reason: impl Into<String>) -> Self {
        ArlError::InvalidSchedule {
            reason: reason.into(),
        }
    }

    pub fn predictor(reason: impl Into<String>) -> Self {
        ArlError::Predictor {
            reason: reason.into(),
        }
    }

    pub fn numeric(tick: usize, reason: impl Into<String>) -> Self {
        ArlError::Numeric {
            tick,
            reason: reason.into(),
        }
    }

    pub fn data(reason: impl Into<String>) -> Self {
        ArlError::Data {
            reason: reason.into(),
        }
    }

    /// True for errors raised while checking configuration, before any segment runs.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ArlError::InvalidWindow { .. }
                | ArlError::InvalidSchedule { .. }
                | ArlError::ConfigParse { .. }
                | ArlError::ConfigMissing { .. }
                | ArlError::ConfigInvalid { .. }
        )
    }
}

impl From<&ArlError> for std::process::ExitCode {
    fn from(err: &ArlError) -> Self {
        let code: u8 = match err {
            ArlError::Io { .. } => 1,
            ArlError::ConfigParse { .. }
            | ArlError::ConfigMissing { .. }
            | ArlError::ConfigInvalid { .. } => 2,
            ArlError::Data { .. } | ArlError::InsufficientData { .. } => 3,
            ArlError::InvalidWindow { .. } | ArlError::InvalidSchedule { .. } => 4,
            ArlError::Predictor { .. } => 5,
            ArlError::Numeric { .. }
            | ArlError::LengthMismatch { .. }
            | ArlError::MissingPrices => 6,
        };
        std::process::ExitCode::from(code)
    }
}

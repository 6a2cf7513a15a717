//! Domain error types.

/// Top-level error type for solidquant.
#[derive(Debug, thiserror::Error)]
pub enum SolidQuantError {
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

    #[error("insufficient data for {ticker}: have {bars} bars, need {minimum}")]
    InsufficientData {
        ticker: String,
        bars: usize,
        minimum: usize,
    },

    #[error("market data error: {reason}")]
    DataSource { reason: String },

    #[error("broker error: {reason}")]
    Broker { reason: String },

    #[error("journal error: {reason}")]
    Journal { reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SolidQuantError {
    pub fn data(reason: impl Into<String>) -> Self {
        SolidQuantError::DataSource {
            reason: reason.into(),
        }
    }

    pub fn broker(reason: impl Into<String>) -> Self {
        SolidQuantError::Broker {
            reason: reason.into(),
        }
    }

    pub fn journal(reason: impl Into<String>) -> Self {
        SolidQuantError::Journal {
            reason: reason.into(),
        }
    }
}

impl From<&SolidQuantError> for std::process::ExitCode {
    fn from(err: &SolidQuantError) -> Self {
        let code: u8 = match err {
            SolidQuantError::Io(_) | SolidQuantError::Json(_) => 1,
            SolidQuantError::ConfigParse { .. }
            | SolidQuantError::ConfigMissing { .. }
            | SolidQuantError::ConfigInvalid { .. } => 2,
            SolidQuantError::InsufficientData { .. } | SolidQuantError::DataSource { .. } => 3,
            SolidQuantError::Broker { .. } => 4,
            SolidQuantError::Journal { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

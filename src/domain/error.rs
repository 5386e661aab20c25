//! Domain error types.

/// Top-level error type for fundsim.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FundsimError {
    #[error("insufficient funds: requested {requested:.2}, available {available:.2}")]
    InsufficientFunds { requested: f64, available: f64 },

    #[error("insufficient units: requested {requested:.2}, held {held:.2}")]
    InsufficientUnits { requested: f64, held: f64 },

    #[error("no valid net value at day {day_index}")]
    InvalidPrice { day_index: usize },

    #[error("invalid trade amount: {value}")]
    InvalidAmount { value: f64 },

    #[error("no trading day after day {day_index}")]
    EndOfSeries { day_index: usize },

    #[error("sync failed: {reason}")]
    SyncFailure { reason: String },

    #[error("invalid saved game: {reason}")]
    InvalidDocument { reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("price data error: {reason}")]
    PriceData { reason: String },

    #[error("serialization error: {reason}")]
    Serialization { reason: String },

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

    #[error("io error: {reason}")]
    Io { reason: String },
}

impl From<std::io::Error> for FundsimError {
    fn from(err: std::io::Error) -> Self {
        FundsimError::Io {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for FundsimError {
    fn from(err: serde_json::Error) -> Self {
        FundsimError::Serialization {
            reason: err.to_string(),
        }
    }
}

impl FundsimError {
    /// Trade validation failures: reported to the caller, state untouched.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            FundsimError::InsufficientFunds { .. }
                | FundsimError::InsufficientUnits { .. }
                | FundsimError::InvalidPrice { .. }
                | FundsimError::InvalidAmount { .. }
                | FundsimError::EndOfSeries { .. }
        )
    }
}

impl From<&FundsimError> for std::process::ExitCode {
    fn from(err: &FundsimError) -> Self {
        let code: u8 = match err {
            FundsimError::Io { .. } => 1,
            FundsimError::ConfigParse { .. }
            | FundsimError::ConfigMissing { .. }
            | FundsimError::ConfigInvalid { .. } => 2,
            FundsimError::Database { .. }
            | FundsimError::DatabaseQuery { .. }
            | FundsimError::Serialization { .. } => 3,
            FundsimError::PriceData { .. } => 4,
            FundsimError::InsufficientFunds { .. }
            | FundsimError::InsufficientUnits { .. }
            | FundsimError::InvalidPrice { .. }
            | FundsimError::InvalidAmount { .. }
            | FundsimError::EndOfSeries { .. }
            | FundsimError::InvalidDocument { .. } => 5,
            FundsimError::SyncFailure { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

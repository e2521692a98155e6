//! Error types for the Crashline round engine
//!
//! Every failure here is recoverable: it is returned to the caller and the
//! round keeps running.

use crate::config::ConfigValidationError;
use crate::games::types::RoundState;

/// Root error type for all Crashline operations
#[derive(Debug, thiserror::Error)]
pub enum CrashlineError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Rejected player commands
    #[error("Bet error: {0}")]
    Bet(#[from] BetError),

    /// Engine driver errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Configuration and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue { field: String, value: String, reason: String },

    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// Player command errors raised by the bet ledger and the round engine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BetError {
    #[error("Cannot {operation} while round is {state}")]
    InvalidState {
        operation: &'static str,
        state: RoundState,
    },

    #[error("Invalid amount {amount}: {reason}")]
    InvalidAmount { amount: f64, reason: String },

    #[error("Insufficient funds: bet {amount} exceeds balance {balance}")]
    InsufficientFunds { amount: f64, balance: f64 },

    #[error("User {user_id} already has an open bet this round")]
    DuplicateBet { user_id: String },

    #[error("User {user_id} has no open bet")]
    NoOpenBet { user_id: String },
}

/// Errors from the async engine driver
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine task has stopped")]
    Stopped,
}

impl From<ConfigValidationError> for CrashlineError {
    fn from(e: ConfigValidationError) -> Self {
        CrashlineError::Configuration(ConfigurationError::InvalidValue {
            field: "config".to_string(),
            value: String::new(),
            reason: e.to_string(),
        })
    }
}

// Convenience type alias for Results
pub type CrashlineResult<T> = Result<T, CrashlineError>;

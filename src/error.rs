use thiserror::Error;

/// Top-level error type for the keeper
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error(
        "Inconsistent pool summary: available {available} + unlocked {unlocked} exceeds votes {votes}"
    )]
    InconsistentPoolSummary {
        votes: u64,
        available: u64,
        unlocked: u64,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while talking to the core ledger
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("RPC {method} failed with code {code}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("RPC {method} returned no result")]
    MissingResult { method: String },

    #[error("Timed out waiting for receipt of {tx_hash}")]
    ReceiptTimeout { tx_hash: String },
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::Chain(ChainError::Transport(format!("HTTP request error: {:?}", error)))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Decode(format!("JSON decode error: {}", error))
    }
}

impl From<hex::FromHexError> for AppError {
    fn from(error: hex::FromHexError) -> Self {
        AppError::Decode(format!("Hex decode error: {}", error))
    }
}

impl From<alloy_sol_types::Error> for AppError {
    fn from(error: alloy_sol_types::Error) -> Self {
        AppError::Decode(format!("ABI decode error: {}", error))
    }
}

/// Result type alias for the keeper
pub type AppResult<T> = Result<T, AppError>;

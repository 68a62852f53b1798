//! Error types for contract construction and descriptor handling

use thiserror::Error;

/// Result type for contract operations
pub type Result<T> = std::result::Result<T, ContractError>;

/// Contract errors
///
/// A compatibility mismatch is not an error: `can_read_from` returns `false`.
/// Only [`CompatibilityChecker::ensure_compatible`](crate::CompatibilityChecker::ensure_compatible)
/// turns a mismatch into [`ContractError::Incompatible`].
#[derive(Error, Debug)]
pub enum ContractError {
    #[error("Unsupported type: no provider can build a contract for {0}")]
    UnsupportedType(String),

    #[error("Invalid type definition: {0}")]
    InvalidType(String),

    #[error("Unknown type: {0} is not registered")]
    UnknownType(String),

    #[error("Unknown contract handle: {0}")]
    UnknownContract(usize),

    #[error("Contract {kind} has no assigned id")]
    MissingId { kind: &'static str },

    #[error("Malformed descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("Invalid contract markup '{markup}': {reason}")]
    InvalidMarkup { markup: String, reason: String },

    #[error("Incompatible schemas: cannot read {write} as {read}: {reason}")]
    Incompatible {
        read: String,
        write: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl ContractError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ContractError::MalformedDescriptor(reason.into())
    }

    pub(crate) fn markup(markup: impl Into<String>, reason: impl Into<String>) -> Self {
        ContractError::InvalidMarkup {
            markup: markup.into(),
            reason: reason.into(),
        }
    }
}

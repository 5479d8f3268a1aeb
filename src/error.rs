//! Error types for the dfinance client library
//!
//! Each concern gets its own error enum so callers can match on the
//! failure that matters to them:
//! - `ScriptArgError` for VM script argument encoding
//! - `TxError` for message building and transaction assembly
//! - `LogError` for event log normalization
//! - `FilterError` for tracker query filters
//! - `ApiError` for the REST transport

/// Script argument encoding errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptArgError {
    #[error("Unknown type passed as script argument: {0}")]
    UnsupportedType(String),

    #[error("Too many bytes for {width} byte uint: value needs {bytes} bytes")]
    Overflow { width: usize, bytes: usize },

    #[error("Invalid numeral: {0}")]
    InvalidNumeral(String),

    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Transaction assembly errors
#[derive(Debug, thiserror::Error)]
pub enum TxError {
    #[error("Missing transaction parameter: {0}")]
    MissingField(&'static str),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Invalid {field} payload: {reason}")]
    InvalidPayload { field: &'static str, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Event log normalization errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    #[error("Event '{event_type}' has {len} attributes, not divisible by {arity}")]
    MalformedAttributes {
        event_type: String,
        len: usize,
        arity: usize,
    },

    #[error("Unrecognized event type: {0}")]
    UnrecognizedEvent(String),
}

/// Tracker filter errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("Block filter requires a height or a [from, to] range with a starting height")]
    InvalidBlockFilter,
}

/// REST API errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(String),

    #[error("Request failed with status {code}: {body}")]
    Status { code: u16, body: serde_json::Value },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

//! Common error types for ECH Explorer

use thiserror::Error;

/// Common result type for ECH operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the survey layer and the dashboard service
#[derive(Error, Debug)]
pub enum Error {
    /// Survey could not be loaded, or the requested weight column is missing
    #[error("Load failure: {0}")]
    Load(String),

    /// Aggregation function incompatible with the variable's kind
    #[error("Unsupported aggregation: {0}")]
    UnsupportedAggregation(String),

    /// Control value could not be decoded at the UI boundary
    #[error("Malformed selection: {0}")]
    MalformedSelection(String),

    /// Column referenced by a request does not exist in the loaded survey
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A newer request for the same control replaced this one
    #[error("Superseded by a newer request")]
    Superseded,

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

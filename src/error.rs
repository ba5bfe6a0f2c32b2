//! Error types for the wizard client.
//!
//! Transport failures are recoverable (the previous state survives and the
//! operation can be re-issued); format and consistency errors are defects in
//! the server contract and are surfaced rather than guessed around.

use serde_json::Value;
use thiserror::Error;

/// Result type alias for convenience
pub type WizardResult<T> = Result<T, WizardError>;

/// Top-level error type for the wizard client
#[derive(Error, Debug)]
pub enum WizardError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A step submission the server rejected with structured validation
    /// feedback. The feedback payload has already replaced the owned state
    /// by the time this error is returned.
    #[error("step submission rejected with status {status}")]
    Validation { status: u16 },

    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("structure inconsistency: {0}")]
    Inconsistency(#[from] StructureInconsistency),

    /// An operation that needs the current position was called before the
    /// first successful load.
    #[error("no wizard state loaded yet")]
    NoState,
}

/// Request-level failures from the injected transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to build HTTP client: {message}")]
    Init { message: String },

    #[error("request to '{path}' failed: {message}")]
    Request { path: String, message: String },

    /// Non-success status. The response body is kept when the server sent
    /// one — step submissions return validation feedback this way.
    #[error("request to '{path}' returned status {status}")]
    Status {
        path: String,
        status: u16,
        body: Option<Value>,
    },
}

/// Malformed identifiers or payloads in a server response
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("step identifier '{raw}' splits into more than two parts")]
    MalformedIdentifier { raw: String },

    #[error("step '{step}' appears more than once in the structure")]
    DuplicateStep { step: String },

    #[error("step '{step}' is used both with and without sub-steps")]
    MixedStep { step: String },

    #[error("response is missing required field '{field}'")]
    MissingField { field: String },

    #[error("malformed wizard payload: {message}")]
    Payload { message: String },
}

/// A step-data entry that does not resolve against the structure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("step data entry '{identifier}' does not resolve against the structure")]
pub struct StructureInconsistency {
    pub identifier: String,
}

//! Error types for hivearrow-rs.
//!
//! This module defines domain-specific error types organized by functional area.

use crate::transport::messages::{OperationState, StatusCode, TStatus};
use crate::transport::thrift::DecodeError;
use std::fmt;
use thiserror::Error;

/// Top-level error type encompassing all possible errors.
#[derive(Error, Debug)]
pub enum HiveError {
    /// Connection-related errors
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Query execution errors
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Data conversion errors
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Transport protocol errors
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl HiveError {
    /// Whether the server rejected the requested protocol version.
    ///
    /// Callers may retry the session open with an older version.
    pub fn is_protocol_not_supported(&self) -> bool {
        matches!(
            self,
            HiveError::Connection(ConnectionError::ProtocolNotSupported { .. })
        )
    }
}

/// A non-success response status returned by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusError {
    /// Raw status code from the response
    pub code: i32,
    /// SQL state, if the server provided one
    pub sql_state: Option<String>,
    /// Vendor error code
    pub error_code: Option<i32>,
    /// Error message
    pub message: Option<String>,
    /// Diagnostic info messages
    pub info_messages: Vec<String>,
}

impl StatusError {
    /// Decoded status code, `None` for values outside the protocol enum.
    pub fn status_code(&self) -> Option<StatusCode> {
        StatusCode::from_i32(self.code)
    }

    /// Message text, or an empty string.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }
}

impl From<TStatus> for StatusError {
    fn from(status: TStatus) -> Self {
        Self {
            code: status.status_code,
            sql_state: status.sql_state,
            error_code: status.error_code,
            message: status.error_message,
            info_messages: status.info_messages,
        }
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code() {
            Some(code) => write!(f, "{}", code)?,
            None => write!(f, "STATUS({})", self.code)?,
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        if let Some(state) = &self.sql_state {
            write!(f, " (SQL state: {})", state)?;
        }
        if let Some(code) = self.error_code {
            write!(f, " (error code: {})", code)?;
        }
        Ok(())
    }
}

impl std::error::Error for StatusError {}

/// Errors related to establishing and tearing down connections and sessions.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Failed to establish connection to the server
    #[error("Failed to connect to {host}:{port}: {message}")]
    ConnectionFailed {
        host: String,
        port: u16,
        message: String,
    },

    /// Transport did not open in time
    #[error("Transport did not open within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Invalid connection parameters
    #[error("Invalid connection parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Connection URL parsing error
    #[error("Failed to parse connection URL: {0}")]
    ParseError(String),

    /// Connection is closed
    #[error("Connection is closed")]
    ConnectionClosed,

    /// The server does not understand the requested protocol version
    #[error("Protocol version {version} is not supported by the server: {message}")]
    ProtocolNotSupported { version: i32, message: String },

    /// Non-success status on a session call
    #[error("Session request failed: {0}")]
    Protocol(StatusError),

    /// Transport failure during a session call
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors related to operation submission, polling and fetching.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Non-success response status
    #[error("Request failed with status {0}")]
    Status(StatusError),

    /// The operation reached a terminal state other than finished
    #[error("Operation ended in state {state}: {}", message.as_deref().unwrap_or("no message"))]
    OperationFailed {
        state: OperationStateValue,
        sql_state: Option<String>,
        error_code: Option<i32>,
        message: Option<String>,
    },

    /// A submission response carried no operation handle
    #[error("Server response for {0} carried no operation handle")]
    MissingHandle(&'static str),

    /// The metadata response carried no schema
    #[error("Server returned no result set schema")]
    MissingSchema,

    /// Server info response carried no value
    #[error("Server returned no info value")]
    MissingInfoValue,

    /// Transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Result decoding failure
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// Operation state as reported by the server, including values this client
/// does not recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStateValue {
    /// A known protocol state
    Known(OperationState),
    /// A raw value outside the protocol enum
    Unrecognized(i32),
}

impl fmt::Display for OperationStateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationStateValue::Known(state) => write!(f, "{}", state),
            OperationStateValue::Unrecognized(raw) => write!(f, "UNRECOGNIZED({})", raw),
        }
    }
}

/// Errors related to decoding wire pages into typed values.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// No value kind is set on a wire column
    #[error("Column {column} carries no value kind")]
    MalformedColumn { column: usize },

    /// Page column count does not match the schema
    #[error("Schema has {expected} columns but the page has {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    /// Columns in one page disagree on the row count
    #[error("Column {column} has {actual} rows, expected {expected}")]
    RowCountMismatch {
        column: usize,
        expected: usize,
        actual: usize,
    },

    /// Decimal text could not be parsed
    #[error("Invalid decimal '{value}' at row {row}, column {column}")]
    InvalidDecimal {
        value: String,
        row: usize,
        column: usize,
    },

    /// A CHAR value was empty
    #[error("Empty CHAR value at row {row}, column {column}")]
    InvalidChar { row: usize, column: usize },

    /// Epoch milliseconds outside the representable range
    #[error("Temporal value {millis} out of range at row {row}, column {column}")]
    TemporalOutOfRange {
        millis: i64,
        row: usize,
        column: usize,
    },

    /// A decoded value does not fit the column's Arrow type
    #[error("Expected {expected} value at row {row}, column {column}")]
    UnexpectedValue {
        expected: &'static str,
        row: usize,
        column: usize,
    },

    /// Arrow error
    #[error("Arrow error: {0}")]
    ArrowError(String),
}

/// Errors related to the byte transport and the wire protocol.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Network I/O error
    #[error("Network I/O error: {0}")]
    IoError(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// HTTP server answered with a non-success status
    #[error("HTTP status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// SASL negotiation failed
    #[error("SASL negotiation failed: {0}")]
    SaslError(String),

    /// Server raised an application exception instead of replying
    #[error("Application exception ({kind}): {message}")]
    ApplicationException { kind: i32, message: String },

    /// Message decoding error
    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] DecodeError),

    /// Protocol error
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Transport has not been opened
    #[error("Transport is not open")]
    NotOpen,

    /// Transport has been closed
    #[error("Transport is closed")]
    Closed,

    /// An earlier call was abandoned before its reply was read
    #[error("Transport desynchronized: {method} was abandoned mid-call")]
    Desynchronized { method: &'static str },
}

impl TransportError {
    /// Message text for error classification.
    pub fn message(&self) -> String {
        match self {
            TransportError::ApplicationException { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

// Conversions from external error types
impl From<arrow::error::ArrowError> for ConversionError {
    fn from(err: arrow::error::ArrowError) -> Self {
        ConversionError::ArrowError(err.to_string())
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::HttpError(err.to_string())
    }
}

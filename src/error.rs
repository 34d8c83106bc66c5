//! # Error Types
//!
//! Custom error types for the INSEN client using `thiserror`.

use thiserror::Error;

/// Main error type for the INSEN client
#[derive(Debug, Error)]
pub enum InsenError {
    /// Serial port could not be found or opened
    #[error("Connection error: {0}")]
    Connection(String),

    /// Command issued outside of a connected session
    #[error("Device not connected")]
    NotConnected,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport accepted fewer bytes than the encoded command
    #[error("I/O error: short write ({written} of {expected} bytes)")]
    ShortWrite { written: usize, expected: usize },

    /// Response could not be decoded
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Polling rate of zero
    #[error("Invalid poll rate: {0} Hz")]
    InvalidPollRate(u32),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

/// Decode-time errors for INSEN response frames
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Response does not start with the `>>> ` marker
    #[error("Malformed frame: {0:?}")]
    MalformedFrame(String),

    /// Frame is not the record type that was expected
    #[error("Unexpected record type: {0:?}")]
    UnexpectedRecordType(String),

    /// A field failed numeric parsing
    #[error("Failed to parse field {index}: {value:?}")]
    FieldParse { index: usize, value: String },

    /// Peripheral reports the controller slot as empty
    #[error("Controller {0} disconnected")]
    ControllerDisconnected(u8),
}

/// Result type alias for the INSEN client
pub type Result<T> = std::result::Result<T, InsenError>;

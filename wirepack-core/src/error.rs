//! Error types shared by all wirepack crates

use thiserror::Error;

use crate::types::Type;

/// Result type alias for wirepack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for wirepack
#[derive(Error, Debug)]
pub enum Error {
    /// A typed read ran past the end of the buffer
    #[error("truncated packet: need {need} more bytes, {have} available")]
    Truncated { need: usize, have: usize },

    /// A write ran past the end of a pre-sized pack buffer
    #[error("pack buffer overflow: need {need} more bytes, {have} available")]
    Overflow { need: usize, have: usize },

    /// A decode failure, tagged with the layer that was being decoded
    #[error("could not decode {layer} layer: {source}")]
    Decode {
        layer: Type,
        #[source]
        source: Box<Error>,
    },

    /// An encode failure, tagged with the layer that was being packed
    #[error("could not pack {layer} layer: {source}")]
    Pack {
        layer: Type,
        #[source]
        source: Box<Error>,
    },

    /// Unsupported version nibble in an IP header
    #[error("unsupported {layer} version: {version}")]
    BadVersion { layer: Type, version: u8 },

    /// Malformed field contents (bad option length, bad address length, ...)
    #[error("malformed {layer} field: {reason}")]
    Malformed { layer: Type, reason: String },

    /// Filter program failed validation or could not be built
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Outermost layer type does not match the source's link type
    #[error("expected link type {expected}, got {actual}")]
    LinkTypeMismatch { expected: Type, actual: Type },

    /// Dump file has a bad magic or a short header
    #[error("invalid dump file: {0}")]
    InvalidDump(String),

    /// Network or file I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No answer arrived before the send/receive deadline
    #[error("timeout waiting for answer")]
    Timeout,

    /// Configuration change attempted after the source was activated
    #[error("handle already active")]
    AlreadyActive,

    /// Operation not supported by this packet source
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    /// Layer composition error (empty chain, payload refused, ...)
    #[error("composition error: {0}")]
    Compose(String),
}

impl Error {
    /// Wrap a decode failure with the layer type it originated from.
    pub fn decode(layer: Type, source: Error) -> Self {
        Error::Decode {
            layer,
            source: Box::new(source),
        }
    }

    /// Wrap an encode failure with the layer type it originated from.
    pub fn pack(layer: Type, source: Error) -> Self {
        Error::Pack {
            layer,
            source: Box::new(source),
        }
    }

    /// Create a malformed-field error for the given layer.
    pub fn malformed<S: Into<String>>(layer: Type, reason: S) -> Self {
        Error::Malformed {
            layer,
            reason: reason.into(),
        }
    }
}

//! # Error Types
//!
//! Errors shared by the bus, the runtime and hosted modules.

use thiserror::Error;

/// Errors from encoding or decoding a message envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Fewer bytes than the smallest possible envelope.
    #[error("Envelope too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    /// The first two bytes are not the envelope magic.
    #[error("Bad envelope header: {found:02X?}")]
    BadHeader { found: [u8; 2] },

    /// The size field disagrees with the actual byte count.
    #[error("Envelope size mismatch: header says {declared}, got {actual}")]
    SizeMismatch { declared: u32, actual: usize },

    /// The property count field is negative.
    #[error("Invalid property count: {0}")]
    InvalidPropertyCount(i32),

    /// The envelope ended in the middle of a field.
    #[error("Envelope truncated while reading {field}")]
    Truncated { field: &'static str },

    /// A property key or value is not valid UTF-8.
    #[error("Property {field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },

    /// The same property key appears twice.
    #[error("Duplicate property key: {0}")]
    DuplicateProperty(String),

    /// Bytes remain after the content.
    #[error("{0} trailing bytes after envelope content")]
    TrailingBytes(usize),

    /// A property key or value contains a NUL byte and cannot be framed.
    #[error("Property {field} contains an embedded NUL: {value:?}")]
    EmbeddedNul { field: &'static str, value: String },

    /// The message does not fit in the 32-bit size fields.
    #[error("Message too large to encode: {0} bytes")]
    TooLarge(usize),
}

/// Errors raised while creating or running a module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    /// The module's configuration string was rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The module could not be created.
    #[error("Create failed: {0}")]
    CreateFailed(String),

    /// An I/O operation inside the module failed.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ModuleError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

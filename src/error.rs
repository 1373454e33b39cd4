//! Error types for the enumcrypt library.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the enumcrypt library.
///
/// End-of-stream and final-block conditions are deliberately *not* here:
/// they are ordinary outcomes (`Option::None`, [`crate::io::BlockRead::Final`])
/// so callers cannot mistake termination for failure.
#[derive(Debug, Error)]
pub enum EnumcryptError {
    /// Underlying file I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A read-mode open was attempted on a path that does not exist.
    #[error("file '{}' does not exist", .0.display())]
    FileNotFound(PathBuf),

    /// A write was attempted on a read handle, or a read on a write handle.
    #[error("requested operation is not allowed in this file mode")]
    IncorrectMode,

    /// The input stream ended in the middle of a field or block.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// The key must be at least one byte long.
    #[error("key must be at least 1 byte long")]
    KeyEmpty,

    /// Block size exponent outside the supported range.
    #[error("sigma must be in range [1; 16], got {0}")]
    InvalidSigma(u32),

    /// The splitter was given a message too short to carry a context window.
    #[error("message of {length} bytes cannot be split with mu = {mu}")]
    MessageTooShort {
        /// Message length in bytes.
        length: usize,
        /// Requested context window size.
        mu: usize,
    },

    /// A message source exceeds the wire format's 32-bit length field.
    #[error("message source exceeds the wire format's 32-bit length field")]
    MessageTooLong,

    /// The ciphertext violates an invariant of the wire format.
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(&'static str),
}

/// A specialized Result type for enumcrypt operations.
pub type Result<T> = std::result::Result<T, EnumcryptError>;

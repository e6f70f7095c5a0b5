//! Error types for ROOT file reading and histogram arithmetic.

use thiserror::Error;

/// Errors produced by `exo-root`.
#[derive(Error, Debug)]
pub enum RootError {
    /// I/O error while opening or mapping a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the `root` magic bytes.
    #[error("not a ROOT file (bad magic)")]
    BadMagic,

    /// Attempted to read past the end of a buffer.
    #[error("buffer underflow at offset {offset}: need {need} bytes, have {have}")]
    BufferUnderflow {
        /// Read position.
        offset: usize,
        /// Requested byte count.
        need: usize,
        /// Bytes left in the buffer.
        have: usize,
    },

    /// A compressed block could not be decoded.
    #[error("decompression error: {0}")]
    Decompression(String),

    /// A streamed object did not match the expected layout.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// No key with the requested name or path.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The object class is not a supported histogram.
    #[error("unsupported class: {0}")]
    UnsupportedClass(String),

    /// Two histograms cannot be combined bin by bin.
    #[error("incompatible histograms '{left}' and '{right}': {reason}")]
    Incompatible {
        /// Left-hand histogram name.
        left: String,
        /// Right-hand histogram name.
        right: String,
        /// What differs.
        reason: String,
    },

    /// Invalid histogram operation argument.
    #[error("invalid histogram operation: {0}")]
    InvalidOperation(String),
}

/// Result alias for `exo-root`.
pub type Result<T> = std::result::Result<T, RootError>;

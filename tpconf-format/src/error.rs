//! Error types for the configuration backup format

use thiserror::Error;

/// tpconf error types
#[derive(Debug, Error)]
pub enum TpconfError {
    /// Encrypted input length is not a multiple of the DES block size.
    #[error("Invalid config size {0}: must be a multiple of 8")]
    InvalidSize(usize),
    /// Neither byte order yields a plausible size header.
    #[error("Config size is too large (big-endian {big_endian:#x}, little-endian {little_endian:#x})")]
    SizeTooLarge {
        /// Size field read as big-endian.
        big_endian: u32,
        /// Size field read as little-endian.
        little_endian: u32,
    },
    /// No known format variant matched the decrypted buffer.
    #[error("Unrecognised config format")]
    UnrecognisedFormat,
    /// An unknown format name was supplied.
    #[error("Unknown config format name: {0}")]
    UnknownFormatName(String),
    /// MD5 digest verification failed.
    #[error("MD5 hash check failed: stored {stored}, computed {computed}")]
    IntegrityMismatch {
        /// Digest stored in the buffer (hex).
        stored: String,
        /// Digest computed over the full covered region (hex).
        computed: String,
    },
    /// Re-decoding freshly encoded output did not reproduce the document.
    #[error("Exported {0} does not match the source document")]
    RoundTripMismatch(&'static str),
    /// Decrypted output is unusable.
    #[error("Decryption failure: {0}")]
    DecryptionFailure(String),
    /// Encountered unexpected end of input.
    #[error("Unexpected end of stream: needed {needed} bytes, {available} available")]
    UnexpectedEof {
        /// Bytes required by the pending read.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },
    /// Compressed stream content is inconsistent.
    #[error("Corrupt compressed stream: {0}")]
    CorruptStream(String),
    /// A length field points outside the buffer.
    #[error("Length field at offset {offset} is {length}, buffer holds {available} bytes")]
    FieldOutOfBounds {
        /// Offset of the length field.
        offset: usize,
        /// Value of the length field.
        length: usize,
        /// Buffer length.
        available: usize,
    },
    /// A configured allocation limit was exceeded.
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, TpconfError>;

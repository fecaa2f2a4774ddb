//! tpconf Codec - Encoder/decoder engines
//!
//! This crate provides the engines that turn router configuration backups into
//! text and back:
//!
//! - Bit-dictionary LZ compression
//! - The format registry (detection, byte order, extraction per layout)
//! - The `config.bin` encoder/decoder with its round-trip self-check
//! - Document views exchanged with editors

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod document;
pub mod lz;
pub mod registry;

// Re-export commonly used types
pub use tpconf_format::{CipherFrame, ConfigFormat, Endianness, Limits, Result, TpconfError};

// Re-export our own types
pub use config::{CodecOptions, ConfigCodec, Inspection};
pub use document::{Document, DocumentView, ExportRequest};
pub use registry::FormatDescriptor;

/// Decode a backup with the embedded key and default options
pub fn decode(raw: &[u8]) -> Result<Document> {
    ConfigCodec::default().decode(raw)
}

/// Encode text with the embedded key and default options
pub fn encode(xml: &str, endianness: Endianness) -> Result<Vec<u8>> {
    ConfigCodec::default().encode(xml, endianness)
}

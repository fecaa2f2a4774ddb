//! tpconf Format - Core primitives for router configuration backups
//!
//! This crate provides the building blocks of the `config.bin` backup format
//! with no I/O dependencies. It includes:
//!
//! - The embedded DES key, markup signatures and probe offsets
//! - DES-ECB framing (no padding, no IV)
//! - MD5 integrity checks, including the trailing-length probe
//! - Byte order inference from compressed-stream size headers
//! - Format variant tags and their detection probes
//! - The `dict_ld` variable-length code and control-bit windows
//! - Error types
//! - Allocation limits

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod bitpack;
pub mod checksum;
pub mod cipher;
pub mod constants;
pub mod dictcode;
pub mod endian;
pub mod error;
pub mod limits;
pub mod variant;

// Re-export commonly used types
pub use bitpack::{ControlReader, ControlWriter};
pub use cipher::CipherFrame;
pub use endian::Endianness;
pub use error::{Result, TpconfError};
pub use limits::Limits;
pub use variant::ConfigFormat;

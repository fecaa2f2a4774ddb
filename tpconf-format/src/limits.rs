//! Allocation limits

use serde::{Deserialize, Serialize};

use crate::constants::SIZE_PLAUSIBILITY_LIMIT;

/// Limits applied before sizing buffers from untrusted header fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum normalized payload accepted by the encoder (default: 128 KiB)
    pub max_config_size: usize,
    /// Maximum declared decompressed length (default: 16 MiB)
    pub max_decompressed_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_config_size: SIZE_PLAUSIBILITY_LIMIT as usize,
            max_decompressed_len: 16 * 1024 * 1024,
        }
    }
}

impl Limits {
    /// Check a declared decompressed length
    pub fn check_decompressed_len(&self, len: usize) -> crate::Result<()> {
        if len > self.max_decompressed_len {
            return Err(crate::TpconfError::LimitExceeded(format!(
                "declared decompressed length {} exceeds {}",
                len, self.max_decompressed_len
            )));
        }
        Ok(())
    }
}

//! Backup format variants
//!
//! No variant carries a magic number. Each firmware generation prepended more
//! header fields while keeping the markup start recognizable, so variants are
//! told apart by the offset at which the signature appears. Some probes read
//! bytes that other layouts also populate; [`ConfigFormat::PRIORITY`] is the
//! order that keeps them apart.

use serde::{Deserialize, Serialize};

use crate::constants::{COMPRESSED_XML_SIGNATURE, DIGEST_LEN, XML_SIGNATURE};
use crate::error::{Result, TpconfError};

/// Known on-disk layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigFormat {
    /// Digest followed by plain XML
    Uncompressed,
    /// Digest followed by a compressed stream; also the layout the encoder writes
    W9970,
    /// Compressed stream whose decompressed form is digest + XML
    #[serde(rename = "W9980/W8980")]
    W9980,
    /// Digest, 16-bit covered length, then a compressed stream
    #[serde(rename = "AC1350")]
    Ac1350,
}

impl ConfigFormat {
    /// Detection order; the first matching probe wins
    pub const PRIORITY: [ConfigFormat; 4] = [
        ConfigFormat::Uncompressed,
        ConfigFormat::W9970,
        ConfigFormat::W9980,
        ConfigFormat::Ac1350,
    ];

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            ConfigFormat::Uncompressed => "Uncompressed",
            ConfigFormat::W9970 => "W9970",
            ConfigFormat::W9980 => "W9980/W8980",
            ConfigFormat::Ac1350 => "AC1350",
        }
    }

    /// Parse a display name (case-insensitive)
    pub fn from_name(name: &str) -> Result<Self> {
        Self::PRIORITY
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| TpconfError::UnknownFormatName(name.to_string()))
    }

    /// Offset of the markup signature in the decrypted buffer
    pub fn signature_offset(self) -> usize {
        match self {
            ConfigFormat::Uncompressed => DIGEST_LEN,
            ConfigFormat::W9970 => 20,
            ConfigFormat::W9980 => 22,
            ConfigFormat::Ac1350 => 24,
        }
    }

    /// Markup signature bytes probed at [`Self::signature_offset`]
    pub fn signature(self) -> &'static [u8] {
        match self {
            ConfigFormat::Uncompressed => XML_SIGNATURE,
            _ => COMPRESSED_XML_SIGNATURE,
        }
    }

    /// Offset of the compressed-stream size header, if the layout has one
    pub fn size_field_offset(self) -> Option<usize> {
        match self {
            ConfigFormat::Uncompressed => None,
            ConfigFormat::W9970 => Some(DIGEST_LEN),
            ConfigFormat::W9980 | ConfigFormat::Ac1350 => Some(0),
        }
    }

    /// Whether the decrypted buffer carries this variant's signature
    pub fn matches(self, bytes: &[u8]) -> bool {
        let start = self.signature_offset();
        let signature = self.signature();
        bytes.get(start..start + signature.len()) == Some(signature)
    }

    /// First variant in priority order whose probe matches
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        Self::PRIORITY
            .into_iter()
            .find(|format| format.matches(bytes))
    }
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

//! Format registry
//!
//! One descriptor per known layout, scanned in [`ConfigFormat::PRIORITY`]
//! order. Each descriptor pairs the variant's signature probe with the routine
//! that verifies and unpacks its payload.

use smallvec::SmallVec;
use tracing::debug;

use tpconf_format::checksum::{verify, verify_ac1350};
use tpconf_format::constants::DIGEST_LEN;
use tpconf_format::{ConfigFormat, Endianness, Limits, Result, TpconfError};

use crate::lz::{decompress, decompress_counted};

/// Bytes a well-formed stream may leave unread: the control word reserved
/// after its seed literal.
const RESERVED_CONTROL_WORD_LEN: usize = 2;

/// Verifies and unpacks a decrypted buffer into the raw XML payload
pub type Extractor = fn(&[u8], Endianness, &Limits, StreamEnd) -> Result<Vec<u8>>;

/// How strictly a W9970 stream must line up with the bytes its digest covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// Anything after the final token is ignored
    Loose,
    /// The final token must end where the digest coverage ends
    Exact,
}

/// A format variant with its extraction routine
#[derive(Debug, Clone, Copy)]
pub struct FormatDescriptor {
    /// Variant handled by this descriptor
    pub format: ConfigFormat,
    extractor: Extractor,
}

/// Known layouts in detection order
pub const REGISTRY: [FormatDescriptor; 4] = [
    FormatDescriptor {
        format: ConfigFormat::Uncompressed,
        extractor: extract_uncompressed,
    },
    FormatDescriptor {
        format: ConfigFormat::W9970,
        extractor: extract_w9970,
    },
    FormatDescriptor {
        format: ConfigFormat::W9980,
        extractor: extract_w9980,
    },
    FormatDescriptor {
        format: ConfigFormat::Ac1350,
        extractor: extract_ac1350,
    },
];

impl FormatDescriptor {
    /// Descriptor for a variant
    pub fn of(format: ConfigFormat) -> &'static FormatDescriptor {
        match format {
            ConfigFormat::Uncompressed => &REGISTRY[0],
            ConfigFormat::W9970 => &REGISTRY[1],
            ConfigFormat::W9980 => &REGISTRY[2],
            ConfigFormat::Ac1350 => &REGISTRY[3],
        }
    }

    /// Whether the signature probe matches
    pub fn matches(&self, bytes: &[u8]) -> bool {
        self.format.matches(bytes)
    }

    /// Infer byte order from this layout's size header.
    ///
    /// The uncompressed layout has no multi-byte fields and reports little-endian.
    pub fn infer_endianness(&self, bytes: &[u8]) -> Result<Endianness> {
        Ok(self.endianness_candidates(bytes)?[0])
    }

    /// Byte orders under which this layout's size header is plausible, preferred first
    pub fn endianness_candidates(&self, bytes: &[u8]) -> Result<SmallVec<[Endianness; 2]>> {
        let Some(offset) = self.format.size_field_offset() else {
            return Ok(SmallVec::from_elem(Endianness::Little, 1));
        };
        let field = bytes.get(offset..).ok_or(TpconfError::UnexpectedEof {
            needed: offset,
            available: bytes.len(),
        })?;
        Endianness::plausible_orders(field)
    }

    /// Verify and unpack the payload
    pub fn extract(
        &self,
        bytes: &[u8],
        endianness: Endianness,
        limits: &Limits,
    ) -> Result<Vec<u8>> {
        (self.extractor)(bytes, endianness, limits, StreamEnd::Loose)
    }

    /// Infer the byte order and unpack the payload.
    ///
    /// When the size header is plausible both ways round, each order is tried
    /// in preference order and the first one that unpacks cleanly wins.
    pub fn unpack(&self, bytes: &[u8], limits: &Limits) -> Result<(Endianness, Vec<u8>)> {
        let candidates = self.endianness_candidates(bytes)?;
        let preferred = candidates[0];
        if candidates.len() == 1 {
            let payload = self.extract(bytes, preferred, limits)?;
            return Ok((preferred, payload));
        }

        for &endianness in &candidates {
            match (self.extractor)(bytes, endianness, limits, StreamEnd::Exact) {
                Ok(payload) => {
                    debug!(%endianness, "size header is ambiguous; payload unpacked");
                    return Ok((endianness, payload));
                }
                Err(err) => {
                    debug!(%endianness, error = %err, "size header is ambiguous; order rejected");
                }
            }
        }

        let payload = self.extract(bytes, preferred, limits)?;
        Ok((preferred, payload))
    }
}

/// Select the layout of a decrypted buffer.
///
/// Signature probes are tried first, in priority order. The encoder always
/// writes the W9970 layout, but its output only carries the W9970 signature
/// when the document starts with `<?xml` and opens with sixteen literals, so a
/// buffer no probe recognizes is still accepted as W9970 when its digest
/// verifies.
pub fn detect(bytes: &[u8]) -> Result<&'static FormatDescriptor> {
    if let Some(descriptor) = REGISTRY.iter().find(|descriptor| descriptor.matches(bytes)) {
        debug!(format = %descriptor.format, "signature probe matched");
        return Ok(descriptor);
    }

    if verify(bytes).is_ok() {
        debug!("no signature probe matched; digest confirms the W9970 layout");
        return Ok(FormatDescriptor::of(ConfigFormat::W9970));
    }

    Err(TpconfError::UnrecognisedFormat)
}

fn extract_uncompressed(bytes: &[u8], _: Endianness, _: &Limits, _: StreamEnd) -> Result<Vec<u8>> {
    verify(bytes)?;
    Ok(bytes[DIGEST_LEN..].to_vec())
}

fn extract_w9970(
    bytes: &[u8],
    endianness: Endianness,
    limits: &Limits,
    end: StreamEnd,
) -> Result<Vec<u8>> {
    let trim = verify(bytes)?;
    if end == StreamEnd::Loose {
        return decompress(&bytes[DIGEST_LEN..], endianness, limits);
    }

    let covered = bytes.len() - trim - DIGEST_LEN;
    let (payload, consumed) = decompress_counted(&bytes[DIGEST_LEN..], endianness, limits)?;
    if consumed > covered || covered - consumed > RESERVED_CONTROL_WORD_LEN {
        return Err(TpconfError::CorruptStream(format!(
            "stream ends after {} bytes but the digest covers {}",
            consumed, covered
        )));
    }
    Ok(payload)
}

// The digest lives inside the compressed stream, so it is checked after decompression.
fn extract_w9980(
    bytes: &[u8],
    endianness: Endianness,
    limits: &Limits,
    _: StreamEnd,
) -> Result<Vec<u8>> {
    let mut plain = decompress(bytes, endianness, limits)?;
    verify(&plain)?;
    plain.drain(..DIGEST_LEN);
    Ok(plain)
}

fn extract_ac1350(
    bytes: &[u8],
    endianness: Endianness,
    limits: &Limits,
    _: StreamEnd,
) -> Result<Vec<u8>> {
    verify_ac1350(bytes, endianness)?;
    decompress(bytes, endianness, limits)
}

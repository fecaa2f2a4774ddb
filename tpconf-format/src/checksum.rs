//! MD5 integrity checks
//!
//! Backups store an MD5 digest in their first [`DIGEST_LEN`] bytes. The
//! standard layouts do not record how much DES padding follows the covered
//! region, so [`verify`] shrinks the region by up to seven trailing bytes until
//! the digest matches. AC1350 backups record the covered length explicitly.

use tracing::{debug, trace};

use crate::constants::{AC1350_LENGTH_OFFSET, AC1350_REGION_START, DIGEST_LEN, PADDING_TRIALS};
use crate::endian::Endianness;
use crate::error::{Result, TpconfError};

/// Compute the MD5 digest of data
pub fn compute_md5(data: &[u8]) -> [u8; DIGEST_LEN] {
    md5::compute(data).0
}

/// Verify the digest prefix over `bytes[16..len - i]` for the first matching `i` in `0..8`.
///
/// Returns the number of trailing bytes that had to be excluded.
pub fn verify(bytes: &[u8]) -> Result<usize> {
    let stored = stored_digest(bytes)?;

    for trim in 0..PADDING_TRIALS {
        let end = bytes.len() - trim;
        if end < DIGEST_LEN {
            break;
        }
        if compute_md5(&bytes[DIGEST_LEN..end]) == *stored {
            debug!(trim, "digest verified");
            return Ok(trim);
        }
        trace!(trim, "digest candidate rejected");
    }

    Err(mismatch(stored, &compute_md5(&bytes[DIGEST_LEN..])))
}

/// Verify an AC1350 backup: the digest covers `bytes[20..length]` where `length`
/// is the 16-bit field at offset 16.
///
/// A length beyond the buffer fails closed rather than reading past the end.
pub fn verify_ac1350(bytes: &[u8], endianness: Endianness) -> Result<()> {
    let stored = stored_digest(bytes)?;
    let length = endianness.read_u16_at(bytes, AC1350_LENGTH_OFFSET)? as usize;
    if length > bytes.len() {
        return Err(TpconfError::FieldOutOfBounds {
            offset: AC1350_LENGTH_OFFSET,
            length,
            available: bytes.len(),
        });
    }

    let region = bytes.get(AC1350_REGION_START..length).unwrap_or(&[]);
    let computed = compute_md5(region);
    if computed != *stored {
        return Err(mismatch(stored, &computed));
    }
    debug!(length, "AC1350 digest verified");
    Ok(())
}

/// Prepend the digest of `payload` to it
pub fn prepend_digest(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(DIGEST_LEN + payload.len());
    out.extend_from_slice(&compute_md5(payload));
    out.extend_from_slice(payload);
    out
}

fn stored_digest(bytes: &[u8]) -> Result<&[u8; DIGEST_LEN]> {
    bytes
        .get(..DIGEST_LEN)
        .and_then(|digest| digest.try_into().ok())
        .ok_or(TpconfError::UnexpectedEof {
            needed: DIGEST_LEN,
            available: bytes.len(),
        })
}

fn mismatch(stored: &[u8], computed: &[u8]) -> TpconfError {
    TpconfError::IntegrityMismatch {
        stored: hex::encode(stored),
        computed: hex::encode(computed),
    }
}

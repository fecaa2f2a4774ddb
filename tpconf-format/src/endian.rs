//! Byte order handling and inference
//!
//! Backups carry no byte order marker. The order is inferred once per decode
//! from a compressed-stream size header: configurations are always well under
//! [`SIZE_PLAUSIBILITY_LIMIT`] bytes, so usually only one interpretation of
//! the header is plausible.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::trace;

use crate::constants::{SIZE_HEADER_LEN, SIZE_PLAUSIBILITY_LIMIT};
use crate::error::{Result, TpconfError};

/// Multi-byte integer order used throughout one backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    /// Most significant byte first
    Big,
    /// Least significant byte first
    Little,
}

impl Endianness {
    /// Map the collaborator's `littleEndian` flag
    pub fn from_little_endian(little_endian: bool) -> Self {
        if little_endian {
            Endianness::Little
        } else {
            Endianness::Big
        }
    }

    /// Whether this is little-endian
    pub fn is_little(self) -> bool {
        self == Endianness::Little
    }

    /// Infer the byte order from a 32-bit size header at the start of `size_field`.
    ///
    /// The big-endian reading wins unless it exceeds the plausibility limit, in
    /// which case the little-endian reading must be plausible instead.
    pub fn infer(size_field: &[u8]) -> Result<Self> {
        Ok(Endianness::plausible_orders(size_field)?[0])
    }

    /// Every byte order under which the size header is plausible, preferred first.
    ///
    /// Some headers read as a plausible size both ways round (a little-endian
    /// `0x100` is a big-endian `0x10000`). Both orders are returned then, and the
    /// caller confirms one by unpacking the payload.
    pub fn plausible_orders(size_field: &[u8]) -> Result<SmallVec<[Self; 2]>> {
        let big_endian = Endianness::Big.read_u32_at(size_field, 0)?;
        let little_endian = Endianness::Little.read_u32_at(size_field, 0)?;

        let mut orders = SmallVec::new();
        if big_endian <= SIZE_PLAUSIBILITY_LIMIT {
            trace!(size = big_endian, "size header is plausible as big-endian");
            orders.push(Endianness::Big);
        }
        if little_endian <= SIZE_PLAUSIBILITY_LIMIT {
            trace!(size = little_endian, "size header is plausible as little-endian");
            orders.push(Endianness::Little);
        }
        if orders.is_empty() {
            return Err(TpconfError::SizeTooLarge {
                big_endian,
                little_endian,
            });
        }
        Ok(orders)
    }

    /// Read a u16 at `offset`
    pub fn read_u16_at(self, bytes: &[u8], offset: usize) -> Result<u16> {
        let field = field(bytes, offset, 2)?;
        Ok(match self {
            Endianness::Big => BigEndian::read_u16(field),
            Endianness::Little => LittleEndian::read_u16(field),
        })
    }

    /// Read a u32 at `offset`
    pub fn read_u32_at(self, bytes: &[u8], offset: usize) -> Result<u32> {
        let field = field(bytes, offset, SIZE_HEADER_LEN)?;
        Ok(match self {
            Endianness::Big => BigEndian::read_u32(field),
            Endianness::Little => LittleEndian::read_u32(field),
        })
    }

    /// Encode a u16 in this order
    pub fn u16_bytes(self, value: u16) -> [u8; 2] {
        let mut buf = [0u8; 2];
        match self {
            Endianness::Big => BigEndian::write_u16(&mut buf, value),
            Endianness::Little => LittleEndian::write_u16(&mut buf, value),
        }
        buf
    }

    /// Encode a u32 in this order
    pub fn u32_bytes(self, value: u32) -> [u8; 4] {
        let mut buf = [0u8; 4];
        match self {
            Endianness::Big => BigEndian::write_u32(&mut buf, value),
            Endianness::Little => LittleEndian::write_u32(&mut buf, value),
        }
        buf
    }
}

impl std::fmt::Display for Endianness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Endianness::Big => "big-endian",
            Endianness::Little => "little-endian",
        })
    }
}

fn field(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    bytes
        .get(offset..offset + len)
        .ok_or(TpconfError::UnexpectedEof {
            needed: offset + len,
            available: bytes.len(),
        })
}

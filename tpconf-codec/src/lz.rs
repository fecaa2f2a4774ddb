//! Bit-dictionary compression
//!
//! An LZ77 variant used by the router firmware. A stream is a 32-bit
//! decompressed size, one seed literal, then tokens selected by control bits:
//!
//! - `0`: one literal byte follows
//! - `1`: a match; `dict_ld(length - 2)`, `dict_ld((distance >> 8) + 2)`, then
//!   the low byte of `distance`, where the copy starts `distance + 1` bytes
//!   behind the write cursor
//!
//! Matches may overlap the bytes they produce, so copies run one byte at a time.
//! The match finder keeps a single slot per 13-bit hash; later positions
//! overwrite earlier ones. That choice determines which matches are found and
//! therefore the exact bytes produced, so it must not be strengthened.

use tracing::debug;

use tpconf_format::constants::{
    HASH_BITS, HASH_MULTIPLIER, LITERAL_TAIL_LEN, MIN_MATCH_LEN, SIZE_HEADER_LEN,
};
use tpconf_format::{ControlReader, ControlWriter, Endianness, Limits, Result, TpconfError};

const HASH_MASK: u32 = (1 << HASH_BITS) - 1;

/// Compress `src` into a size-prefixed stream.
///
/// `allow_overlap_insert` hashes only the first position of each match and
/// skips the rest of the matched run; the firmware's own encoder leaves it off.
pub fn compress(
    src: &[u8],
    endianness: Endianness,
    allow_overlap_insert: bool,
) -> Result<Vec<u8>> {
    let size = u32::try_from(src.len()).map_err(|_| {
        TpconfError::LimitExceeded(format!("{} bytes do not fit a 32-bit size header", src.len()))
    })?;
    let header = endianness.u32_bytes(size);

    let Some(&seed) = src.first() else {
        return Ok(header.to_vec());
    };

    let mut prefix = Vec::with_capacity(src.len() + src.len() / 8 + 16);
    prefix.extend_from_slice(&header);
    prefix.push(seed);

    let compressor = Compressor {
        src,
        writer: ControlWriter::new(prefix, endianness),
        table: vec![None; 1 << HASH_BITS],
        cursor: 1,
        hashed: 0,
        allow_overlap_insert,
        matches: 0,
    };
    Ok(compressor.run())
}

/// Decompress a size-prefixed stream.
///
/// Trailing bytes after the final token are ignored, which lets callers pass
/// streams that still carry block padding.
pub fn decompress(src: &[u8], endianness: Endianness, limits: &Limits) -> Result<Vec<u8>> {
    decompress_counted(src, endianness, limits).map(|(dst, _)| dst)
}

/// Decompress a size-prefixed stream, also returning how many bytes of `src`
/// the tokens occupied.
///
/// The count stops at the last byte read. A stream whose seed literal is its
/// only content leaves its reserved control word unread.
pub fn decompress_counted(
    src: &[u8],
    endianness: Endianness,
    limits: &Limits,
) -> Result<(Vec<u8>, usize)> {
    let size = endianness.read_u32_at(src, 0)? as usize;
    limits.check_decompressed_len(size)?;

    let mut dst = Vec::with_capacity(size);
    if size == 0 {
        return Ok((dst, SIZE_HEADER_LEN));
    }

    let mut reader = ControlReader::new(src, SIZE_HEADER_LEN, endianness);
    dst.push(reader.read_byte()?);

    while dst.len() < size {
        if !reader.read_bit()? {
            dst.push(reader.read_byte()?);
            continue;
        }

        let length = reader.read_dict_code()? as u64 + 2;
        let high = reader.read_dict_code()? as u64 - 2;
        let low = reader.read_byte()? as u64;
        let back = (high << 8) + low + 1;
        if back > dst.len() as u64 {
            return Err(TpconfError::CorruptStream(format!(
                "match reaches {} bytes back from output offset {}",
                back,
                dst.len()
            )));
        }

        // Copies that run past the declared size are cut off there.
        let mut from = dst.len() - back as usize;
        for _ in 0..length {
            if dst.len() == size {
                break;
            }
            dst.push(dst[from]);
            from += 1;
        }
    }

    let consumed = reader.position();
    debug!(
        compressed = consumed,
        decompressed = dst.len(),
        "decompressed stream"
    );
    Ok((dst, consumed))
}

/// Encoder state for one call
struct Compressor<'a> {
    src: &'a [u8],
    writer: ControlWriter,
    table: Vec<Option<usize>>,
    /// Next source byte to encode
    cursor: usize,
    /// Next source position to insert into the hash table
    hashed: usize,
    allow_overlap_insert: bool,
    matches: usize,
}

struct Match {
    distance: usize,
    length: usize,
}

impl Compressor<'_> {
    fn run(mut self) -> Vec<u8> {
        let size = self.src.len();

        while size - self.cursor > LITERAL_TAIL_LEN {
            self.insert_pending();
            match self.find_match() {
                Some(found) => self.emit_match(found),
                None => self.emit_literal(),
            }
        }
        while self.cursor < size {
            self.emit_literal();
        }

        let matches = self.matches;
        let out = self.writer.finish();
        debug!(
            decompressed = size,
            compressed = out.len(),
            matches,
            "compressed stream"
        );
        out
    }

    fn insert_pending(&mut self) {
        while self.hashed < self.cursor {
            self.insert(self.hashed);
            self.hashed += 1;
        }
    }

    fn insert(&mut self, pos: usize) {
        let slot = hash_at(self.src, pos);
        self.table[slot] = Some(pos);
    }

    fn find_match(&self) -> Option<Match> {
        // A slot holding offset 0 reads as empty.
        let candidate = match self.table[hash_at(self.src, self.cursor)] {
            Some(pos) if pos != 0 => pos,
            _ => return None,
        };

        let remaining = self.src.len() - self.cursor;
        let mut length = 0;
        while self.src[candidate + length] == self.src[self.cursor + length] {
            length += 1;
            if length == remaining {
                break;
            }
        }

        if length >= MIN_MATCH_LEN || length == remaining {
            Some(Match {
                distance: self.cursor - candidate - 1,
                length,
            })
        } else {
            None
        }
    }

    fn emit_match(&mut self, found: Match) {
        self.writer.push_bit(true);
        self.writer.push_dict_code((found.length - 2) as u32);
        self.writer.push_dict_code(((found.distance >> 8) + 2) as u32);
        self.writer.push_byte(found.distance as u8);
        self.cursor += found.length;
        self.matches += 1;

        if self.allow_overlap_insert {
            self.insert(self.hashed);
            self.hashed += found.length;
        }
    }

    fn emit_literal(&mut self) {
        self.writer.push_bit(false);
        self.writer.push_byte(self.src[self.cursor]);
        self.cursor += 1;
    }
}

/// Hash of the four bytes starting at `pos`
fn hash_at(src: &[u8], pos: usize) -> usize {
    let head = src[pos..pos + 3].iter().fold(0u32, |hash, &byte| {
        hash.wrapping_add(byte as u32).wrapping_mul(HASH_MULTIPLIER)
    });
    (head.wrapping_add(src[pos + 3] as u32) & HASH_MASK) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8], endianness: Endianness) -> Vec<u8> {
        let compressed = compress(data, endianness, false).unwrap();
        decompress(&compressed, endianness, &Limits::default()).unwrap()
    }

    #[test]
    fn test_single_byte_layout() {
        let compressed = compress(&[0x41], Endianness::Big, false).unwrap();
        assert_eq!(compressed, vec![0, 0, 0, 1, 0x41, 0, 0]);
        assert_eq!(roundtrip(&[0x41], Endianness::Big), vec![0x41]);
    }

    #[test]
    fn test_size_header_byte_order() {
        let little = compress(b"abc", Endianness::Little, false).unwrap();
        assert_eq!(&little[..4], &[3, 0, 0, 0]);
        let big = compress(b"abc", Endianness::Big, false).unwrap();
        assert_eq!(&big[..4], &[0, 0, 0, 3]);
    }

    #[test]
    fn test_literal_only_layout() {
        // Too short for matches: seed, control word, then literals.
        let compressed = compress(b"<?xml", Endianness::Big, false).unwrap();
        assert_eq!(compressed, b"\0\0\0\x05<\0\0?xml".to_vec());
    }

    #[test]
    fn test_empty_input() {
        let compressed = compress(&[], Endianness::Little, false).unwrap();
        assert_eq!(compressed, vec![0, 0, 0, 0]);
        assert!(decompress(&compressed, Endianness::Little, &Limits::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_repetitive_input_shrinks() {
        let data = b"<node value=\"1\"/>".repeat(64);
        for endianness in [Endianness::Big, Endianness::Little] {
            let compressed = compress(&data, endianness, false).unwrap();
            assert!(compressed.len() < data.len() / 4);
            assert_eq!(roundtrip(&data, endianness), data);
        }
    }

    #[test]
    fn test_overlap_insert_roundtrips() {
        let data = b"abcabcabcabcXabcabcabcabcYabcabc".repeat(8);
        let compressed = compress(&data, Endianness::Big, true).unwrap();
        let restored = decompress(&compressed, Endianness::Big, &Limits::default()).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn test_self_referential_match() {
        // seed 'A', then one match of length 8 at distance 0 (one byte back).
        let mut writer = ControlWriter::new(
            {
                let mut prefix = Endianness::Big.u32_bytes(9).to_vec();
                prefix.push(b'A');
                prefix
            },
            Endianness::Big,
        );
        writer.push_bit(true);
        writer.push_dict_code(8 - 2);
        writer.push_dict_code(2);
        writer.push_byte(0);
        let stream = writer.finish();

        let restored = decompress(&stream, Endianness::Big, &Limits::default()).unwrap();
        assert_eq!(restored, b"AAAAAAAAA");
    }

    #[test]
    fn test_runs_compress_to_self_referential_matches() {
        let data = vec![b'A'; 300];
        let compressed = compress(&data, Endianness::Little, false).unwrap();
        assert!(compressed.len() < 40);
        assert_eq!(roundtrip(&data, Endianness::Little), data);
    }

    #[test]
    fn test_match_past_size_is_truncated() {
        let mut prefix = Endianness::Big.u32_bytes(4).to_vec();
        prefix.push(b'z');
        let mut writer = ControlWriter::new(prefix, Endianness::Big);
        writer.push_bit(true);
        writer.push_dict_code(10);
        writer.push_dict_code(2);
        writer.push_byte(0);
        let stream = writer.finish();

        let restored = decompress(&stream, Endianness::Big, &Limits::default()).unwrap();
        assert_eq!(restored, b"zzzz");
    }

    #[test]
    fn test_match_before_output_start() {
        let mut prefix = Endianness::Big.u32_bytes(10).to_vec();
        prefix.push(b'z');
        let mut writer = ControlWriter::new(prefix, Endianness::Big);
        writer.push_bit(true);
        writer.push_dict_code(4);
        writer.push_dict_code(2);
        writer.push_byte(5);
        let stream = writer.finish();

        assert!(matches!(
            decompress(&stream, Endianness::Big, &Limits::default()),
            Err(TpconfError::CorruptStream(_))
        ));
    }

    #[test]
    fn test_truncated_stream() {
        let data = b"truncate me, truncate me, truncate me".to_vec();
        let compressed = compress(&data, Endianness::Big, false).unwrap();
        let truncated = &compressed[..compressed.len() - 3];
        assert!(matches!(
            decompress(truncated, Endianness::Big, &Limits::default()),
            Err(TpconfError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_declared_size_limit() {
        let mut stream = Endianness::Little.u32_bytes(u32::MAX).to_vec();
        stream.extend_from_slice(&[0u8; 8]);
        assert!(matches!(
            decompress(&stream, Endianness::Little, &Limits::default()),
            Err(TpconfError::LimitExceeded(_))
        ));
    }

    #[test]
    fn test_trailing_padding_is_ignored() {
        let data = b"<?xml version=\"1.0\"?><config></config>\0".to_vec();
        let mut compressed = compress(&data, Endianness::Big, false).unwrap();
        compressed.extend_from_slice(&[0u8; 7]);
        let restored = decompress(&compressed, Endianness::Big, &Limits::default()).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn test_consumed_length_matches_stream() {
        let data = b"<?xml version=\"1.0\"?><config><a/><a/><a/></config>\0".to_vec();
        for endianness in [Endianness::Big, Endianness::Little] {
            let compressed = compress(&data, endianness, false).unwrap();
            let mut padded = compressed.clone();
            padded.extend_from_slice(&[0u8; 5]);

            let (restored, consumed) =
                decompress_counted(&padded, endianness, &Limits::default()).unwrap();
            assert_eq!(restored, data);
            assert_eq!(consumed, compressed.len());
        }
    }

    #[test]
    fn test_consumed_length_of_seed_only_stream() {
        // The control word reserved after the seed is never read.
        let compressed = compress(&[0x41], Endianness::Big, false).unwrap();
        let (_, consumed) =
            decompress_counted(&compressed, Endianness::Big, &Limits::default()).unwrap();
        assert_eq!(consumed, compressed.len() - 2);

        let empty = compress(&[], Endianness::Big, false).unwrap();
        let (_, consumed) = decompress_counted(&empty, Endianness::Big, &Limits::default()).unwrap();
        assert_eq!(consumed, 4);
    }

    #[test]
    fn test_hash_uses_low_thirteen_bits() {
        let bytes = [0xff, 0xff, 0xff, 0xff];
        let expected = ((((255u64 * 0x13d + 255) * 0x13d + 255) * 0x13d + 255) & 0x1fff) as usize;
        assert_eq!(hash_at(&bytes, 0), expected);
        assert!(hash_at(&bytes, 0) < 1 << HASH_BITS);
    }

    #[test]
    fn test_compression_is_deterministic() {
        let data = b"<a><b>value</b><b>value</b><b>other</b></a>".repeat(10);
        let first = compress(&data, Endianness::Big, false).unwrap();
        let second = compress(&data, Endianness::Big, false).unwrap();
        assert_eq!(first, second);
    }
}

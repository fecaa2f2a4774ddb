//! Dictionary length code (`dict_ld`)
//!
//! A self-terminating variable-length code for integers >= 2. The most
//! significant bit is implicit; the remaining bits are emitted from high to
//! low, each one after the first preceded by a `1` continuation flag, and a
//! final `0` flag ends the code:
//!
//! ```text
//! value 0b1_abc  ->  a 1 b 1 c 0
//! ```

use smallvec::SmallVec;

use crate::error::{Result, TpconfError};

/// Smallest value the code can represent
pub const MIN_DICT_CODE: u32 = 2;

/// Encode a value as dictionary-code bits in emission order
///
/// # Panics
///
/// Panics if `value` is below [`MIN_DICT_CODE`]; such values have no encoding.
pub fn encode_dict_code(value: u32) -> SmallVec<[bool; 64]> {
    assert!(value >= MIN_DICT_CODE, "dictionary code values start at 2");

    let mut bits = SmallVec::new();
    let top = 31 - value.leading_zeros();

    for (i, shift) in (0..top).rev().enumerate() {
        if i > 0 {
            bits.push(true);
        }
        bits.push(value & (1 << shift) != 0);
    }
    bits.push(false);

    bits
}

/// Decode a dictionary code, pulling bits from `next_bit`
pub fn decode_dict_code<F>(mut next_bit: F) -> Result<u32>
where
    F: FnMut() -> Result<bool>,
{
    let mut value = 1u32;
    loop {
        if value & (1 << 31) != 0 {
            return Err(TpconfError::CorruptStream(
                "dictionary code exceeds 32 bits".to_string(),
            ));
        }
        value = (value << 1) | next_bit()? as u32;
        if !next_bit()? {
            return Ok(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode_bits(bits: &[bool]) -> Result<(u32, usize)> {
        let mut iter = bits.iter();
        let mut consumed = 0;
        let value = decode_dict_code(|| {
            consumed += 1;
            iter.next().copied().ok_or(TpconfError::UnexpectedEof {
                needed: consumed,
                available: bits.len(),
            })
        })?;
        Ok((value, consumed))
    }

    #[test]
    fn test_small_codes() {
        assert_eq!(encode_dict_code(2).as_slice(), &[false, false]);
        assert_eq!(encode_dict_code(3).as_slice(), &[true, false]);
        assert_eq!(encode_dict_code(4).as_slice(), &[false, true, false, false]);
        assert_eq!(encode_dict_code(7).as_slice(), &[true, true, true, false]);
        assert_eq!(
            encode_dict_code(0b1011).as_slice(),
            &[false, true, true, true, true, false]
        );
    }

    #[test]
    fn test_code_length_grows_logarithmically() {
        assert_eq!(encode_dict_code(2).len(), 2);
        assert_eq!(encode_dict_code(255).len(), 14);
        assert_eq!(encode_dict_code(256).len(), 16);
        assert_eq!(encode_dict_code(u32::MAX).len(), 62);
    }

    #[test]
    #[should_panic(expected = "dictionary code values start at 2")]
    fn test_rejects_values_below_two() {
        encode_dict_code(1);
    }

    #[test]
    fn test_decode_truncated() {
        let bits = encode_dict_code(1000);
        assert!(matches!(
            decode_bits(&bits[..bits.len() - 1]),
            Err(TpconfError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_decode_runaway_code() {
        let bits = vec![true; 80];
        assert!(matches!(
            decode_bits(&bits),
            Err(TpconfError::CorruptStream(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_dict_code_roundtrip(value in MIN_DICT_CODE..=u32::MAX) {
            let bits = encode_dict_code(value);
            let (decoded, consumed) = decode_bits(&bits).unwrap();
            prop_assert_eq!(decoded, value);
            prop_assert_eq!(consumed, bits.len());
        }
    }
}

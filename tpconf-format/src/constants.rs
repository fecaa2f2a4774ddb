//! Constants and magic numbers for the backup format

/// DES key shared by every supported router model.
pub const DES_KEY: [u8; 8] = [0x47, 0x8d, 0xa5, 0x0b, 0xf9, 0xe3, 0xd2, 0xcf];

/// DES block size in bytes.
pub const BLOCK_LEN: usize = 8;

/// Length of the MD5 digest prefix.
pub const DIGEST_LEN: usize = 16;

/// Number of trailing-length candidates tried by the standard digest check.
pub const PADDING_TRIALS: usize = 8;

/// Markup signature of a plain XML payload.
pub const XML_SIGNATURE: &[u8; 5] = b"<?xml";

/// Markup signature as it appears at the start of a compressed stream: the
/// seed literal `<`, an all-literal control window, then `?xml`.
pub const COMPRESSED_XML_SIGNATURE: &[u8; 7] = b"<\0\0?xml";

/// Offset of the 16-bit payload length in AC1350 backups.
pub const AC1350_LENGTH_OFFSET: usize = 16;

/// Start of the digest-covered region in AC1350 backups.
pub const AC1350_REGION_START: usize = 20;

/// Largest size header accepted as plausible by byte order inference.
pub const SIZE_PLAUSIBILITY_LIMIT: u32 = 0x20000;

/// Width of the compressed-stream size header.
pub const SIZE_HEADER_LEN: usize = 4;

/// Number of bits in the match finder's hash.
pub const HASH_BITS: u32 = 13;

/// Multiplier applied to each of the first three bytes of a hashed window.
pub const HASH_MULTIPLIER: u32 = 0x13D;

/// Minimum match length worth a back-reference.
pub const MIN_MATCH_LEN: usize = 4;

/// Once this many bytes or fewer remain, the compressor only emits literals.
pub const LITERAL_TAIL_LEN: usize = 4;

/// Number of control bits per window.
pub const CONTROL_WINDOW_BITS: usize = 16;

/// File name used for exported backups.
pub const EXPORT_FILE_NAME: &str = "config.bin";

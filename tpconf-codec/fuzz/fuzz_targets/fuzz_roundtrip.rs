#![no_main]

use libfuzzer_sys::fuzz_target;
use tpconf_codec::lz::{compress, decompress};
use tpconf_format::{Endianness, Limits};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() || data.len() > 0x20000 {
        return;
    }

    // First byte picks the options, the rest is the payload.
    let endianness = Endianness::from_little_endian(data[0] & 1 == 1);
    let allow_overlap_insert = data[0] & 2 == 2;
    let payload = &data[1..];

    let compressed = compress(payload, endianness, allow_overlap_insert).unwrap();
    let restored = decompress(&compressed, endianness, &Limits::default()).unwrap();
    assert_eq!(restored, payload);
});

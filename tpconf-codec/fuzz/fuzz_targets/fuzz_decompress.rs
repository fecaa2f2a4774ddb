#![no_main]

use libfuzzer_sys::fuzz_target;
use tpconf_codec::lz::decompress;
use tpconf_format::{Endianness, Limits};

fuzz_target!(|data: &[u8]| {
    let limits = Limits {
        max_decompressed_len: 1 << 20,
        ..Limits::default()
    };

    for endianness in [Endianness::Big, Endianness::Little] {
        if let Ok(out) = decompress(data, endianness, &limits) {
            assert!(out.len() <= limits.max_decompressed_len);
        }
    }
});

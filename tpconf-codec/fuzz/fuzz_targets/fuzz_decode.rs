#![no_main]

use libfuzzer_sys::fuzz_target;
use tpconf_codec::ConfigCodec;

fuzz_target!(|data: &[u8]| {
    let aligned = &data[..data.len() - data.len() % 8];
    let codec = ConfigCodec::default();
    let _ = codec.decode(aligned);
    let _ = codec.inspect(aligned);
});

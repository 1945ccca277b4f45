#![no_main]

use keyval::codec;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Anything that decodes must encode back to the same bytes
    if let Ok(record) = codec::decode(data) {
        let encoded = codec::encode(&record).expect("decoded record must re-encode");
        assert_eq!(encoded, data);
    }
});

#![no_main]

use keyval_wal::record::{Frame, WalRecord};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1_000_000 {
        return;
    }

    // Must never panic; a decoded frame never claims more bytes than it was given
    if let Ok(Frame::Record(_, consumed)) = WalRecord::decode(data) {
        assert!(consumed <= data.len());
    }
});

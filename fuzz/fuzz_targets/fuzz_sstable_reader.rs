#![no_main]

use keyval_storage::sstable::SSTableReader;
use libfuzzer_sys::fuzz_target;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10_000_000 {
        return;
    }

    let Ok(mut file) = tempfile::NamedTempFile::new() else {
        return;
    };
    if file.write_all(data).is_err() {
        return;
    }

    // Opening and scanning a damaged table must fail cleanly
    if let Ok(mut reader) = SSTableReader::open(file.path()) {
        let _ = reader.get(b"probe");
        let _ = reader.entries();
    }
});

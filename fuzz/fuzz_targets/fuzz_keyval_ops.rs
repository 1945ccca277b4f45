#![no_main]

use arbitrary::Arbitrary;
use keyval::{DeletionState, KeyVal, KeyValConfig, Record, MAX_PAYLOAD_LEN};
use libfuzzer_sys::fuzz_target;
use std::collections::HashMap;

#[derive(Arbitrary, Debug)]
enum State {
    Live,
    Soft,
    Hard,
}

#[derive(Arbitrary, Debug)]
enum StoreOp {
    Put { key: Vec<u8>, state: State, payload: String },
    Get { key: Vec<u8> },
    Lock { key: Vec<u8> },
    Unlock { key: Vec<u8> },
}

#[derive(Arbitrary, Debug)]
struct Input {
    soft_delete: bool,
    ops: Vec<StoreOp>,
}

fuzz_target!(|input: Input| {
    let store = KeyVal::in_memory(KeyValConfig::default().with_soft_delete(input.soft_delete));
    let mut model: HashMap<Vec<u8>, Record> = HashMap::new();

    for op in input.ops.into_iter().take(100) {
        match op {
            StoreOp::Put { key, state, payload } => {
                let deleted = match state {
                    State::Live => DeletionState::Live,
                    State::Soft => DeletionState::Soft,
                    State::Hard => DeletionState::Hard,
                };
                let record = Record::new(deleted, payload);
                let accepted = store.put_record(&key, &record).is_ok();
                assert_eq!(accepted, record.payload.len() <= MAX_PAYLOAD_LEN);
                if accepted {
                    model.insert(key, record);
                }
            }
            StoreOp::Get { key } => {
                let expected = model.get(&key).cloned().unwrap_or_else(Record::hard);
                assert_eq!(store.get_record(&key), expected);
            }
            StoreOp::Lock { key } => {
                let _ = store.lock_key(&key);
            }
            StoreOp::Unlock { key } => store.unlock_key(&key),
        }
    }

    assert!(store.close().is_ok());
    assert!(store.close().is_ok());
});

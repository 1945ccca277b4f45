// Integration tests for record storage and lookup semantics

mod common;

use common::StoreFixture;
use keyval::{
    DecodeError, DeletionState, EncodeError, KeyVal, KeyValConfig, KeyValError, Lookup, Record,
    MAX_PAYLOAD_LEN,
};

#[test]
fn test_soft_record_round_trip() {
    let fixture = StoreFixture::new();
    let store = fixture.open(true);

    store.put_record(b"a", &Record::soft("x")).unwrap();
    assert_eq!(
        store.get_record(b"a"),
        Record {
            deleted: DeletionState::Soft,
            payload: "x".to_string()
        }
    );
}

#[test]
fn test_missing_key_is_hard_sentinel() {
    let fixture = StoreFixture::new();
    let store = fixture.open(false);

    assert_eq!(store.get_record(b"missing"), Record::hard());
    assert!(matches!(store.lookup(b"missing"), Lookup::NotFound));
}

#[test]
fn test_last_write_wins() {
    let fixture = StoreFixture::new();
    let store = fixture.open(false);

    store.put_record(b"obj", &Record::live("v1")).unwrap();
    store.put_record(b"obj", &Record::live("v2")).unwrap();
    store.put_record(b"obj", &Record::hard()).unwrap();
    assert_eq!(store.get_record(b"obj"), Record::hard());

    // A stored hard record is found, not missing
    assert!(matches!(store.lookup(b"obj"), Lookup::Found(r) if r.is_hard_deleted()));

    store.put_record(b"obj", &Record::live("v3")).unwrap();
    assert_eq!(store.get_record(b"obj"), Record::live("v3"));
}

#[test]
fn test_keys_are_exact_bytes() {
    let fixture = StoreFixture::new();
    let store = fixture.open(false);

    store.put_record(b"", &Record::live("empty key")).unwrap();
    store.put_record(b"\x00\xff", &Record::live("binary key")).unwrap();
    store.put_record(b"ab", &Record::live("ab")).unwrap();

    assert_eq!(store.get_record(b""), Record::live("empty key"));
    assert_eq!(store.get_record(b"\x00\xff"), Record::live("binary key"));
    assert_eq!(store.get_record(b"a"), Record::hard());
    assert_eq!(store.get_record(b"ab\x00"), Record::hard());
}

#[test]
fn test_payload_is_opaque() {
    let fixture = StoreFixture::new();
    let store = fixture.open(false);

    let payload = "{\"etag\":\"abc\",\"parts\":[1,2,3]}\n\u{1F600} \u{0}";
    store.put_record(b"k", &Record::live(payload)).unwrap();
    assert_eq!(store.get_record(b"k").payload, payload);
}

#[test]
fn test_soft_record_on_default_store() {
    let fixture = StoreFixture::new();
    let store = KeyVal::open(KeyValConfig::new(&fixture.storage_path)).unwrap();
    assert!(!store.soft_delete_enabled());

    store.put_record(b"a", &Record::soft("x")).unwrap();
    assert_eq!(store.get_record(b"a"), Record::soft("x"));

    store.put_record(b"a", &Record::hard()).unwrap();
    assert_eq!(store.get_record(b"a"), Record::hard());
}

#[test]
fn test_oversized_payload_leaves_prior_value() {
    let fixture = StoreFixture::new();
    let store = fixture.open(false);

    store.put_record(b"k", &Record::live("prior")).unwrap();
    let err = store
        .put_record(b"k", &Record::live("x".repeat(MAX_PAYLOAD_LEN + 1)))
        .unwrap_err();
    assert!(matches!(
        err,
        KeyValError::Encode(EncodeError::PayloadTooLarge { .. })
    ));
    assert_eq!(store.get_record(b"k"), Record::live("prior"));
}

#[test]
fn test_undecodable_stored_value() {
    let fixture = StoreFixture::new();

    // Write garbage straight through the engine
    let engine = keyval::StorageEngine::open(&fixture.storage_path).unwrap();
    engine.put(b"garbage", b"\x07not a record").unwrap();
    engine.close().unwrap();

    let store = fixture.open(false);
    match store.lookup(b"garbage") {
        Lookup::Error(KeyValError::Decode(DecodeError::UnsupportedVersion(7))) => {}
        other => panic!("unexpected lookup result: {other:?}"),
    }
    assert_eq!(store.get_record(b"garbage"), Record::hard());
}

#[test]
fn test_double_close() {
    let fixture = StoreFixture::new();
    let store = fixture.open(false);

    store.put_record(b"k", &Record::live("v")).unwrap();
    assert!(store.close().is_ok());
    assert!(store.close().is_ok());
    assert!(store.is_closed());
}

#[test]
fn test_operations_after_close() {
    let fixture = StoreFixture::new();
    let store = fixture.open(false);
    store.put_record(b"k", &Record::live("v")).unwrap();
    assert!(store.lock_key(b"held"));

    let clone = store.clone();
    store.close().unwrap();

    assert!(clone.is_closed());
    assert!(matches!(
        clone.put_record(b"k", &Record::live("w")),
        Err(KeyValError::Closed)
    ));
    assert!(matches!(clone.lookup(b"k"), Lookup::Error(KeyValError::Closed)));
    assert_eq!(clone.get_record(b"k"), Record::hard());
    assert!(matches!(clone.sync(), Err(KeyValError::Closed)));
    assert!(!clone.lock_key(b"other"));
    assert!(clone.try_lock(b"other").is_none());

    // Releasing stays safe
    clone.unlock_key(b"held");
    clone.unlock_key(b"never-held");
}

#[test]
fn test_config_passthrough() {
    let fixture = StoreFixture::new();
    let store = fixture.open(true);

    assert!(store.is_persistent());
    assert!(store.soft_delete_enabled());
    assert_eq!(store.content_path(), fixture.content_path.as_path());
    // The content directory is never touched
    assert!(!fixture.content_path.exists());
}

#[test]
fn test_in_memory_store_ignores_storage_path() {
    let fixture = StoreFixture::new();
    let store = KeyVal::in_memory(fixture.config(true));

    store.put_record(b"k", &Record::soft("v")).unwrap();
    assert_eq!(store.get_record(b"k"), Record::soft("v"));
    assert!(!store.is_persistent());
    assert!(!fixture.storage_path.exists());
    store.close().unwrap();
}

#[test]
fn test_open_failure() {
    let fixture = StoreFixture::new();
    let blocker = fixture.temp_dir.path().join("file");
    std::fs::write(&blocker, b"x").unwrap();

    let err = match KeyVal::open(KeyValConfig::new(&blocker)) {
        Ok(_) => panic!("open should fail when the storage path is a file"),
        Err(e) => e,
    };
    assert!(matches!(err, KeyValError::Open { ref path, .. } if *path == blocker));
}

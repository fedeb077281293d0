use decay8::memory::clock::{ManualClock, Timestamp};
use decay8::memory::config::PutOptions;
use decay8::memory::store::Store;
use decay8::storage::{decode, encode, CompressionAlgorithm, Hooks, StoreSnapshot};
use std::io::{Read, Seek, SeekFrom, Write};

#[test]
fn test_snapshot_survives_a_file_round_trip() {
    let clock = ManualClock::new(Timestamp::from_secs(0));
    let mut store: Store<String, String> = Store::builder()
        .max_entries(8)
        .summarize_fn(|e| format!("sum:{}", e.value()))
        .clock(clock.clone())
        .build()
        .unwrap();
    store
        .put_with(Some("note".to_string()), "keep me".to_string(), PutOptions::pinned())
        .unwrap();
    store.put_auto("generated".to_string());
    clock.advance_secs(600);
    store.summarize();

    let bytes = encode(&store.to_snapshot(), CompressionAlgorithm::LZ4).unwrap();
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(&bytes).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    let mut read_back = Vec::new();
    file.read_to_end(&mut read_back).unwrap();

    let snapshot: StoreSnapshot<String, String> = decode(&read_back).unwrap();
    let mut restored = snapshot
        .restore(Hooks::new().summarize_fn(|e| format!("again:{}", e.value())).clock(clock.clone()))
        .unwrap();

    let generated = restored.peek(&"1".to_string()).unwrap();
    assert_eq!(generated.summary().map(String::as_str), Some("sum:generated"));
    assert!(restored.peek(&"note".to_string()).unwrap().is_pinned());
    assert_eq!(restored.next_key(), store.next_key());

    // Existing summaries are not recomputed by the re-attached hook.
    assert_eq!(restored.summarize(), 0);
    assert_eq!(restored.stats(), store.stats());
}

//! Tests for Engine
//!
//! These tests verify:
//! - Basic get/set/delete operations
//! - Flush to the data and index logs (manual and automatic)
//! - Index replay on reopen
//! - Concurrent access patterns
//! - Engine lifecycle (open/close)
//! - Retrying flush and close after the logs become unavailable
//! - Command execution through the KvStore facade

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::thread;

use driftkv::config::Config;
use driftkv::engine::Engine;
use driftkv::error::DriftError;
use driftkv::protocol::{Command, Response};
use driftkv::record::TOMBSTONE;
use driftkv::store::KvStore;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn config_in(temp_dir: &TempDir, flush_threshold: usize) -> Config {
    Config::builder()
        .data_dir(temp_dir.path())
        .flush_threshold(flush_threshold)
        .build()
}

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config_in(&temp_dir, 1000)).unwrap();
    (temp_dir, engine)
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_open_creates_files() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("mydb");

    let config = Config::builder().data_dir(&data_dir).build();
    let _engine = Engine::open(config).unwrap();

    assert!(data_dir.join("data.db").exists());
    assert!(data_dir.join("indexes.idx").exists());
}

#[test]
fn test_engine_open_paths() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("custom.data");
    let index = temp_dir.path().join("custom.index");

    let engine = Engine::open_paths(&data, &index, 1, 0).unwrap();
    engine.set(b"k", b"v").unwrap();

    assert_eq!(engine.data_path(), data.as_path());
    assert!(fs::metadata(&data).unwrap().len() > 0);
    assert!(fs::metadata(&index).unwrap().len() > 0);
}

#[test]
fn test_engine_rejects_invalid_config() {
    let temp_dir = TempDir::new().unwrap();

    let result = Engine::open(config_in(&temp_dir, 0));

    assert!(matches!(result, Err(DriftError::Config(_))));
}

#[test]
fn test_engine_set_get() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(b"hello", b"world").unwrap();

    assert_eq!(engine.get(b"hello").unwrap(), Some(b"world".to_vec()));
}

#[test]
fn test_engine_get_nonexistent_key() {
    let (_temp, engine) = setup_temp_engine();

    assert_eq!(engine.get(b"nonexistent").unwrap(), None);
}

#[test]
fn test_engine_round_trip_before_and_after_flush() {
    let (_temp, engine) = setup_temp_engine();

    for i in 0..50 {
        engine
            .set(format!("key{}", i).as_bytes(), format!("value{}", i).as_bytes())
            .unwrap();
    }
    for i in 0..50 {
        assert_eq!(
            engine.get(format!("key{}", i).as_bytes()).unwrap(),
            Some(format!("value{}", i).into_bytes())
        );
    }

    engine.flush().unwrap();
    assert_eq!(engine.memtable_entry_count(), 0);

    for i in 0..50 {
        assert_eq!(
            engine.get(format!("key{}", i).as_bytes()).unwrap(),
            Some(format!("value{}", i).into_bytes())
        );
    }
}

#[test]
fn test_engine_empty_value() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(b"empty", b"").unwrap();
    engine.flush().unwrap();

    assert_eq!(engine.get(b"empty").unwrap(), Some(Vec::new()));
}

#[test]
fn test_engine_binary_data() {
    let (_temp, engine) = setup_temp_engine();

    let key = vec![0u8, 1, 2, 255, 254];
    let value = vec![255u8, 0, 128, 64, 32, b'\r', b'\n'];
    engine.set(&key, &value).unwrap();
    engine.flush().unwrap();

    assert_eq!(engine.get(&key).unwrap(), Some(value));
}

// =============================================================================
// Tombstone Tests
// =============================================================================

#[test]
fn test_engine_delete_unflushed() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(b"key", b"value").unwrap();
    engine.delete(b"key").unwrap();

    assert_eq!(engine.get(b"key").unwrap(), None);
}

#[test]
fn test_engine_delete_after_flush() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(b"key", b"value").unwrap();
    engine.flush().unwrap();
    engine.delete(b"key").unwrap();
    assert_eq!(engine.get(b"key").unwrap(), None);

    engine.flush().unwrap();
    assert_eq!(engine.get(b"key").unwrap(), None);
}

#[test]
fn test_engine_delete_nonexistent_key() {
    let (_temp, engine) = setup_temp_engine();

    engine.delete(b"never-set").unwrap();
    engine.flush().unwrap();

    assert_eq!(engine.get(b"never-set").unwrap(), None);
}

#[test]
fn test_engine_set_after_delete() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(b"key", b"v1").unwrap();
    engine.delete(b"key").unwrap();
    engine.flush().unwrap();
    engine.set(b"key", b"v2").unwrap();

    assert_eq!(engine.get(b"key").unwrap(), Some(b"v2".to_vec()));
}

#[test]
fn test_engine_rejects_tombstone_value() {
    let (_temp, engine) = setup_temp_engine();

    let result = engine.set(b"key", TOMBSTONE);

    assert!(matches!(result, Err(DriftError::ReservedValue)));
    assert_eq!(engine.memtable_entry_count(), 0);
}

// =============================================================================
// Flush Tests
// =============================================================================

#[test]
fn test_engine_last_write_wins() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(b"k", b"v1").unwrap();
    engine.set(b"k", b"v2").unwrap();
    engine.flush().unwrap();

    assert_eq!(engine.get(b"k").unwrap(), Some(b"v2".to_vec()));
}

#[test]
fn test_engine_last_write_wins_across_flushes() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(b"k", b"v1").unwrap();
    engine.flush().unwrap();
    engine.set(b"k", b"v2").unwrap();
    engine.flush().unwrap();

    assert_eq!(engine.get(b"k").unwrap(), Some(b"v2".to_vec()));
}

#[test]
fn test_engine_flush_empty_memtable_is_noop() {
    let (_temp, engine) = setup_temp_engine();

    engine.flush().unwrap();

    let stats = engine.stats();
    assert_eq!(stats.data_file_bytes, 0);
    assert_eq!(stats.index_file_bytes, 0);
    assert_eq!(stats.segments_since_compaction, 0);
}

#[test]
fn test_engine_auto_flush_at_threshold() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config_in(&temp_dir, 3)).unwrap();

    engine.set(b"a", b"1").unwrap();
    engine.set(b"b", b"2").unwrap();
    assert_eq!(engine.memtable_entry_count(), 2);
    assert_eq!(engine.stats().data_file_bytes, 0);

    engine.set(b"c", b"3").unwrap();

    let stats = engine.stats();
    assert_eq!(stats.memtable_entries, 0);
    assert_eq!(stats.index_entries, 3);
    assert_eq!(stats.segments_since_compaction, 1);
    assert!(stats.data_file_bytes > 0);
}

#[test]
fn test_engine_flush_appends_data_then_index() {
    let (temp, engine) = setup_temp_engine();

    engine.set(b"a", b"1").unwrap();
    engine.flush().unwrap();

    // One record (16 + 1 + 1) and one index entry (16 + 1)
    assert_eq!(fs::metadata(temp.path().join("data.db")).unwrap().len(), 18);
    assert_eq!(fs::metadata(temp.path().join("indexes.idx")).unwrap().len(), 17);
}

#[test]
fn test_engine_needs_compaction_after_segments() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .flush_threshold(1)
        .max_index_segments(3)
        .build();
    let engine = Engine::open(config).unwrap();

    engine.set(b"a", b"1").unwrap();
    engine.set(b"b", b"2").unwrap();
    assert!(!engine.needs_compaction());

    engine.set(b"c", b"3").unwrap();
    assert!(engine.needs_compaction());
}

#[test]
fn test_engine_segment_trigger_disabled_with_zero() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_paths(
        temp_dir.path().join("data.db"),
        temp_dir.path().join("indexes.idx"),
        1,
        0,
    )
    .unwrap();

    for i in 0..10 {
        engine.set(format!("k{}", i).as_bytes(), b"v").unwrap();
    }

    assert!(!engine.needs_compaction());
}

// =============================================================================
// Reopen Tests
// =============================================================================

#[test]
fn test_engine_scenario_auto_flush_and_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("data.db");
    let index = temp_dir.path().join("indexes.idx");

    {
        let engine = Engine::open_paths(&data, &index, 1000, 0).unwrap();
        engine.set(b"a", b"1").unwrap();
        engine.set(b"a", b"2").unwrap();
        engine.flush().unwrap();
        assert_eq!(engine.get(b"a").unwrap(), Some(b"2".to_vec()));

        engine.delete(b"a").unwrap();
        assert_eq!(engine.get(b"a").unwrap(), None);
    }

    {
        let engine = Engine::open_paths(&data, &index, 1, 0).unwrap();
        engine.set(b"b", b"x").unwrap();
        assert_eq!(engine.memtable_entry_count(), 0);
    }

    let engine = Engine::open_paths(&data, &index, 1, 0).unwrap();
    assert_eq!(engine.get(b"b").unwrap(), Some(b"x".to_vec()));
    assert_eq!(engine.get(b"a").unwrap(), None);
}

#[test]
fn test_engine_reopen_yields_identical_reads() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(&temp_dir, 7);

    let mut expected = Vec::new();
    {
        let engine = Engine::open(config.clone()).unwrap();
        for i in 0..100 {
            let key = format!("key{}", i);
            match i % 4 {
                0 => engine.delete(key.as_bytes()).unwrap(),
                _ => engine.set(key.as_bytes(), format!("v{}", i).as_bytes()).unwrap(),
            }
        }
        for i in (0..100).step_by(3) {
            engine.set(format!("key{}", i).as_bytes(), b"overwritten").unwrap();
        }
        for i in 0..100 {
            let key = format!("key{}", i);
            expected.push((key.clone(), engine.get(key.as_bytes()).unwrap()));
        }
        engine.close().unwrap();
    }

    let engine = Engine::open(config).unwrap();
    for (key, value) in expected {
        assert_eq!(engine.get(key.as_bytes()).unwrap(), value, "key {}", key);
    }
}

#[test]
fn test_engine_drop_flushes_memtable() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(&temp_dir, 1000);

    {
        let engine = Engine::open(config.clone()).unwrap();
        engine.set(b"pending", b"value").unwrap();
        assert_eq!(engine.memtable_entry_count(), 1);
    }

    let engine = Engine::open(config).unwrap();
    assert_eq!(engine.get(b"pending").unwrap(), Some(b"value".to_vec()));
}

#[test]
fn test_engine_reopen_ignores_torn_index_tail() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(&temp_dir, 1);
    let index_path = temp_dir.path().join("indexes.idx");

    {
        let engine = Engine::open(config.clone()).unwrap();
        engine.set(b"a", b"1").unwrap();
        engine.set(b"b", b"2").unwrap();
    }

    // Cut the last entry in half
    let len = fs::metadata(&index_path).unwrap().len();
    let file = fs::OpenOptions::new().write(true).open(&index_path).unwrap();
    file.set_len(len - 1).unwrap();
    drop(file);

    let engine = Engine::open(config).unwrap();
    assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(engine.get(b"b").unwrap(), None);

    // New writes land on an entry boundary
    engine.set(b"c", b"3").unwrap();
    drop(engine);

    let engine = Engine::open(config_in(&temp_dir, 1)).unwrap();
    assert_eq!(engine.get(b"c").unwrap(), Some(b"3".to_vec()));
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_engine_close_is_idempotent() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(b"k", b"v").unwrap();
    engine.close().unwrap();
    engine.close().unwrap();
}

#[test]
fn test_engine_writes_after_close_fail() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(b"k", b"v").unwrap();
    engine.close().unwrap();

    assert!(matches!(engine.set(b"x", b"y"), Err(DriftError::Closed)));
    assert!(matches!(engine.delete(b"k"), Err(DriftError::Closed)));
    // Reads keep working
    assert_eq!(engine.get(b"k").unwrap(), Some(b"v".to_vec()));
}

#[test]
fn test_engine_close_retries_after_storage_failure() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(&temp_dir, 1000);
    let data_path = temp_dir.path().join("data.db");

    let engine = Engine::open(config.clone()).unwrap();
    engine.set(b"k", b"v").unwrap();

    // A directory where the data log should be makes every append fail
    fs::remove_file(&data_path).unwrap();
    fs::create_dir(&data_path).unwrap();

    assert!(matches!(
        engine.close(),
        Err(DriftError::StorageUnavailable(_))
    ));

    // Still open: buffered writes are kept and new ones accepted
    assert_eq!(engine.get(b"k").unwrap(), Some(b"v".to_vec()));
    engine.set(b"k2", b"v2").unwrap();

    fs::remove_dir(&data_path).unwrap();
    engine.close().unwrap();
    assert!(matches!(engine.set(b"x", b"y"), Err(DriftError::Closed)));
    drop(engine);

    let engine = Engine::open(config).unwrap();
    assert_eq!(engine.get(b"k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(engine.get(b"k2").unwrap(), Some(b"v2".to_vec()));
}

#[test]
fn test_engine_flush_retries_after_index_failure() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(&temp_dir, 1000);
    let index_path = temp_dir.path().join("indexes.idx");
    let index_backup = temp_dir.path().join("indexes.bak");

    let engine = Engine::open(config.clone()).unwrap();
    engine.set(b"a", b"1").unwrap();
    engine.flush().unwrap();

    fs::rename(&index_path, &index_backup).unwrap();
    fs::create_dir(&index_path).unwrap();

    engine.set(b"b", b"2").unwrap();
    assert!(matches!(
        engine.flush(),
        Err(DriftError::StorageUnavailable(_))
    ));
    assert_eq!(engine.memtable_entry_count(), 1);
    assert_eq!(engine.get(b"b").unwrap(), Some(b"2".to_vec()));

    fs::remove_dir(&index_path).unwrap();
    fs::rename(&index_backup, &index_path).unwrap();
    engine.flush().unwrap();
    assert_eq!(engine.memtable_entry_count(), 0);
    drop(engine);

    // The records orphaned by the failed flush do not shift later offsets
    let engine = Engine::open(config).unwrap();
    assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(engine.get(b"b").unwrap(), Some(b"2".to_vec()));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_engine_concurrent_writers_same_key() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Arc::new(Engine::open(config_in(&temp_dir, 16)).unwrap());

    let writers = 8;
    let rounds = 200;
    let mut handles = vec![];

    for t in 0..writers {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for r in 0..rounds {
                engine
                    .set(b"shared", format!("writer{}-round{}", t, r).as_bytes())
                    .unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let written: HashSet<Vec<u8>> = (0..writers)
        .flat_map(|t| (0..rounds).map(move |r| format!("writer{}-round{}", t, r).into_bytes()))
        .collect();

    let value = engine.get(b"shared").unwrap().unwrap();
    assert!(written.contains(&value));

    engine.flush().unwrap();
    let value = engine.get(b"shared").unwrap().unwrap();
    assert!(written.contains(&value));
}

#[test]
fn test_engine_concurrent_readers_and_writers() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Arc::new(Engine::open(config_in(&temp_dir, 10)).unwrap());

    for i in 0..100 {
        engine
            .set(format!("key{}", i).as_bytes(), format!("value{}", i).as_bytes())
            .unwrap();
    }

    let mut handles = vec![];

    for t in 0..4 {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for i in 0..100 {
                engine
                    .set(format!("t{}-{}", t, i).as_bytes(), b"new")
                    .unwrap();
            }
        }));
    }

    for _ in 0..4 {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for i in 0..100 {
                let value = engine.get(format!("key{}", i).as_bytes()).unwrap();
                assert_eq!(value, Some(format!("value{}", i).into_bytes()));
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    for t in 0..4 {
        for i in 0..100 {
            assert_eq!(
                engine.get(format!("t{}-{}", t, i).as_bytes()).unwrap(),
                Some(b"new".to_vec())
            );
        }
    }
}

// =============================================================================
// Command Execution Tests
// =============================================================================

#[test]
fn test_engine_execute_commands() {
    let (_temp, engine) = setup_temp_engine();

    let response = engine
        .execute(Command::Set {
            key: b"k".to_vec(),
            value: b"v".to_vec(),
        })
        .unwrap();
    assert_eq!(response, Response::Ok);

    let response = engine.execute(Command::Get { key: b"k".to_vec() }).unwrap();
    assert_eq!(response, Response::Bulk(b"v".to_vec()));

    let response = engine.execute(Command::Del { key: b"k".to_vec() }).unwrap();
    assert_eq!(response, Response::Integer(1));

    let response = engine.execute(Command::Get { key: b"k".to_vec() }).unwrap();
    assert_eq!(response, Response::Nil);

    assert_eq!(engine.execute(Command::Ping).unwrap(), Response::Pong);
}

#[test]
fn test_engine_execute_surfaces_errors() {
    let (_temp, engine) = setup_temp_engine();

    let result = engine.execute(Command::Set {
        key: b"k".to_vec(),
        value: TOMBSTONE.to_vec(),
    });

    assert!(matches!(result, Err(DriftError::ReservedValue)));
}

// =============================================================================
// Live Entries Tests
// =============================================================================

#[test]
fn test_engine_live_entries_overlays_memtable() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(b"a", b"1").unwrap();
    engine.set(b"b", b"2").unwrap();
    engine.set(b"c", b"3").unwrap();
    engine.flush().unwrap();
    engine.set(b"a", b"updated").unwrap();
    engine.delete(b"b").unwrap();
    engine.set(b"d", b"4").unwrap();

    let mut entries = engine.live_entries().unwrap();
    entries.sort();

    assert_eq!(
        entries,
        vec![
            (b"a".to_vec(), b"updated".to_vec()),
            (b"c".to_vec(), b"3".to_vec()),
            (b"d".to_vec(), b"4".to_vec()),
        ]
    );
}

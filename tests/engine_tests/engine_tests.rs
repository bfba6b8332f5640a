//! Tests for Engine
//!
//! These tests verify:
//! - Basic get/put/delete operations
//! - Every mutation reaches the log before the tree
//! - Rebuilding the tree from the log on reopen
//! - Seeding a fresh log
//! - Engine lifecycle (open/close)

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use timberkv::config::{Config, WalSyncStrategy};
use timberkv::engine::Engine;
use timberkv::error::TimberError;

// =============================================================================
// Helper Functions
// =============================================================================

fn log_config(log_path: &PathBuf) -> Config {
    Config::builder()
        .log_path(log_path)
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .build()
}

fn setup_temp_engine() -> (TempDir, PathBuf, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("tree-log.txt");
    let engine = Engine::open(log_config(&log_path)).unwrap();
    (temp_dir, log_path, engine)
}

fn snapshot(engine: &Engine) -> Vec<(String, String)> {
    engine
        .tree()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_open_creates_log() {
    let (_temp, log_path, engine) = setup_temp_engine();

    assert!(log_path.exists());
    assert!(engine.is_empty());
    assert_eq!(engine.recovery().entries_recovered, 0);
}

#[test]
fn test_engine_put_get() {
    let (_temp, _log, mut engine) = setup_temp_engine();

    assert_eq!(engine.put("hello", "world").unwrap(), None);

    assert_eq!(engine.get("hello"), Some("world"));
    assert_eq!(engine.get("nonexistent"), None);
}

#[test]
fn test_engine_put_returns_previous() {
    let (_temp, _log, mut engine) = setup_temp_engine();

    engine.put("a", "1").unwrap();
    let previous = engine.put("a", "2").unwrap();

    assert_eq!(previous.as_deref(), Some("1"));
    assert_eq!(engine.get("a"), Some("2"));
    assert_eq!(engine.len(), 1);
}

#[test]
fn test_engine_delete() {
    let (_temp, _log, mut engine) = setup_temp_engine();

    engine.put("a", "1").unwrap();

    assert_eq!(engine.delete("a").unwrap().as_deref(), Some("1"));
    assert_eq!(engine.delete("a").unwrap(), None);
    assert_eq!(engine.get("a"), None);
}

#[test]
fn test_engine_logs_each_mutation() {
    let (_temp, log_path, mut engine) = setup_temp_engine();

    engine.put("k1", "v1").unwrap();
    engine.put("k1", "v2").unwrap();
    engine.delete("k1").unwrap();
    engine.delete("never-there").unwrap();

    let log = fs::read_to_string(&log_path).unwrap();
    assert_eq!(log, "insert k1 v1\nupdate k1 v2\ndelete k1\n");
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn test_engine_replays_existing_log() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("tree-log.txt");
    fs::write(&log_path, "insert k1 v1\ninsert k2 v2\ndelete k1\n").unwrap();

    let engine = Engine::open(log_config(&log_path)).unwrap();

    assert_eq!(engine.get("k1"), None);
    assert_eq!(engine.get("k2"), Some("v2"));
    assert_eq!(engine.len(), 1);
    assert_eq!(engine.recovery().entries_recovered, 3);
}

#[test]
fn test_engine_reopen_reproduces_tree() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("tree-log.txt");

    let before = {
        let mut engine = Engine::open(log_config(&log_path)).unwrap();
        for i in 0..200 {
            engine.put(&format!("key{:03}", i), &format!("v{}", i)).unwrap();
        }
        for i in (0..200).step_by(3) {
            engine.delete(&format!("key{:03}", i)).unwrap();
        }
        for i in (1..200).step_by(7) {
            engine.put(&format!("key{:03}", i), "rewritten").unwrap();
        }
        engine.close().unwrap();
        snapshot(&engine)
    };

    let engine = Engine::open(log_config(&log_path)).unwrap();
    assert_eq!(snapshot(&engine), before);
    engine.tree().verify().unwrap();
}

#[test]
fn test_engine_reopen_with_different_order() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("tree-log.txt");

    {
        let mut engine = Engine::open(log_config(&log_path)).unwrap();
        for i in 0..100 {
            engine.put(&format!("k{}", i), "v").unwrap();
        }
    }

    let config = Config::builder().log_path(&log_path).tree_order(3).build();
    let engine = Engine::open(config).unwrap();
    assert_eq!(engine.len(), 100);
    assert_eq!(engine.tree().order(), 3);
}

#[test]
fn test_engine_truncates_torn_tail_on_open() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("tree-log.txt");
    fs::write(&log_path, "insert a 1\ninsert b").unwrap();

    let mut engine = Engine::open(log_config(&log_path)).unwrap();
    assert!(engine.recovery().was_truncated);
    assert_eq!(engine.get("b"), None);

    engine.put("c", "3").unwrap();
    assert_eq!(fs::read_to_string(&log_path).unwrap(), "insert a 1\ninsert c 3\n");
}

#[test]
fn test_engine_refuses_corrupt_log() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("tree-log.txt");
    fs::write(&log_path, "insert a 1\nremove a\n").unwrap();

    match Engine::open(log_config(&log_path)) {
        Err(TimberError::LogCorruption { line, .. }) => assert_eq!(line, 2),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("corrupt log was accepted"),
    }
}

// =============================================================================
// Seeding Tests
// =============================================================================

#[test]
fn test_engine_seeds_missing_log() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("seed-log.txt");
    let config = Config::builder().log_path(&log_path).seed_count(500).build();

    let engine = Engine::open(config).unwrap();

    assert_eq!(engine.len(), 500);
    assert_eq!(engine.recovery().inserts, 500);
}

#[test]
fn test_engine_does_not_reseed_existing_log() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("seed-log.txt");
    fs::write(&log_path, "insert only one\n").unwrap();
    let config = Config::builder().log_path(&log_path).seed_count(500).build();

    let engine = Engine::open(config).unwrap();

    assert_eq!(engine.len(), 1);
    assert_eq!(engine.get("only"), Some("one"));
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_engine_close_rejects_mutations() {
    let (_temp, log_path, mut engine) = setup_temp_engine();
    engine.put("a", "1").unwrap();

    engine.close().unwrap();
    assert!(engine.is_closed());

    assert!(matches!(engine.put("a", "2"), Err(TimberError::LogClosed)));
    assert!(matches!(engine.delete("a"), Err(TimberError::LogClosed)));
    assert!(matches!(engine.flush(), Err(TimberError::LogClosed)));

    // Nothing reached the tree or the log
    assert_eq!(engine.get("a"), Some("1"));
    assert_eq!(fs::read_to_string(&log_path).unwrap(), "insert a 1\n");
}

#[test]
fn test_engine_close_twice() {
    let (_temp, _log, mut engine) = setup_temp_engine();

    engine.close().unwrap();
    engine.close().unwrap();
}

#[test]
fn test_engine_batched_sync() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("tree-log.txt");
    let config = Config::builder()
        .log_path(&log_path)
        .wal_sync_strategy(WalSyncStrategy::EveryNEntries { count: 10 })
        .build();

    let mut engine = Engine::open(config).unwrap();
    for i in 0..25 {
        engine.put(&format!("k{}", i), "v").unwrap();
    }
    engine.flush().unwrap();

    let lines = fs::read_to_string(&log_path).unwrap().lines().count();
    assert_eq!(lines, 25);
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
fn test_config_defaults() {
    let config = Config::default();

    assert_eq!(config.tree_order, 5);
    assert_eq!(config.log_path, PathBuf::from("tree-log.txt"));
    assert!(!config.allow_remote_shutdown);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_rejects_small_order() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .log_path(temp_dir.path().join("tree-log.txt"))
        .tree_order(2)
        .build();

    assert!(matches!(config.validate(), Err(TimberError::Config(_))));
    assert!(matches!(Engine::open(config), Err(TimberError::Config(_))));
}

#[test]
fn test_config_rejects_zero_sync_batch() {
    let config = Config::builder()
        .wal_sync_strategy(WalSyncStrategy::EveryNEntries { count: 0 })
        .build();

    assert!(config.validate().is_err());
}

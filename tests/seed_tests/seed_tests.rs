//! Tests for the seed data generator

use std::collections::HashSet;
use std::fs;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;
use timberkv::config::Config;
use timberkv::engine::Engine;
use timberkv::error::TimberError;
use timberkv::seed::{generate, generate_with_rng, SeedOptions};
use timberkv::wal::{LogRecovery, Operation};

fn small(count: usize) -> SeedOptions {
    SeedOptions {
        count,
        key_len: 8,
        value_len: 10,
    }
}

#[test]
fn test_seed_writes_unique_inserts() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("seed-log.txt");

    let report = generate(&path, &small(2000)).unwrap();
    assert_eq!(report.pairs_written, 2000);
    assert_eq!(report.bytes_written, fs::metadata(&path).unwrap().len());

    let (entries, result) = LogRecovery::recover(&path).unwrap();
    assert_eq!(result.inserts, 2000);
    assert!(!result.was_truncated);

    let mut keys = HashSet::new();
    for entry in entries {
        match entry.operation {
            Operation::Insert { key, value } => {
                assert_eq!(key.len(), 8);
                assert_eq!(value.len(), 10);
                assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
                assert!(keys.insert(key));
            }
            other => panic!("unexpected seed record {:?}", other),
        }
    }
}

#[test]
fn test_seed_is_deterministic_with_seeded_rng() {
    let temp_dir = TempDir::new().unwrap();
    let a = temp_dir.path().join("a.txt");
    let b = temp_dir.path().join("b.txt");

    generate_with_rng(&a, &small(100), &mut StdRng::seed_from_u64(7)).unwrap();
    generate_with_rng(&b, &small(100), &mut StdRng::seed_from_u64(7)).unwrap();

    assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
}

#[test]
fn test_seed_replaces_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("seed-log.txt");
    fs::write(&path, "insert stale data\n").unwrap();

    generate(&path, &small(10)).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 10);
    assert!(!contents.contains("stale"));
}

#[test]
fn test_seed_zero_pairs() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("seed-log.txt");

    let report = generate(&path, &small(0)).unwrap();

    assert_eq!(report.pairs_written, 0);
    assert_eq!(fs::read_to_string(&path).unwrap(), "");
}

#[test]
fn test_seed_rejects_impossible_options() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("seed-log.txt");

    let too_many = SeedOptions {
        count: 100,
        key_len: 1,
        value_len: 4,
    };
    assert!(matches!(generate(&path, &too_many), Err(TimberError::Config(_))));

    let empty_value = SeedOptions {
        count: 1,
        key_len: 4,
        value_len: 0,
    };
    assert!(matches!(generate(&path, &empty_value), Err(TimberError::Config(_))));
}

#[test]
fn test_seeded_log_loads_into_engine() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("seed-log.txt");
    generate(&path, &small(3000)).unwrap();

    let engine = Engine::open(Config::builder().log_path(&path).build()).unwrap();

    assert_eq!(engine.len(), 3000);
    assert!(engine.tree().height() > 1);
    engine.tree().verify().unwrap();
}

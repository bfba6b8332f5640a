//! Seed data generator
//!
//! Writes a reconstruction log of random, unique key/value pairs so a fresh
//! server can start with a populated tree.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rand::distr::Alphanumeric;
use rand::Rng;

use crate::error::{Result, TimberError};
use crate::wal::{LogEntry, Operation};

/// Default number of pairs for `--load-seeded`
pub const DEFAULT_SEED_COUNT: usize = 1_000_000;

/// Shape of the generated data
#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub count: usize,
    pub key_len: usize,
    pub value_len: usize,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            count: DEFAULT_SEED_COUNT,
            key_len: 12,
            value_len: 16,
        }
    }
}

impl SeedOptions {
    pub fn with_count(count: usize) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }
}

/// What a generation run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub pairs_written: usize,
    pub bytes_written: u64,
}

/// Generate seed data with the thread-local RNG, replacing any existing file
pub fn generate(path: &Path, options: &SeedOptions) -> Result<SeedReport> {
    generate_with_rng(path, options, &mut rand::rng())
}

/// Generate seed data from the given RNG (deterministic with a seeded one)
pub fn generate_with_rng<R: Rng>(
    path: &Path,
    options: &SeedOptions,
    rng: &mut R,
) -> Result<SeedReport> {
    if options.key_len == 0 || options.value_len == 0 {
        return Err(TimberError::Config("seed keys and values must be non-empty".to_string()));
    }
    // 62 symbols per position; require headroom so rejection sampling ends
    let key_space = 62u128.checked_pow(options.key_len as u32).unwrap_or(u128::MAX);
    if key_space < (options.count as u128).saturating_mul(2) {
        return Err(TimberError::Config(format!(
            "{} unique keys do not fit in length {}",
            options.count, options.key_len
        )));
    }

    let mut writer = BufWriter::new(File::create(path)?);
    let mut seen = HashSet::with_capacity(options.count);
    let mut bytes_written = 0u64;

    while seen.len() < options.count {
        let key = random_token(rng, options.key_len);
        if !seen.insert(key.clone()) {
            continue;
        }
        let entry = LogEntry::new(Operation::Insert {
            key,
            value: random_token(rng, options.value_len),
        });
        let line = entry.encode();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        bytes_written += line.len() as u64 + 1;
    }

    writer.flush()?;
    writer.get_ref().sync_all()?;

    Ok(SeedReport {
        pairs_written: seen.len(),
        bytes_written,
    })
}

fn random_token<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}

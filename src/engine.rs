//! Engine Module
//!
//! The storage engine that pairs the in-memory tree with its reconstruction
//! log.
//!
//! ## Responsibilities
//! - Rebuild the tree from the log on startup (optionally seeding it first)
//! - Append every mutation to the log before applying it to the tree
//! - Flush and close the log on shutdown
//!
//! ## Concurrency Model
//! The engine is owned by the connection multiplexer and only ever touched
//! from its thread, so it takes `&mut self` for mutations and carries no
//! internal locks. Conflicts between clients are handled one layer up by the
//! key lock table.

use crate::config::Config;
use crate::error::{Result, TimberError};
use crate::seed::{self, SeedOptions};
use crate::tree::BTree;
use crate::wal::{LogEntry, LogRecovery, LogWriter, Operation, RecoveryResult};

/// The main storage engine
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Live key/value state
    tree: BTree<String, String>,

    /// Open log; `None` once the engine has been closed
    wal: Option<LogWriter>,

    /// What startup replay found
    recovery: RecoveryResult,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Validate config
    /// 2. Generate seed data if requested and the log is missing
    /// 3. Replay the log into an empty tree
    /// 4. Open the log for appending
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let log_path = config.log_path.clone();

        // Step 1: Seed a fresh log if asked to
        if let Some(count) = config.seed_count {
            if !log_path.exists() {
                let report = seed::generate(&log_path, &SeedOptions::with_count(count))?;
                tracing::info!(
                    "Generated {} seed pairs into {}",
                    report.pairs_written,
                    log_path.display()
                );
            }
        }

        // Step 2: Replay
        let mut tree = BTree::new(config.tree_order);
        let recovery = if log_path.exists() {
            let (entries, result) = LogRecovery::recover(&log_path)?;
            for entry in entries {
                Self::replay(&mut tree, entry.operation);
            }
            tree.verify()?;

            tracing::info!(
                "Replayed {} records from {} ({} live keys, height {})",
                result.entries_recovered,
                log_path.display(),
                tree.len(),
                tree.height()
            );
            result
        } else {
            tracing::info!("No log at {}, starting empty", log_path.display());
            RecoveryResult::default()
        };

        // Step 3: Open for appending
        let wal = LogWriter::open(&log_path, config.wal_sync_strategy)?;

        Ok(Self {
            config,
            tree,
            wal: Some(wal),
            recovery,
        })
    }

    fn replay(tree: &mut BTree<String, String>, operation: Operation) {
        match operation {
            Operation::Insert { key, value } | Operation::Update { key, value } => {
                tree.insert(key, value);
            }
            Operation::Delete { key } => {
                tree.remove(key.as_str());
            }
        }
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tree.get(key).map(String::as_str)
    }

    /// Bind a key to a value, returning the previous value
    ///
    /// Steps:
    /// 1. Decide insert vs update from the current tree
    /// 2. Append to the log (durability)
    /// 3. Apply to the tree
    pub fn put(&mut self, key: &str, value: &str) -> Result<Option<String>> {
        let operation = if self.tree.contains_key(key) {
            Operation::Update {
                key: key.to_string(),
                value: value.to_string(),
            }
        } else {
            Operation::Insert {
                key: key.to_string(),
                value: value.to_string(),
            }
        };

        self.log(operation)?;
        Ok(self.tree.insert(key.to_string(), value.to_string()))
    }

    /// Remove a key, returning its value
    ///
    /// Removing an absent key writes nothing to the log.
    pub fn delete(&mut self, key: &str) -> Result<Option<String>> {
        if !self.tree.contains_key(key) {
            return Ok(None);
        }

        self.log(Operation::Delete { key: key.to_string() })?;
        Ok(self.tree.remove(key))
    }

    fn log(&mut self, operation: Operation) -> Result<()> {
        let wal = self.wal.as_mut().ok_or(TimberError::LogClosed)?;
        wal.append(&LogEntry::new(operation))
    }

    /// Push buffered log data to disk
    pub fn flush(&mut self) -> Result<()> {
        match self.wal.as_mut() {
            Some(wal) => wal.sync(),
            None => Err(TimberError::LogClosed),
        }
    }

    /// Close the engine gracefully
    ///
    /// Syncs and releases the log file. Later mutations fail with
    /// `LogClosed`; reads keep working. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut wal) = self.wal.take() {
            wal.sync()?;
            tracing::info!(
                "Closed log {} after {} appended records",
                wal.path().display(),
                wal.entries_written()
            );
        }
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Whether the log has been closed
    pub fn is_closed(&self) -> bool {
        self.wal.is_none()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Read-only view of the tree
    pub fn tree(&self) -> &BTree<String, String> {
        &self.tree
    }

    /// Statistics from startup replay
    pub fn recovery(&self) -> &RecoveryResult {
        &self.recovery
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!("Failed to close log on drop: {}", e);
        }
    }
}

//! Configuration for TimberKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, TimberError};

/// Smallest branching factor that still allows a split to produce two
/// non-empty halves.
pub const MIN_TREE_ORDER: usize = 3;

/// Main configuration for a TimberKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Reconstruction log. Replayed on open, appended to afterwards.
    pub log_path: PathBuf,

    /// Maximum children per internal node
    pub tree_order: usize,

    /// How often to fsync the log
    pub wal_sync_strategy: WalSyncStrategy,

    /// When set and `log_path` does not exist, generate this many random
    /// pairs into it before replay
    pub seed_count: Option<usize>,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Longest accepted request line, in bytes (newline excluded)
    pub max_line_len: usize,

    /// Readiness events drained per poll
    pub events_capacity: usize,

    /// Whether clients may stop the server with `SHUTDOWN`
    pub allow_remote_shutdown: bool,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced entries; every entry still reaches the OS
    /// before it is acknowledged
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("tree-log.txt"),
            tree_order: 5,
            wal_sync_strategy: WalSyncStrategy::EveryWrite,
            seed_count: None,
            listen_addr: "127.0.0.1:8080".to_string(),
            max_connections: 1024,
            max_line_len: 1024,
            events_capacity: 1024,
            allow_remote_shutdown: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.tree_order < MIN_TREE_ORDER {
            return Err(TimberError::Config(format!(
                "tree order must be at least {}, got {}",
                MIN_TREE_ORDER, self.tree_order
            )));
        }
        if self.max_line_len == 0 {
            return Err(TimberError::Config("max_line_len must be positive".to_string()));
        }
        if self.events_capacity == 0 {
            return Err(TimberError::Config("events_capacity must be positive".to_string()));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(TimberError::Config(
                "EveryNEntries sync count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the reconstruction log path
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_path = path.into();
        self
    }

    /// Set the B-Tree order (branching factor)
    pub fn tree_order(mut self, order: usize) -> Self {
        self.config.tree_order = order;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Generate `count` random pairs if the log file is missing
    pub fn seed_count(mut self, count: usize) -> Self {
        self.config.seed_count = Some(count);
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the longest accepted request line
    pub fn max_line_len(mut self, len: usize) -> Self {
        self.config.max_line_len = len;
        self
    }

    /// Set how many readiness events one poll may return
    pub fn events_capacity(mut self, capacity: usize) -> Self {
        self.config.events_capacity = capacity;
        self
    }

    /// Allow or forbid the `SHUTDOWN` command
    pub fn allow_remote_shutdown(mut self, allow: bool) -> Self {
        self.config.allow_remote_shutdown = allow;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

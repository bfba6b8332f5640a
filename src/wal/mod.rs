//! Reconstruction Log Module
//!
//! Provides durability through an append-only text log that is replayed into
//! an empty tree on startup.
//!
//! ## Responsibilities
//! - Append one record per committed mutation, before it is acknowledged
//! - Parse and replay records in file order (last write for a key wins)
//! - Drop a torn final record left by a crash mid-append
//!
//! ## File Format
//! ```text
//! insert <key> <value>\n
//! update <key> <value>\n
//! delete <key>\n
//! ```
//! Keys and values are whitespace-free tokens, so a single space separates
//! fields. A record counts only once its terminating newline is on disk.
//!
//! The log is never compacted; it grows with every committed mutation.

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::{LogEntry, Operation};
pub use writer::LogWriter;
pub use reader::LogReader;
pub use recovery::{LogRecovery, RecoveryResult};

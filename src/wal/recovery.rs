//! Log Recovery
//!
//! Reads the reconstruction log back for replay after a restart or crash.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::Result;
use super::{LogEntry, LogReader, Operation};

/// Handles log recovery on startup
pub struct LogRecovery;

/// Result of a recovery pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of records successfully recovered
    pub entries_recovered: u64,

    /// Breakdown by operation
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,

    /// Blank lines skipped
    pub blank_lines: u64,

    /// Number of the last complete line
    pub last_line: u64,

    /// Whether an unterminated final line was found (and, for `recover`,
    /// removed)
    pub was_truncated: bool,

    /// Size of that unterminated tail in bytes
    pub bytes_truncated: u64,
}

impl LogRecovery {
    /// Recover records from a log file
    ///
    /// This will:
    /// 1. Read every complete record in order
    /// 2. Fail on a malformed complete record
    /// 3. Truncate an unterminated final line (a torn append)
    /// 4. Return all records in order
    pub fn recover(path: &Path) -> Result<(Vec<LogEntry>, RecoveryResult)> {
        let (entries, result) = Self::scan(path, true)?;

        if result.was_truncated {
            tracing::warn!(
                "Truncating {} bytes of torn record after line {} in {}",
                result.bytes_truncated,
                result.last_line,
                path.display()
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(file.metadata()?.len() - result.bytes_truncated)?;
            file.sync_all()?;
        }

        Ok((entries, result))
    }

    /// Verify integrity of a log file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Self::scan(path, false).map(|(_, result)| result)
    }

    fn scan(path: &Path, keep_entries: bool) -> Result<(Vec<LogEntry>, RecoveryResult)> {
        let file_len = std::fs::metadata(path)?.len();
        let mut reader = LogReader::open(path)?;
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();

        while let Some(entry) = reader.next_entry()? {
            result.entries_recovered += 1;
            match entry.operation {
                Operation::Insert { .. } => result.inserts += 1,
                Operation::Update { .. } => result.updates += 1,
                Operation::Delete { .. } => result.deletes += 1,
            }
            if keep_entries {
                entries.push(entry);
            }
        }

        result.blank_lines = reader.blank_lines();
        result.last_line = reader.line_no();
        result.was_truncated = reader.has_torn_tail();
        result.bytes_truncated = file_len.saturating_sub(reader.valid_len());

        Ok((entries, result))
    }
}

//! Log Writer
//!
//! Handles appending records to the reconstruction log.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{Result, TimberError};
use super::LogEntry;

/// Appends records to the log file
///
/// Records go straight to the file with one `write_all` each; nothing is
/// buffered in user space.
pub struct LogWriter {
    file: File,
    path: PathBuf,
    sync_strategy: WalSyncStrategy,

    /// File length after the last successful append
    committed_len: u64,

    /// Records written since the last fsync
    unsynced: usize,

    /// Records appended through this writer
    entries_written: u64,

    /// Set after a failed append; the file may end in a partial line
    poisoned: bool,
}

impl LogWriter {
    /// Open or create a log file for appending
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let committed_len = file.metadata()?.len();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            sync_strategy,
            committed_len,
            unsynced: 0,
            entries_written: 0,
            poisoned: false,
        })
    }

    /// Append a record
    ///
    /// On return the line has been handed to the OS, and fsynced when the
    /// sync strategy calls for it. On failure the writer is poisoned and any
    /// partial line is cut off again.
    pub fn append(&mut self, entry: &LogEntry) -> Result<()> {
        if self.poisoned {
            return Err(Self::disabled());
        }

        let mut line = entry.encode();
        line.push('\n');

        self.unsynced += 1;
        if let Err(e) = self.write_line(line.as_bytes()) {
            self.poisoned = true;
            tracing::error!("Log append to {} failed: {}", self.path.display(), e);
            self.discard_partial();
            return Err(TimberError::LogWrite(e.to_string()));
        }

        self.committed_len += line.len() as u64;
        self.entries_written += 1;
        Ok(())
    }

    fn write_line(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.file.write_all(bytes)?;

        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if due {
            self.file.sync_data()?;
            self.unsynced = 0;
        }
        Ok(())
    }

    fn discard_partial(&mut self) {
        let truncated = self
            .file
            .set_len(self.committed_len)
            .and_then(|()| self.file.sync_all());
        if let Err(e) = truncated {
            tracing::warn!(
                "Could not cut {} back to {} bytes: {}",
                self.path.display(),
                self.committed_len,
                e
            );
        }
    }

    fn disabled() -> TimberError {
        TimberError::LogWrite("writer disabled after an earlier failed append".to_string())
    }

    /// Force sync to disk
    ///
    /// Refused once the writer is poisoned.
    pub fn sync(&mut self) -> Result<()> {
        if self.poisoned {
            return Err(Self::disabled());
        }
        self.file.sync_all()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Records appended through this writer
    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    /// Whether an earlier append failed
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

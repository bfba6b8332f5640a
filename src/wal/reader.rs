//! Log Reader
//!
//! Handles reading records from the reconstruction log.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Result, TimberError};
use super::LogEntry;

/// Reads records from the log file in order
pub struct LogReader {
    reader: BufReader<File>,

    /// Lines consumed so far (1-based number of the last line read)
    line_no: u64,

    /// Byte length of the file up to and including the last complete line
    valid_len: u64,

    /// Blank lines skipped
    blank_lines: u64,

    /// Set once bytes without a terminating newline were found at the end
    torn_tail: bool,

    buf: Vec<u8>,
}

impl LogReader {
    /// Open a log file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            line_no: 0,
            valid_len: 0,
            blank_lines: 0,
            torn_tail: false,
            buf: Vec::new(),
        })
    }

    /// Read the next record from the log
    ///
    /// Returns `Ok(None)` at end of file or at an unterminated final line.
    pub fn next_entry(&mut self) -> Result<Option<LogEntry>> {
        loop {
            self.buf.clear();
            let n = self.reader.read_until(b'\n', &mut self.buf)?;
            if n == 0 {
                return Ok(None);
            }
            if self.buf.last() != Some(&b'\n') {
                self.torn_tail = true;
                return Ok(None);
            }

            self.line_no += 1;
            self.valid_len += n as u64;

            let line = std::str::from_utf8(&self.buf).map_err(|_| TimberError::LogCorruption {
                line: self.line_no,
                reason: "record is not valid UTF-8".to_string(),
            })?;
            let line = line.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                self.blank_lines += 1;
                continue;
            }

            return LogEntry::parse(line, self.line_no).map(Some);
        }
    }

    /// Iterate over all records
    pub fn entries(self) -> LogIterator {
        LogIterator {
            reader: self,
            done: false,
        }
    }

    /// Byte offset just past the last complete line read
    pub fn valid_len(&self) -> u64 {
        self.valid_len
    }

    /// Whether an unterminated final line was encountered
    pub fn has_torn_tail(&self) -> bool {
        self.torn_tail
    }

    /// Number of the last complete line read
    pub fn line_no(&self) -> u64 {
        self.line_no
    }

    /// Blank lines skipped so far
    pub fn blank_lines(&self) -> u64 {
        self.blank_lines
    }
}

/// Iterator over log records; stops after the first error
pub struct LogIterator {
    reader: LogReader,
    done: bool,
}

impl Iterator for LogIterator {
    type Item = Result<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

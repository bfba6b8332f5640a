//! Log entry definitions
//!
//! Defines the structure of individual log records and their line encoding.

use std::fmt;

use crate::error::{Result, TimberError};

/// A single record in the reconstruction log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// The mutation to replay
    pub operation: Operation,
}

/// Mutations that can be logged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Key was absent and is now bound to `value`
    Insert { key: String, value: String },

    /// Key was present; its value is replaced
    Update { key: String, value: String },

    /// Key was present and is removed
    Delete { key: String },
}

impl Operation {
    /// Keyword written at the start of the record
    pub fn keyword(&self) -> &'static str {
        match self {
            Operation::Insert { .. } => "insert",
            Operation::Update { .. } => "update",
            Operation::Delete { .. } => "delete",
        }
    }

    /// The key this operation touches
    pub fn key(&self) -> &str {
        match self {
            Operation::Insert { key, .. }
            | Operation::Update { key, .. }
            | Operation::Delete { key } => key,
        }
    }
}

impl LogEntry {
    pub fn new(operation: Operation) -> Self {
        Self { operation }
    }

    /// Encode as one log line, without the trailing newline
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parse one log line. `line_no` is 1-based and only used for errors.
    pub fn parse(line: &str, line_no: u64) -> Result<Self> {
        let corrupt = |reason: String| TimberError::LogCorruption { line: line_no, reason };

        let mut fields = line.split_ascii_whitespace();
        let keyword = fields
            .next()
            .ok_or_else(|| corrupt("empty record".to_string()))?;
        let key = fields
            .next()
            .ok_or_else(|| corrupt(format!("'{}' record has no key", keyword)))?
            .to_string();

        let operation = match keyword {
            "insert" | "update" => {
                let value = fields
                    .next()
                    .ok_or_else(|| corrupt(format!("'{}' record has no value", keyword)))?
                    .to_string();
                if keyword == "insert" {
                    Operation::Insert { key, value }
                } else {
                    Operation::Update { key, value }
                }
            }
            "delete" => Operation::Delete { key },
            other => return Err(corrupt(format!("unknown operation '{}'", other))),
        };

        if fields.next().is_some() {
            return Err(corrupt("trailing fields after record".to_string()));
        }
        Ok(Self { operation })
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operation {
            Operation::Insert { key, value } | Operation::Update { key, value } => {
                write!(f, "{} {} {}", self.operation.keyword(), key, value)
            }
            Operation::Delete { key } => write!(f, "{} {}", self.operation.keyword(), key),
        }
    }
}

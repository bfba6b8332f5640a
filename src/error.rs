//! Error types for TimberKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using TimberError
pub type Result<T> = std::result::Result<T, TimberError>;

/// Unified error type for TimberKV operations
#[derive(Debug, Error)]
pub enum TimberError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Reconstruction Log Errors
    // -------------------------------------------------------------------------
    #[error("Log corruption at line {line}: {reason}")]
    LogCorruption { line: u64, reason: String },

    #[error("Log write failed: {0}")]
    LogWrite(String),

    #[error("Log is closed")]
    LogClosed,

    // -------------------------------------------------------------------------
    // Tree Errors
    // -------------------------------------------------------------------------
    #[error("Tree invariant violated: {0}")]
    TreeInvariant(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

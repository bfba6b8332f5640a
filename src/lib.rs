//! # TimberKV
//!
//! A single-process key-value store with:
//! - An in-memory B-Tree of configurable order
//! - An append-only reconstruction log replayed on startup
//! - Per-key locks that reject conflicting mutations instead of blocking
//! - A single-threaded, readiness-driven TCP line protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Connection Multiplexer                      │
//! │            (mio poll loop, one thread, N sockets)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ one request line at a time
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Session (per client)                     │
//! │         IDLE ──begin──▶ ACTIVE ──commit/abort──▶ IDLE        │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐               ┌──────────────────┐
//!   │   Lock Table    │               │      Engine      │
//!   │ (key → session) │               │  log, then tree  │
//!   └─────────────────┘               └────────┬─────────┘
//!                                              │
//!                                 ┌────────────┴───────────┐
//!                                 ▼                        ▼
//!                          ┌─────────────┐          ┌─────────────┐
//!                          │     WAL     │          │   B-Tree    │
//!                          │ (text, app) │          │ (memory)    │
//!                          └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod tree;
pub mod wal;
pub mod engine;
pub mod locks;
pub mod session;
pub mod protocol;
pub mod network;
pub mod client;
pub mod seed;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{TimberError, Result};
pub use config::Config;
pub use engine::Engine;
pub use network::{Server, ShutdownHandle};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of TimberKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

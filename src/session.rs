//! Session State Machine
//!
//! Per-connection protocol state: translates request lines into engine
//! operations under the key lock table.
//!
//! ## States
//! ```text
//!            begin (lock granted)             commit / abort
//!   IDLE ───────────────────────────▶ ACTIVE ───────────────▶ IDLE
//!     │                                  │
//!     └────────── close ──────▶ CLOSED ◀─┘ close (abort first)
//! ```
//! A mutating command is one transaction: acquire the key's lock, stage the
//! mutation, commit it (log, then tree), release the lock. Nothing touches the
//! tree before commit, so a session closed while ACTIVE leaves it exactly as
//! it was.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::Engine;
use crate::locks::{Acquire, LockTable};
use crate::protocol::{parse_command, Command, Response};

/// Identity of one client session, unique for the life of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Transaction state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No outstanding transaction
    Idle,
    /// Holds a key lock with a staged, uncommitted mutation
    Active,
    /// Connection gone; every request is refused
    Closed,
}

/// A staged change to a single key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Write { key: String, value: String },
    Delete { key: String },
}

impl Mutation {
    pub fn key(&self) -> &str {
        match self {
            Mutation::Write { key, .. } | Mutation::Delete { key } => key,
        }
    }

    fn from_command(command: Command) -> Option<Self> {
        match command {
            Command::Write { key, value } => Some(Mutation::Write { key, value }),
            Command::Delete { key } => Some(Mutation::Delete { key }),
            _ => None,
        }
    }
}

/// Shared state a session operates on, lent by the multiplexer per call
pub struct SessionContext<'a> {
    pub engine: &'a mut Engine,
    pub locks: &'a mut LockTable,
    pub shutdown: &'a AtomicBool,
    pub allow_remote_shutdown: bool,
}

/// Server-side state for one client connection
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    state: SessionState,
    held: BTreeSet<String>,
    pending: Option<Mutation>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            state: SessionState::Idle,
            held: BTreeSet::new(),
            pending: None,
        }
    }

    /// Parse and execute one request line
    pub fn handle_line(&mut self, line: &str, ctx: &mut SessionContext<'_>) -> Response {
        if self.state == SessionState::Closed {
            return Response::UnknownClient;
        }
        match parse_command(line) {
            Ok(command) => self.execute(command, ctx),
            Err(e) => {
                tracing::debug!("{}: rejected request: {}", self.id, e);
                e.response()
            }
        }
    }

    /// Execute a parsed command
    pub fn execute(&mut self, command: Command, ctx: &mut SessionContext<'_>) -> Response {
        tracing::trace!("{}: {}", self.id, command);

        match command {
            _ if self.state == SessionState::Closed => Response::UnknownClient,
            Command::Read { key } => match ctx.engine.get(&key) {
                Some(value) => Response::Value(value.to_string()),
                None => Response::NotFound,
            },
            Command::Write { .. } | Command::Delete { .. } => {
                let Some(mutation) = Mutation::from_command(command) else {
                    return Response::BadRequest;
                };
                match self.begin(mutation, ctx) {
                    Ok(()) => self.commit(ctx),
                    Err(refusal) => refusal,
                }
            }
            Command::Ping => Response::Pong,
            Command::Quit => {
                self.close(ctx);
                Response::Bye
            }
            Command::Shutdown if ctx.allow_remote_shutdown => {
                tracing::info!("{} requested shutdown", self.id);
                ctx.shutdown.store(true, Ordering::SeqCst);
                Response::ShuttingDown
            }
            Command::Shutdown => Response::UnknownCommand,
        }
    }

    /// Lock the mutation's key and stage it
    ///
    /// Returns the refusal to send when the session cannot start it: another
    /// session holds the key, shutdown has begun, or a mutation is already
    /// staged.
    pub fn begin(
        &mut self,
        mutation: Mutation,
        ctx: &mut SessionContext<'_>,
    ) -> std::result::Result<(), Response> {
        match self.state {
            SessionState::Closed => return Err(Response::UnknownClient),
            SessionState::Active => return Err(Response::BadRequest),
            SessionState::Idle => {}
        }
        if ctx.shutdown.load(Ordering::SeqCst) {
            return Err(Response::ShuttingDown);
        }

        let key = mutation.key();
        match ctx.locks.try_acquire(key, self.id) {
            Acquire::Granted | Acquire::AlreadyHeld => {}
            Acquire::Denied { owner } => {
                tracing::debug!("{}: key '{}' locked by {}", self.id, key, owner);
                return Err(Response::KeyLocked);
            }
        }

        self.held.insert(key.to_string());
        self.pending = Some(mutation);
        self.state = SessionState::Active;
        Ok(())
    }

    /// Apply the staged mutation (log first, then tree) and release its lock
    pub fn commit(&mut self, ctx: &mut SessionContext<'_>) -> Response {
        let Some(mutation) = self.pending.take() else {
            return Response::BadRequest;
        };

        let outcome = match &mutation {
            Mutation::Write { key, value } => ctx.engine.put(key, value).map(|previous| {
                match previous {
                    Some(previous) => Response::Updated(previous),
                    None => Response::Inserted,
                }
            }),
            Mutation::Delete { key } => ctx.engine.delete(key).map(|removed| match removed {
                Some(value) => Response::Value(value),
                None => Response::NotFound,
            }),
        };

        self.release_locks(ctx.locks);
        self.state = SessionState::Idle;

        outcome.unwrap_or_else(|e| {
            tracing::error!("{}: commit on '{}' failed: {}", self.id, mutation.key(), e);
            Response::StorageError
        })
    }

    /// Discard the staged mutation and release every held lock
    pub fn abort(&mut self, ctx: &mut SessionContext<'_>) {
        if let Some(mutation) = self.pending.take() {
            tracing::debug!("{}: discarded uncommitted change to '{}'", self.id, mutation.key());
        }
        self.release_locks(ctx.locks);
        if self.state == SessionState::Active {
            self.state = SessionState::Idle;
        }
    }

    /// End the session, aborting anything in flight
    pub fn close(&mut self, ctx: &mut SessionContext<'_>) {
        if self.state == SessionState::Closed {
            return;
        }
        self.abort(ctx);
        self.state = SessionState::Closed;
    }

    fn release_locks(&mut self, locks: &mut LockTable) {
        for key in std::mem::take(&mut self.held) {
            locks.release(&key, self.id);
        }
    }

    /// No transaction in flight and no locks held
    pub fn is_done(&self) -> bool {
        self.state != SessionState::Active && self.held.is_empty()
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Keys this session currently holds locks on
    pub fn held_keys(&self) -> impl Iterator<Item = &str> {
        self.held.iter().map(String::as_str)
    }

    /// The staged, uncommitted mutation
    pub fn pending(&self) -> Option<&Mutation> {
        self.pending.as_ref()
    }
}

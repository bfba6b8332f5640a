//! Key Lock Table
//!
//! Process-wide bookkeeping of which session holds which key.
//!
//! The table is owned by the connection multiplexer and only touched from its
//! thread, so it is a plain map. A conflicting acquisition is refused on the
//! spot; nobody ever waits for a lock, so sessions cannot deadlock.

use std::collections::HashMap;

use crate::session::SessionId;

/// Outcome of a lock attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// Lock was free and now belongs to the caller
    Granted,

    /// Caller already held it
    AlreadyHeld,

    /// Another session holds it
    Denied { owner: SessionId },
}

impl Acquire {
    /// Whether the caller holds the lock after the attempt
    pub fn is_held(&self) -> bool {
        !matches!(self, Acquire::Denied { .. })
    }
}

/// Map from locked key to owning session
#[derive(Debug, Default)]
pub struct LockTable {
    owners: HashMap<String, SessionId>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take the lock on `key` for `session`
    pub fn try_acquire(&mut self, key: &str, session: SessionId) -> Acquire {
        match self.owners.get(key) {
            Some(&owner) if owner == session => Acquire::AlreadyHeld,
            Some(&owner) => Acquire::Denied { owner },
            None => {
                self.owners.insert(key.to_string(), session);
                Acquire::Granted
            }
        }
    }

    /// Release `key` if `session` holds it. Returns whether anything was
    /// released.
    pub fn release(&mut self, key: &str, session: SessionId) -> bool {
        match self.owners.get(key) {
            Some(&owner) if owner == session => {
                self.owners.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Release every key held by `session`, returning how many there were
    pub fn release_all(&mut self, session: SessionId) -> usize {
        let before = self.owners.len();
        self.owners.retain(|_, owner| *owner != session);
        before - self.owners.len()
    }

    /// Current owner of `key`
    pub fn holder(&self, key: &str) -> Option<SessionId> {
        self.owners.get(key).copied()
    }

    /// Number of locked keys
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

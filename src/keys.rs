//! One-time keys correlating incoming sessions with known processes.
//!
//! A window manager inserts a key before it launches a client; the handshake
//! consumes the key when that client announces itself with `READY=<key>`.

use std::collections::HashMap;

use crate::transport::ProcessId;

/// Key-to-process table owned by a window.
#[derive(Debug, Default)]
pub struct KeyTable(HashMap<String, ProcessId>);

impl KeyTable {
    /// Register `key` for `process`, replacing any previous mapping.
    pub fn insert(&mut self, key: impl Into<String>, process: ProcessId) {
        self.0.insert(key.into(), process);
    }

    /// Whether `key` is currently registered.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool { self.0.contains_key(key) }

    /// Look up and remove `key` in one step.
    pub fn take(&mut self, key: &str) -> Option<ProcessId> { self.0.remove(key) }

    /// Number of keys not yet consumed.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Whether every key has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

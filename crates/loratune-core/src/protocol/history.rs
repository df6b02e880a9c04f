//! Sent-command history
//!
//! Append-only record of every line written to the device. Only used to
//! give context to negative-acknowledgement diagnostics.

use std::sync::{Mutex, MutexGuard};

/// Ordered log of outbound command lines (without terminator)
#[derive(Debug, Default)]
pub struct SentHistory {
    entries: Mutex<Vec<String>>,
}

impl SentHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a line that was written successfully
    pub fn push(&self, line: impl Into<String>) {
        self.entries().push(line.into());
    }

    /// Most recently sent line
    pub fn last(&self) -> Option<String> {
        self.entries().last().cloned()
    }

    /// Copy of the whole history, oldest first
    pub fn snapshot(&self) -> Vec<String> {
        self.entries().clone()
    }

    /// Number of lines sent
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether nothing was sent yet
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

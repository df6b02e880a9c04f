//! Pending-request table
//!
//! Holds at most one waiter per [`RequestKind`]. The table is keyed by kind
//! only, so a second request of the same kind replaces the first one's slot.
//! The displaced waiter is kept alive but never resolved while the
//! connection lives: its caller simply does not resume. Callers are expected
//! to serialize requests of the same kind.
//!
//! Shared between the caller side (register) and the reader thread
//! (take and resolve); every operation is a single critical section.
//!
//! Once [`PendingRequests::fail_all`] has run the table stays closed: any
//! later registration fails immediately until [`PendingRequests::reopen`].

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::warn;

use super::{ProtocolError, RequestKind};
use crate::radio::{Action, State};

/// Typed result delivered to a waiter
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// `CONFIG_GET` answer
    Config(Action),
    /// `PING` answer; `None` when the peer did not acknowledge
    Ping(Option<State>),
    /// `CONFIG_SYNC` answer; `None` when the outcome is unknown
    Sync(Option<bool>),
}

/// What a waiter is eventually resolved with
pub type Outcome = Result<Reply, ProtocolError>;

/// Receiving end handed to the caller; resolves exactly once
pub type Waiter = oneshot::Receiver<Outcome>;

#[derive(Default)]
struct Table {
    slots: HashMap<RequestKind, oneshot::Sender<Outcome>>,
    orphaned: Vec<(RequestKind, oneshot::Sender<Outcome>)>,
    closed: bool,
}

/// Single-flight-per-kind table of outstanding requests
#[derive(Default)]
pub struct PendingRequests {
    table: Mutex<Table>,
}

impl PendingRequests {
    /// Create an empty, open table
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new waiter under `kind`, displacing any earlier one.
    ///
    /// On a closed table the waiter is handed back already failed with
    /// [`ProtocolError::ConnectionClosed`].
    pub fn register(&self, kind: RequestKind) -> Waiter {
        let (tx, rx) = oneshot::channel();
        let mut table = self.table();
        if table.closed {
            let _ = tx.send(Err(ProtocolError::ConnectionClosed));
            return rx;
        }

        table.orphaned.retain(|(_, waiter)| !waiter.is_closed());
        if let Some(previous) = table.slots.insert(kind, tx) {
            // A waiter whose caller already gave up is just dropped
            if !previous.is_closed() {
                warn!(
                    "{} request replaced while one was in flight; earlier caller will not resume",
                    kind
                );
                table.orphaned.push((kind, previous));
            }
        }
        rx
    }

    /// Remove the waiter under `kind` and resolve it with `outcome`.
    ///
    /// Returns `true` if a live waiter received the outcome. An empty slot
    /// or a caller that stopped waiting is a silent no-op.
    pub fn take_and_resolve(&self, kind: RequestKind, outcome: Outcome) -> bool {
        let Some(tx) = self.table().slots.remove(&kind) else {
            return false;
        };
        if tx.is_closed() {
            return false;
        }
        tx.send(outcome).is_ok()
    }

    /// Whether a live waiter is registered under `kind`
    pub fn is_pending(&self, kind: RequestKind) -> bool {
        self.table()
            .slots
            .get(&kind)
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Number of live registered waiters
    pub fn len(&self) -> usize {
        self.table().slots.values().filter(|tx| !tx.is_closed()).count()
    }

    /// Whether no live waiter is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of displaced waiters still held
    pub fn orphaned(&self) -> usize {
        self.table().orphaned.len()
    }

    /// Fail every registered and displaced waiter with
    /// [`ProtocolError::ConnectionClosed`] and close the table. Returns how
    /// many callers were woken.
    pub fn fail_all(&self) -> usize {
        let (slots, orphaned) = {
            let mut table = self.table();
            table.closed = true;
            (
                std::mem::take(&mut table.slots),
                std::mem::take(&mut table.orphaned),
            )
        };

        slots
            .into_values()
            .chain(orphaned.into_iter().map(|(_, tx)| tx))
            .filter(|tx| !tx.is_closed())
            .map(|tx| tx.send(Err(ProtocolError::ConnectionClosed)))
            .filter(Result::is_ok)
            .count()
    }

    /// Accept registrations again after [`fail_all`](Self::fail_all)
    pub fn reopen(&self) {
        self.table().closed = false;
    }

    /// Whether the table refuses new waiters
    pub fn is_closed(&self) -> bool {
        self.table().closed
    }
}

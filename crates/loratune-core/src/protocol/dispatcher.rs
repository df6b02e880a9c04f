//! Reply dispatcher
//!
//! Routes each decoded inbound message to the waiter registered for the
//! request it answers. The pending table is the only state; there is no
//! retry and no sequencing beyond "most recent waiter per kind wins".
//!
//! | Reply                      | Resolves      | With                   |
//! |----------------------------|---------------|------------------------|
//! | `CONFIG_GET`               | `CONFIG_GET`  | `Action` from params   |
//! | `PING_ACK`                 | `PING`        | `Some(State)`          |
//! | `PING_NO_ACK`              | `PING`        | `None`                 |
//! | `CONFIG_SYNC_CHECK_ACK`    | `CONFIG_SYNC` | `Some(true)`           |
//! | `CONFIG_SYNC_CHECK_NO_ACK` | `CONFIG_SYNC` | `Some(false)`          |
//! | `CONFIG_SYNC_NO_ACK`       | `CONFIG_SYNC` | `Some(false)` + warning|
//! | `CONFIG_SYNC_ACK_NO_ACK`   | `CONFIG_SYNC` | `None` + warning       |

use std::sync::Arc;
use tracing::{debug, warn};

use super::{
    decode, to_action, to_state, PendingRequests, Reply, ReplyKind, SentHistory, WireMessage,
};

/// Protocol state machine fed by the reader thread
#[derive(Clone)]
pub struct Dispatcher {
    pending: Arc<PendingRequests>,
    history: Arc<SentHistory>,
}

impl Dispatcher {
    /// Dispatcher resolving waiters in `pending`, quoting `history` in
    /// diagnostics
    pub fn new(pending: Arc<PendingRequests>, history: Arc<SentHistory>) -> Self {
        Self { pending, history }
    }

    /// Decode and dispatch one raw line. Malformed lines are logged and
    /// skipped. Returns `true` if a waiter was resolved.
    pub fn handle_line(&self, line: &str) -> bool {
        match decode(line) {
            Ok(message) => self.dispatch(&message),
            Err(e) => {
                warn!("Discarding line '{}': {}", line, e);
                false
            }
        }
    }

    /// Dispatch a decoded message. Returns `true` if a waiter was resolved.
    pub fn dispatch(&self, message: &WireMessage) -> bool {
        let Some(kind) = ReplyKind::parse(&message.command) else {
            warn!("Unknown command {}", message.command);
            return false;
        };

        let reply = match kind {
            ReplyKind::ConfigGet => Reply::Config(to_action(&message.params)),
            ReplyKind::PingAck => Reply::Ping(Some(to_state(&message.params))),
            ReplyKind::PingNoAck => Reply::Ping(None),
            ReplyKind::ConfigSyncCheckAck => {
                let state = to_state(&message.params);
                debug!(?state, "Sync check acknowledged");
                Reply::Sync(Some(true))
            }
            ReplyKind::ConfigSyncCheckNoAck | ReplyKind::ConfigSyncNoAck => {
                Reply::Sync(Some(false))
            }
            ReplyKind::ConfigSyncAckNoAck => Reply::Sync(None),
        };

        let resolved = self.pending.take_and_resolve(kind.request_kind(), Ok(reply));

        if resolved
            && matches!(
                kind,
                ReplyKind::ConfigSyncNoAck | ReplyKind::ConfigSyncAckNoAck
            )
        {
            warn!(
                "Cannot sync ({}), last sent command: {}",
                kind,
                self.history.last().as_deref().unwrap_or("<none>")
            );
        }

        resolved
    }

    /// Fail every outstanding waiter once the transport is gone
    pub fn fail_pending(&self) -> usize {
        self.pending.fail_all()
    }
}

//! Protocol commands
//!
//! Outbound request kinds and the inbound reply kinds the firmware answers
//! with. The `_ACK` / `_NO_ACK` suffix tells whether the radio link itself
//! was acknowledged by the far end.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Requests the host can issue. Each kind owns one slot in the
/// pending-request table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    /// Read the radio's current tuning (`CONFIG_GET`)
    ConfigGet,

    /// Measure the link to a peer (`PING`)
    Ping,

    /// Push a tuning to a peer and verify it (`CONFIG_SYNC`)
    ConfigSync,
}

impl RequestKind {
    /// All request kinds, in table order
    pub const ALL: [RequestKind; 3] = [
        RequestKind::ConfigGet,
        RequestKind::Ping,
        RequestKind::ConfigSync,
    ];

    /// Command token written on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::ConfigGet => "CONFIG_GET",
            RequestKind::Ping => "PING",
            RequestKind::ConfigSync => "CONFIG_SYNC",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replies the firmware sends back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplyKind {
    /// Current tuning (`CONFIG_GET`)
    ConfigGet,

    /// Ping answered, carries link measurements (`PING_ACK`)
    PingAck,

    /// Ping went unanswered (`PING_NO_ACK`)
    PingNoAck,

    /// Peer confirmed the new tuning (`CONFIG_SYNC_CHECK_ACK`)
    ConfigSyncCheckAck,

    /// Peer switched but the check round failed (`CONFIG_SYNC_CHECK_NO_ACK`)
    ConfigSyncCheckNoAck,

    /// Peer never received the sync (`CONFIG_SYNC_NO_ACK`)
    ConfigSyncNoAck,

    /// Peer received the sync but its ack was lost (`CONFIG_SYNC_ACK_NO_ACK`)
    ConfigSyncAckNoAck,
}

impl ReplyKind {
    /// Parse a wire command token. Returns `None` for unknown commands.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "CONFIG_GET" => Some(ReplyKind::ConfigGet),
            "PING_ACK" => Some(ReplyKind::PingAck),
            "PING_NO_ACK" => Some(ReplyKind::PingNoAck),
            "CONFIG_SYNC_CHECK_ACK" => Some(ReplyKind::ConfigSyncCheckAck),
            "CONFIG_SYNC_CHECK_NO_ACK" => Some(ReplyKind::ConfigSyncCheckNoAck),
            "CONFIG_SYNC_NO_ACK" => Some(ReplyKind::ConfigSyncNoAck),
            "CONFIG_SYNC_ACK_NO_ACK" => Some(ReplyKind::ConfigSyncAckNoAck),
            _ => None,
        }
    }

    /// Command token as it appears on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyKind::ConfigGet => "CONFIG_GET",
            ReplyKind::PingAck => "PING_ACK",
            ReplyKind::PingNoAck => "PING_NO_ACK",
            ReplyKind::ConfigSyncCheckAck => "CONFIG_SYNC_CHECK_ACK",
            ReplyKind::ConfigSyncCheckNoAck => "CONFIG_SYNC_CHECK_NO_ACK",
            ReplyKind::ConfigSyncNoAck => "CONFIG_SYNC_NO_ACK",
            ReplyKind::ConfigSyncAckNoAck => "CONFIG_SYNC_ACK_NO_ACK",
        }
    }

    /// The request this reply answers
    pub fn request_kind(&self) -> RequestKind {
        match self {
            ReplyKind::ConfigGet => RequestKind::ConfigGet,
            ReplyKind::PingAck | ReplyKind::PingNoAck => RequestKind::Ping,
            ReplyKind::ConfigSyncCheckAck
            | ReplyKind::ConfigSyncCheckNoAck
            | ReplyKind::ConfigSyncNoAck
            | ReplyKind::ConfigSyncAckNoAck => RequestKind::ConfigSync,
        }
    }
}

impl fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_tokens() {
        assert_eq!(RequestKind::ConfigGet.as_str(), "CONFIG_GET");
        assert_eq!(RequestKind::Ping.as_str(), "PING");
        assert_eq!(RequestKind::ConfigSync.to_string(), "CONFIG_SYNC");
    }

    #[test]
    fn test_reply_parse() {
        assert_eq!(ReplyKind::parse("PING_ACK"), Some(ReplyKind::PingAck));
        assert_eq!(
            ReplyKind::parse("CONFIG_SYNC_ACK_NO_ACK"),
            Some(ReplyKind::ConfigSyncAckNoAck)
        );
        assert_eq!(ReplyKind::parse("FOO_BAR"), None);
        assert_eq!(ReplyKind::parse("ping_ack"), None);
        // PING is a request, never a reply
        assert_eq!(ReplyKind::parse("PING"), None);
    }

    #[test]
    fn test_reply_routes_to_request() {
        assert_eq!(ReplyKind::ConfigGet.request_kind(), RequestKind::ConfigGet);
        assert_eq!(ReplyKind::PingNoAck.request_kind(), RequestKind::Ping);
        assert_eq!(
            ReplyKind::ConfigSyncCheckNoAck.request_kind(),
            RequestKind::ConfigSync
        );
    }

    #[test]
    fn test_reply_tokens_parse_back() {
        for token in [
            "CONFIG_GET",
            "PING_ACK",
            "PING_NO_ACK",
            "CONFIG_SYNC_CHECK_ACK",
            "CONFIG_SYNC_CHECK_NO_ACK",
            "CONFIG_SYNC_NO_ACK",
            "CONFIG_SYNC_ACK_NO_ACK",
        ] {
            let kind = ReplyKind::parse(token).unwrap();
            assert_eq!(kind.as_str(), token);
        }
    }
}

//! # LoraTune Core Library
//!
//! Host-side control of a LoRa tuning radio over a serial link.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - The line-oriented ASCII wire codec spoken by the tuning firmware
//! - Typed tuning ([`radio::Action`]) and measurement ([`radio::State`]) records
//! - A background reader that correlates replies with outstanding requests
//! - Async request operations: `config_get`, `ping`, `config_sync`
//!
//! Only one request per command kind may be outstanding at a time; a second
//! request of the same kind displaces the first.
//!
//! ## Example
//!
//! ```rust,ignore
//! use loratune_core::protocol::{Connection, ConnectionConfig};
//!
//! let mut conn = Connection::new(ConnectionConfig::with_port_filter("/dev/ttyUSB"));
//! conn.open()?;
//!
//! let action = conn.config_get().await?;
//! if let Some(state) = conn.ping(1).await? {
//!     println!("RSSI: {}", state.rssi);
//! }
//! conn.config_sync(1, &action).await?;
//! conn.close();
//! ```

pub mod protocol;
pub mod radio;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::protocol::{
        Connection, ConnectionConfig, ConnectionState, ProtocolError, RequestKind,
    };
    pub use crate::radio::{Action, State};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Serial Protocol Communication
//!
//! Implements the line-oriented ASCII protocol spoken by the LoRa tuning
//! firmware: `COMMAND;KEY=VALUE,KEY=VALUE` terminated by CRLF.
//!
//! A background reader thread owns the receive half of the port and routes
//! every reply to the caller waiting on the matching command kind.

pub mod commands;
mod connection;
mod dispatcher;
mod error;
mod history;
pub mod mapper;
pub mod message;
mod pending;
mod reader;
pub mod serial;
pub mod stream;

pub use commands::{ReplyKind, RequestKind};
pub use connection::{Connection, ConnectionConfig, ConnectionState};
pub use dispatcher::Dispatcher;
pub use error::{DecodeError, ProtocolError};
pub use history::SentHistory;
pub use mapper::{to_action, to_state};
pub use message::{decode, encode, Value, WireMessage};
pub use pending::{Outcome, PendingRequests, Reply, Waiter};
pub use reader::{spawn_reader, ReaderHandle};
pub use serial::{
    clear_buffers, configure_port, find_port, list_ports, open_port, select_port, PortInfo,
};
pub use stream::{CommunicationChannel, LineReader, SerialChannel};

/// Default baud rate of the tuning firmware
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default per-read timeout of the reader thread in milliseconds.
/// Also bounds how long the reader takes to notice a stop request.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Default time to wait for the reader thread to exit on close
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 2000;

/// Longest line accepted from the device before the buffer is discarded
pub const MAX_LINE_LENGTH: usize = 1024;

/// Line terminator used on the wire
pub const LINE_TERMINATOR: &str = "\r\n";

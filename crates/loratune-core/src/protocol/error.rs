//! Protocol errors

use thiserror::Error;

/// Errors that can occur during protocol communication
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The serial port could not be opened or configured
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// No port matched the configured filter
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// A request was made with no open connection
    #[error("Not connected to device")]
    NotConnected,

    /// `open` was called on a live connection
    #[error("Already connected")]
    AlreadyConnected,

    /// The transport went away while the request was waiting
    #[error("Connection closed before a reply arrived")]
    ConnectionClosed,

    /// No reply within the configured request timeout
    #[error("Request timeout")]
    Timeout,

    /// I/O error on the channel
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors produced while decoding a single inbound line.
///
/// A decode error only ever affects the line it came from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Empty line, or nothing before the `;`
    #[error("line carries no command")]
    MissingCommand,

    /// A parameter without `=`
    #[error("malformed parameter '{pair}' in {command} (expected KEY=VALUE)")]
    MalformedPair {
        /// Command of the offending line
        command: String,
        /// The pair as received
        pair: String,
    },
}

impl DecodeError {
    /// The command kind the offending line was attributed to, if any
    pub fn command(&self) -> Option<&str> {
        match self {
            DecodeError::MissingCommand => None,
            DecodeError::MalformedPair { command, .. } => Some(command),
        }
    }
}

//! Connection management
//!
//! Handles the connection lifecycle and the request/response exchange with
//! the tuning radio.
//!
//! Every request follows the same shape: register a waiter under the
//! request's kind, write the command, then suspend until the reader thread
//! resolves that waiter. Requests of different kinds may be in flight at the
//! same time. Two requests of the same kind may not: the second displaces
//! the first, whose caller then only resumes when the connection closes.
//!
//! Each request kind's slot is only ever resolved with that kind's [`Reply`]
//! variant, so the unpacking in the request methods cannot miss.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn, Span};

use super::{
    clear_buffers, configure_port, find_port, list_ports, open_port, spawn_reader,
    CommunicationChannel, Dispatcher, PendingRequests, PortInfo, ProtocolError, ReaderHandle,
    Reply, RequestKind, SentHistory, SerialChannel, WireMessage, DEFAULT_BAUD_RATE,
    DEFAULT_READ_TIMEOUT_MS, DEFAULT_SHUTDOWN_TIMEOUT_MS, LINE_TERMINATOR,
};
use crate::radio::{Action, State};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Connected and reading
    Connected,
    /// The reader stopped because the transport failed
    Error,
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Port name prefix; the first matching port is used. Empty matches any.
    pub port_filter: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Per-read timeout of the reader thread in milliseconds
    pub read_timeout_ms: u64,
    /// How long `close` waits for the reader thread in milliseconds
    pub shutdown_timeout_ms: u64,
    /// Optional limit on how long a request waits for its reply.
    /// `None` waits until the reply arrives or the connection closes.
    pub request_timeout_ms: Option<u64>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port_filter: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
            request_timeout_ms: None,
        }
    }
}

impl ConnectionConfig {
    /// Configuration selecting ports by name prefix
    pub fn with_port_filter(filter: impl Into<String>) -> Self {
        Self {
            port_filter: filter.into(),
            ..Self::default()
        }
    }

    fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Connection to a LoRa tuning radio
pub struct Connection {
    /// Connection configuration
    config: ConnectionConfig,
    /// Name of the open port
    port_name: Option<String>,
    /// Write half of the channel
    writer: Mutex<Option<Box<dyn CommunicationChannel>>>,
    /// Background reader owning the read half
    reader: Option<ReaderHandle>,
    /// Outstanding requests, shared with the reader
    pending: Arc<PendingRequests>,
    /// Lines written so far
    history: Arc<SentHistory>,
    /// Logging context for this connection
    span: Span,
}

impl Connection {
    /// Create a new connection (not yet connected)
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            port_name: None,
            writer: Mutex::new(None),
            reader: None,
            pending: Arc::new(PendingRequests::new()),
            history: Arc::new(SentHistory::new()),
            span: Span::none(),
        }
    }

    /// List available serial ports
    pub fn list_ports() -> Vec<PortInfo> {
        list_ports()
    }

    /// Configuration this connection was created with
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Name of the open port, if any
    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        match &self.reader {
            Some(reader) if reader.has_failed() => ConnectionState::Error,
            Some(reader) if reader.is_running() => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }

    /// Whether the reader is running on an open channel
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Find the first port matching the configured filter, open it and
    /// start listening
    pub fn open(&mut self) -> Result<(), ProtocolError> {
        if self.is_connected() {
            return Err(ProtocolError::AlreadyConnected);
        }

        let filter = &self.config.port_filter;
        let name = find_port(filter).ok_or_else(|| {
            ProtocolError::PortNotFound(if filter.is_empty() {
                "no serial ports available".to_string()
            } else {
                format!("no port matching '{}'", filter)
            })
        })?;

        let mut port = open_port(
            &name,
            Some(self.config.baud_rate),
            Some(self.config.read_timeout()),
        )?;
        configure_port(port.as_mut())?;
        if let Err(e) = clear_buffers(port.as_mut()) {
            warn!("Could not clear buffers on {}: {}", name, e);
        }

        self.open_channel(&name, Box::new(SerialChannel::new(port)))
    }

    /// Start listening on an already-open channel
    pub fn open_channel(
        &mut self,
        name: &str,
        mut channel: Box<dyn CommunicationChannel>,
    ) -> Result<(), ProtocolError> {
        if self.is_connected() {
            return Err(ProtocolError::AlreadyConnected);
        }
        // Tear down whatever a failed reader left behind
        self.close();

        channel.set_timeout(self.config.read_timeout())?;
        if let Err(e) = channel.clear_input_buffer() {
            debug!("Could not discard stale input: {}", e);
        }
        let receive = channel.try_clone()?;

        self.pending.reopen();
        let span = info_span!("lora_connection", port = %name);
        let dispatcher = Dispatcher::new(self.pending.clone(), self.history.clone());
        let reader = spawn_reader(receive, dispatcher, span.clone())?;

        *self.writer() = Some(channel);
        self.reader = Some(reader);
        self.port_name = Some(name.to_string());
        info!(parent: &span, "Listening thread started on {}", name);
        self.span = span;

        Ok(())
    }

    /// Stop the reader, close the port and fail any request still waiting.
    /// Safe to call more than once.
    pub fn close(&mut self) {
        let _entered = self.span.enter();

        self.writer().take();
        if let Some(reader) = self.reader.take() {
            reader.stop(Duration::from_millis(self.config.shutdown_timeout_ms));
        }

        let woken = self.pending.fail_all();
        if woken > 0 {
            warn!("{} pending request(s) failed: connection closed", woken);
        }
        self.port_name = None;
    }

    /// Read the radio's current tuning
    pub async fn config_get(&self) -> Result<Action, ProtocolError> {
        let message = WireMessage::new(RequestKind::ConfigGet.as_str());
        match self.request(RequestKind::ConfigGet, message).await? {
            Reply::Config(action) => Ok(action),
            _ => unreachable!("CONFIG_GET resolved with another reply"),
        }
    }

    /// Ping peer `id`. `None` means the peer did not acknowledge.
    pub async fn ping(&self, id: i64) -> Result<Option<State>, ProtocolError> {
        let message = WireMessage::new(RequestKind::Ping.as_str()).with_param("ID", id);
        match self.request(RequestKind::Ping, message).await? {
            Reply::Ping(state) => Ok(state),
            _ => unreachable!("PING resolved with another reply"),
        }
    }

    /// Push `action` to peer `id` and verify it.
    ///
    /// `Some(true)` when the peer confirmed, `Some(false)` when it did not,
    /// `None` when the peer took the tuning but its acknowledgement was lost.
    pub async fn config_sync(
        &self,
        id: i64,
        action: &Action,
    ) -> Result<Option<bool>, ProtocolError> {
        let mut message =
            WireMessage::new(RequestKind::ConfigSync.as_str()).with_param("ID", id);
        for (key, value) in action.params() {
            message = message.with_param(key, value);
        }
        match self.request(RequestKind::ConfigSync, message).await? {
            Reply::Sync(result) => Ok(result),
            _ => unreachable!("CONFIG_SYNC resolved with another reply"),
        }
    }

    /// Whether a request of `kind` is waiting for its reply
    pub fn is_pending(&self, kind: RequestKind) -> bool {
        self.pending.is_pending(kind)
    }

    /// Every line written so far, oldest first
    pub fn sent_history(&self) -> Vec<String> {
        self.history.snapshot()
    }

    /// Most recently written line
    pub fn last_sent(&self) -> Option<String> {
        self.history.last()
    }

    async fn request(
        &self,
        kind: RequestKind,
        message: WireMessage,
    ) -> Result<Reply, ProtocolError> {
        if !self.is_connected() {
            return Err(ProtocolError::NotConnected);
        }

        let waiter = self.pending.register(kind);
        // A failed write drops the waiter, which frees the slot
        self.write_line(&message.encode())?;

        let received = match self.config.request_timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), waiter)
                .await
                .map_err(|_| ProtocolError::Timeout)?,
            None => waiter.await,
        };

        received.map_err(|_| ProtocolError::ConnectionClosed)?
    }

    fn write_line(&self, line: &str) -> Result<(), ProtocolError> {
        let _entered = self.span.enter();

        let mut writer = self.writer();
        let Some(channel) = writer.as_mut() else {
            warn!("Serial port is not open");
            return Err(ProtocolError::NotConnected);
        };

        let framed = format!("{}{}", line, LINE_TERMINATOR);
        if let Err(e) = channel
            .write_all(framed.as_bytes())
            .and_then(|_| channel.flush())
        {
            error!("Error writing to serial: {}", e);
            return Err(e.into());
        }

        self.history.push(line);
        debug!("-> {}", line);
        Ok(())
    }

    fn writer(&self) -> MutexGuard<'_, Option<Box<dyn CommunicationChannel>>> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::default();
        assert_eq!(config.port_filter, "");
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.read_timeout_ms, 1000);
        assert_eq!(config.shutdown_timeout_ms, 2000);
        assert_eq!(config.request_timeout_ms, None);
    }

    #[test]
    fn test_new_connection_is_disconnected() {
        let conn = Connection::new(ConnectionConfig::with_port_filter("/dev/ttyUSB"));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.port_name(), None);
        assert!(conn.sent_history().is_empty());
    }

    #[tokio::test]
    async fn test_request_requires_connection() {
        let conn = Connection::new(ConnectionConfig::default());
        assert!(matches!(
            conn.config_get().await,
            Err(ProtocolError::NotConnected)
        ));
        assert!(!conn.is_pending(RequestKind::ConfigGet));
        assert_eq!(conn.last_sent(), None);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut conn = Connection::new(ConnectionConfig::default());
        conn.close();
        conn.close();
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }
}

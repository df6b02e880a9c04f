//! Byte-stream transport
//!
//! [`CommunicationChannel`] abstracts the serial port so the reader thread
//! and the request side can each own a handle to the same device, and so
//! tests can substitute an in-memory device. [`LineReader`] turns the byte
//! stream into trimmed text lines.

use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::Duration;
use tracing::warn;

use super::MAX_LINE_LENGTH;

/// Abstraction for communication channels
pub trait CommunicationChannel: Read + Write + Send {
    /// Set timeout for read/write operations
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Discard any unread input
    fn clear_input_buffer(&mut self) -> io::Result<()>;

    /// Open a second handle to the same channel
    fn try_clone(&self) -> io::Result<Box<dyn CommunicationChannel>>;
}

/// Serial port wrapper implementing CommunicationChannel
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    /// Wrap an open serial port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl CommunicationChannel for SerialChannel {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.port.set_timeout(timeout).map_err(io::Error::other)
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::other)
    }

    fn try_clone(&self) -> io::Result<Box<dyn CommunicationChannel>> {
        let port_clone = self.port.try_clone().map_err(io::Error::other)?;
        Ok(Box::new(SerialChannel::new(port_clone)))
    }
}

/// Splits a byte stream into lines.
///
/// Lines end at `\n`; surrounding whitespace (including the `\r` of CRLF)
/// is trimmed and blank lines are skipped. Invalid UTF-8 is dropped.
pub struct LineReader<R> {
    inner: R,
    buffer: Vec<u8>,
    chunk: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    /// Read lines from `inner`
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: Vec::with_capacity(MAX_LINE_LENGTH),
            chunk: vec![0u8; 256],
        }
    }

    /// Read the next non-blank line.
    ///
    /// Returns `Ok(None)` when the underlying read times out before a full
    /// line is available; partial input is kept for the next call. End of
    /// stream is reported as [`io::ErrorKind::UnexpectedEof`].
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        loop {
            while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw)
                    .replace(char::REPLACEMENT_CHARACTER, "");
                let line = line.trim();
                if !line.is_empty() {
                    return Ok(Some(line.to_string()));
                }
            }

            match self.inner.read(&mut self.chunk) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "channel closed",
                    ))
                }
                Ok(n) => {
                    self.buffer.extend_from_slice(&self.chunk[..n]);
                    if self.buffer.len() > MAX_LINE_LENGTH && !self.buffer.contains(&b'\n') {
                        warn!(
                            "Discarding {} bytes received without a line terminator",
                            self.buffer.len()
                        );
                        self.buffer.clear();
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                    ) =>
                {
                    return Ok(None)
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays scripted read results
    struct Script(VecDeque<io::Result<Vec<u8>>>);

    impl Read for Script {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Ok(mut bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.0.push_front(Ok(bytes.split_off(n)));
                    }
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }
    }

    fn timeout() -> io::Result<Vec<u8>> {
        Err(io::Error::new(io::ErrorKind::TimedOut, "timeout"))
    }

    #[test]
    fn test_split_lines() {
        let script = Script(VecDeque::from(vec![
            Ok(b"PING_NO_ACK\r\nCONFIG_GET;FQ=8".to_vec()),
            Ok(b"68\r\n".to_vec()),
        ]));
        let mut reader = LineReader::new(script);
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("PING_NO_ACK"));
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("CONFIG_GET;FQ=868"));
    }

    #[test]
    fn test_timeout_keeps_partial_line() {
        let script = Script(VecDeque::from(vec![
            Ok(b"PING_".to_vec()),
            timeout(),
            Ok(b"ACK;RSSI=-1\n".to_vec()),
        ]));
        let mut reader = LineReader::new(script);
        assert_eq!(reader.read_line().unwrap(), None);
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("PING_ACK;RSSI=-1"));
    }

    #[test]
    fn test_blank_lines_and_invalid_utf8_skipped() {
        let script = Script(VecDeque::from(vec![Ok(
            b"\r\n  \r\nPI\xffNG\r\n".to_vec(),
        )]));
        let mut reader = LineReader::new(script);
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("PING"));
    }

    #[test]
    fn test_end_of_stream_is_error() {
        let mut reader = LineReader::new(Script(VecDeque::new()));
        let err = reader.read_line().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_overlong_garbage_discarded() {
        let script = Script(VecDeque::from(vec![
            Ok(vec![b'x'; MAX_LINE_LENGTH + 1]),
            Ok(b"yy\nPING_NO_ACK\n".to_vec()),
        ]));
        let mut reader = LineReader::new(script);
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("yy"));
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("PING_NO_ACK"));
    }
}

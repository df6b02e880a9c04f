//! Scripted in-memory radio for integration tests

#![allow(dead_code)]

use loratune_core::protocol::CommunicationChannel;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

type Responder = Box<dyn FnMut(&str) -> Vec<String> + Send>;

struct Shared {
    inbound_tx: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    inbound_rx: Mutex<mpsc::Receiver<Vec<u8>>>,
    written: Mutex<Vec<String>>,
    partial: Mutex<Vec<u8>>,
    responder: Mutex<Responder>,
    fail_on_send: AtomicBool,
}

/// Fake radio: records every line the host writes and answers through a
/// responder closure
#[derive(Clone)]
pub struct MockDevice {
    shared: Arc<Shared>,
}

impl MockDevice {
    pub fn new<F>(responder: F) -> Self
    where
        F: FnMut(&str) -> Vec<String> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        Self {
            shared: Arc::new(Shared {
                inbound_tx: Mutex::new(Some(tx)),
                inbound_rx: Mutex::new(rx),
                written: Mutex::new(Vec::new()),
                partial: Mutex::new(Vec::new()),
                responder: Mutex::new(Box::new(responder)),
                fail_on_send: AtomicBool::new(false),
            }),
        }
    }

    /// A device that never answers on its own
    pub fn silent() -> Self {
        Self::new(|_| Vec::new())
    }

    pub fn channel(&self) -> Box<dyn CommunicationChannel> {
        Box::new(MockChannel {
            device: self.clone(),
            timeout: Duration::from_millis(20),
            leftover: Vec::new(),
        })
    }

    /// Send a line to the host as if the radio emitted it
    pub fn push_line(&self, line: &str) {
        if let Some(tx) = self.shared.inbound_tx.lock().unwrap().as_ref() {
            let _ = tx.send(format!("{}\r\n", line).into_bytes());
        }
    }

    /// Lines the host has written, without terminators
    pub fn written(&self) -> Vec<String> {
        self.shared.written.lock().unwrap().clone()
    }

    /// Simulate the cable being pulled: reads see end of stream
    pub fn unplug(&self) {
        self.shared.inbound_tx.lock().unwrap().take();
    }

    pub fn fail_writes(&self) {
        self.shared.fail_on_send.store(true, Ordering::SeqCst);
    }

    fn receive_bytes(&self, bytes: &[u8]) {
        let mut partial = self.shared.partial.lock().unwrap();
        partial.extend_from_slice(bytes);
        while let Some(pos) = partial.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = partial.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            self.shared.written.lock().unwrap().push(line.clone());
            let replies = {
                let mut responder = self.shared.responder.lock().unwrap();
                (*responder)(&line)
            };
            for reply in replies {
                self.push_line(&reply);
            }
        }
    }
}

struct MockChannel {
    device: MockDevice,
    timeout: Duration,
    leftover: Vec<u8>,
}

impl Read for MockChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.leftover.is_empty() {
            let rx = self.device.shared.inbound_rx.lock().unwrap();
            match rx.recv_timeout(self.timeout) {
                Ok(bytes) => self.leftover = bytes,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"))
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => return Ok(0),
            }
        }
        let n = self.leftover.len().min(buf.len());
        buf[..n].copy_from_slice(&self.leftover[..n]);
        self.leftover.drain(..n);
        Ok(n)
    }
}

impl Write for MockChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.device.shared.fail_on_send.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "Serial write failed"));
        }
        self.device.receive_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CommunicationChannel for MockChannel {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.leftover.clear();
        Ok(())
    }

    fn try_clone(&self) -> io::Result<Box<dyn CommunicationChannel>> {
        Ok(Box::new(MockChannel {
            device: self.device.clone(),
            timeout: self.timeout,
            leftover: Vec::new(),
        }))
    }
}

/// Route library logs to the test harness (`RUST_LOG=debug` to see them)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory log sink for asserting on emitted diagnostics
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with every event on this thread written to the capture
    pub fn record<T>(&self, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

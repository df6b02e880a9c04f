//! Transport reader thread
//!
//! One dedicated thread blocks on the receive half of the channel and feeds
//! every complete line to the [`Dispatcher`]. It never writes and never runs
//! caller code; waiters are handed their results through oneshot channels,
//! which is safe across the thread/runtime boundary.
//!
//! The thread exits when the stop flag is raised (noticed at the next read
//! timeout) or when the channel fails. On exit the channel is dropped and
//! every waiter still pending is failed with `ConnectionClosed`.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn, Span};

use super::{Dispatcher, LineReader};

/// Handle to a running reader thread
pub struct ReaderHandle {
    stop: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    /// Whether the thread is still reading
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Whether the thread exited because the channel failed
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Ask the thread to exit and wait up to `timeout` for it.
    ///
    /// Returns `false` if the thread was still running when the wait ran
    /// out; it is then left to finish on its own.
    pub fn stop(mut self, timeout: Duration) -> bool {
        self.stop.store(true, Ordering::Release);
        let Some(thread) = self.thread.take() else {
            return true;
        };

        let deadline = Instant::now() + timeout;
        while !thread.is_finished() {
            if Instant::now() >= deadline {
                warn!("Reader thread did not exit within {:?}", timeout);
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }

        if thread.join().is_err() {
            error!("Reader thread panicked");
        }
        true
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

/// Spawn the reader thread over `channel`.
///
/// `span` is entered by the thread so its log lines carry the connection's
/// context.
pub fn spawn_reader<R>(
    channel: R,
    dispatcher: Dispatcher,
    span: Span,
) -> std::io::Result<ReaderHandle>
where
    R: Read + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let failed = Arc::new(AtomicBool::new(false));

    let thread = {
        let stop = stop.clone();
        let failed = failed.clone();
        thread::Builder::new()
            .name("lora-reader".to_string())
            .spawn(move || {
                let _entered = span.enter();
                read_loop(LineReader::new(channel), &dispatcher, &stop, &failed);
            })?
    };

    Ok(ReaderHandle {
        stop,
        failed,
        thread: Some(thread),
    })
}

fn read_loop<R: Read>(
    mut lines: LineReader<R>,
    dispatcher: &Dispatcher,
    stop: &AtomicBool,
    failed: &AtomicBool,
) {
    info!("Listener started");

    while !stop.load(Ordering::Acquire) {
        match lines.read_line() {
            Ok(Some(line)) => {
                debug!("<- {}", line);
                dispatcher.handle_line(&line);
            }
            Ok(None) => {}
            Err(e) => {
                if !stop.load(Ordering::Acquire) {
                    error!("Error reading serial: {}", e);
                    failed.store(true, Ordering::Release);
                }
                break;
            }
        }
    }

    drop(lines);
    info!("Serial connection closed");

    let woken = dispatcher.fail_pending();
    if woken > 0 {
        warn!("{} pending request(s) failed: connection closed", woken);
    }
    info!("Listener stopped");
}

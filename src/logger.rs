//! Tails the market data bus as an ordinary registered consumer and appends
//! raw event bytes to disk. Deliberately does *not* reach behind the bus
//! through a raw pointer into ring storage — it reads only through the same
//! barrier/poll API every other consumer uses.

use std::fs::{ File, OpenOptions };
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{ AtomicU64, Ordering };
use std::time::{ Duration, Instant };

use tracing::error;

use crate::constants::{ LOGGER_BUFFER_SIZE, LOGGER_FLUSH_INTERVAL_MS, LOGGER_POLL_SLEEP_US };
use crate::market_data_bus::MarketDataBus;

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggerWorkerStats {
    pub event_count: u64,
    pub flush_count: u64,
    /// Set once if the log file could not be opened; the worker disables
    /// itself rather than bringing down the engine.
    pub disabled: bool,
}

/// Cloneable handle onto a running logger worker's counters, taken before
/// the worker is moved onto its pinned thread. `disabled` is not exposed
/// here since a handle may outlive the worker's own disable check; query
/// `LoggerWorker::stats` directly from the owning thread if that matters.
#[derive(Clone)]
pub struct LoggerWorkerHandle {
    event_count: Arc<AtomicU64>,
    flush_count: Arc<AtomicU64>,
}

impl LoggerWorkerHandle {
    pub fn snapshot(&self) -> LoggerWorkerStats {
        LoggerWorkerStats {
            event_count: self.event_count.load(Ordering::Relaxed),
            flush_count: self.flush_count.load(Ordering::Relaxed),
            disabled: false,
        }
    }
}

/// Pinned consumer that buffers raw `MarketEvent` bytes and flushes them to
/// a file at a half-full-or-timer cadence.
pub struct LoggerWorker<const RING_N: usize> {
    consumer_id: usize,
    bus: Arc<MarketDataBus<RING_N>>,
    file: Option<File>,
    buffer: Vec<u8>,
    last_flush: Instant,
    event_count: Arc<AtomicU64>,
    flush_count: Arc<AtomicU64>,
    disabled: bool,
}

impl<const RING_N: usize> LoggerWorker<RING_N> {
    pub fn new(consumer_id: usize, bus: Arc<MarketDataBus<RING_N>>, log_file_path: &Path) -> Self {
        let file = match OpenOptions::new().create(true).append(true).open(log_file_path) {
            Ok(f) => Some(f),
            Err(err) => {
                error!(path = %log_file_path.display(), error = %err, "logger could not open log file, disabling");
                None
            }
        };
        let disabled = file.is_none();

        Self {
            consumer_id,
            bus,
            file,
            buffer: Vec::with_capacity(LOGGER_BUFFER_SIZE),
            last_flush: Instant::now(),
            event_count: Arc::new(AtomicU64::new(0)),
            flush_count: Arc::new(AtomicU64::new(0)),
            disabled,
        }
    }

    /// Clone a handle onto this worker's counters, to read after the worker
    /// itself has been moved onto its pinned thread.
    pub fn handle(&self) -> LoggerWorkerHandle {
        LoggerWorkerHandle {
            event_count: self.event_count.clone(),
            flush_count: self.flush_count.clone(),
        }
    }

    pub fn stats(&self) -> LoggerWorkerStats {
        LoggerWorkerStats {
            event_count: self.event_count.load(Ordering::Relaxed),
            flush_count: self.flush_count.load(Ordering::Relaxed),
            disabled: self.disabled,
        }
    }

    fn should_flush(&self) -> bool {
        self.buffer.len() >= LOGGER_BUFFER_SIZE / 2 ||
            self.last_flush.elapsed() >= Duration::from_millis(LOGGER_FLUSH_INTERVAL_MS)
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        if let Some(file) = self.file.as_mut() {
            if let Err(err) = file.write_all(&self.buffer) {
                error!(error = %err, "logger flush failed");
            } else {
                self.flush_count.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.buffer.clear();
        self.last_flush = Instant::now();
    }

    /// One loop iteration: drain what's available on the bus, buffer it,
    /// flush if due. Returns `false` once disabled, so the caller's pinned
    /// loop can stop scheduling this worker.
    pub fn run_once(&mut self) -> bool {
        if self.disabled {
            return false;
        }

        let consumer_id = self.consumer_id;
        let event_count = &self.event_count;
        let buffer = &mut self.buffer;
        let dispatched = self.bus.poll(consumer_id, |event| {
            event_count.fetch_add(1, Ordering::Relaxed);
            let bytes = unsafe {
                std::slice::from_raw_parts(
                    (event as *const crate::events::MarketEvent) as *const u8,
                    std::mem::size_of::<crate::events::MarketEvent>()
                )
            };
            buffer.extend_from_slice(bytes);
        });

        if self.should_flush() {
            self.flush();
        }

        if dispatched == 0 {
            std::thread::sleep(Duration::from_micros(LOGGER_POLL_SLEEP_US));
        }
        true
    }
}

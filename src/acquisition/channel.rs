// src/acquisition/channel.rs
//! Serial acquisition channel
//!
//! Owns one device connection and a background read thread. The thread is the
//! only place device I/O happens; everything else reads the shared
//! [`LatestSlot`] through [`AcquisitionChannel::latest`], which never blocks on
//! the device.

use crate::acquisition::slot::LatestSlot;
use crate::acquisition::source::{SampleSource, SampleStream};
use crate::config::constants::acquisition::*;
use crate::error::{GloveError, GloveResult};
use crate::hal::frame::{decode_line, parse_frame, FrameError};
use crate::hal::serial_driver::{SerialConfig, SerialConnector};
use crate::hal::traits::{DeviceConnector, LineStream};
use crate::hal::SensorSample;
use crossbeam::channel::{bounded, Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, ErrorKind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Acquisition thread settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AcquisitionSettings {
    /// How long `stop()` waits for the read thread before detaching it
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

fn default_stop_timeout_ms() -> u64 {
    DEFAULT_STOP_TIMEOUT_MS
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

/// Snapshot of read-loop counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AcquisitionStats {
    pub frames_accepted: u64,
    pub frames_rejected: u64,
    pub read_errors: u64,
    pub running: bool,
}

#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicU64,
    rejected: AtomicU64,
    read_errors: AtomicU64,
}

/// Open device, shared between the read thread and `stop()`
type DeviceHandle = Arc<Mutex<Option<LineStream>>>;

struct Worker {
    running: Arc<AtomicBool>,
    device: DeviceHandle,
    handle: JoinHandle<()>,
    exited: Receiver<()>,
}

/// Background reader publishing the newest valid glove sample
pub struct AcquisitionChannel {
    connector: Arc<dyn DeviceConnector>,
    settings: AcquisitionSettings,
    slot: Arc<LatestSlot>,
    counters: Arc<Counters>,
    worker: Mutex<Option<Worker>>,
}

impl AcquisitionChannel {
    /// Channel over an arbitrary connector. Nothing is opened until `start()`.
    pub fn new(connector: Arc<dyn DeviceConnector>, settings: AcquisitionSettings) -> Self {
        Self {
            connector,
            settings,
            slot: Arc::new(LatestSlot::new()),
            counters: Arc::new(Counters::default()),
            worker: Mutex::new(None),
        }
    }

    /// Channel over the physical glove on a serial port
    pub fn serial(config: SerialConfig, settings: AcquisitionSettings) -> GloveResult<Self> {
        let connector = SerialConnector::new(config)?;
        Ok(Self::new(Arc::new(connector), settings))
    }

    /// Open the device and spawn the read thread.
    ///
    /// Open failures are returned as [`GloveError::DeviceOpen`] and not
    /// retried. Calling `start` on a running channel does nothing.
    pub fn start(&self) -> GloveResult<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            debug!(device = %self.connector.describe(), "acquisition already running");
            return Ok(());
        }

        let stream = self.connector.connect()?;
        let session = self.slot.begin_session();

        let running = Arc::new(AtomicBool::new(true));
        let device: DeviceHandle = Arc::new(Mutex::new(Some(stream)));
        let (exited_tx, exited_rx) = bounded(1);
        let handle = {
            let reader = Reader {
                running: running.clone(),
                device: device.clone(),
                slot: self.slot.clone(),
                counters: self.counters.clone(),
                session,
            };
            thread::Builder::new()
                .name(READER_THREAD_NAME.to_string())
                .spawn(move || {
                    reader.run();
                    let _ = exited_tx.send(());
                })
                .map_err(|e| GloveError::Worker(e.to_string()))?
        };

        info!(device = %self.connector.describe(), session, "acquisition started");
        *worker = Some(Worker {
            running,
            device,
            handle,
            exited: exited_rx,
        });
        Ok(())
    }

    /// Stop the read thread and release the device.
    ///
    /// Waits at most `stop_timeout_ms` for the thread to acknowledge. After
    /// that the device is closed here unless a read is still in progress, in
    /// which case the detached thread closes it as soon as that read returns.
    /// Samples read after `stop` are never published. Safe to call repeatedly
    /// and after a failed `start`.
    pub fn stop(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };

        worker.running.store(false, Ordering::Release);
        self.slot.end_session();
        let timeout = Duration::from_millis(self.settings.stop_timeout_ms);
        match worker.exited.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if worker.handle.join().is_err() {
                    warn!("acquisition thread panicked");
                }
            }
            Err(RecvTimeoutError::Timeout) => match worker.device.try_lock() {
                Some(mut device) => {
                    device.take();
                    warn!(
                        timeout_ms = self.settings.stop_timeout_ms,
                        "acquisition thread did not stop in time, device closed and thread detached"
                    );
                }
                None => warn!(
                    timeout_ms = self.settings.stop_timeout_ms,
                    "acquisition thread blocked in a read, device closes when it returns"
                ),
            },
        }
        info!(device = %self.connector.describe(), "acquisition stopped");
    }

    /// Newest valid sample since the last `start`, without blocking
    pub fn latest(&self) -> Option<SensorSample> {
        self.slot.get()
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    pub fn stats(&self) -> AcquisitionStats {
        AcquisitionStats {
            frames_accepted: self.counters.accepted.load(Ordering::Relaxed),
            frames_rejected: self.counters.rejected.load(Ordering::Relaxed),
            read_errors: self.counters.read_errors.load(Ordering::Relaxed),
            running: self.is_running(),
        }
    }

    pub fn describe(&self) -> String {
        self.connector.describe()
    }
}

impl Drop for AcquisitionChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

impl SampleSource for AcquisitionChannel {
    fn latest(&self) -> Option<SensorSample> {
        AcquisitionChannel::latest(self)
    }
}

impl SampleStream for AcquisitionChannel {
    fn start(&self) -> GloveResult<()> {
        AcquisitionChannel::start(self)
    }

    fn stop(&self) {
        AcquisitionChannel::stop(self)
    }
}

/// State moved into the read thread
struct Reader {
    running: Arc<AtomicBool>,
    device: DeviceHandle,
    slot: Arc<LatestSlot>,
    counters: Arc<Counters>,
    session: u64,
}

impl Reader {
    fn run(self) {
        let mut line = Vec::with_capacity(MAX_LINE_BYTES);
        let mut consecutive_errors = 0u32;

        while self.running.load(Ordering::Acquire) {
            let result = {
                let mut device = self.device.lock();
                let Some(stream) = device.as_mut() else {
                    break;
                };
                stream.read_until(b'\n', &mut line)
            };

            match result {
                Ok(0) => {
                    // End of stream; keep polling until told to stop
                    thread::sleep(Duration::from_millis(IDLE_SLEEP_MS));
                }
                Ok(_) => {
                    consecutive_errors = 0;
                    self.handle_line(&line);
                    line.clear();
                }
                Err(e) => match e.kind() {
                    // Partial bytes stay in `line` and are completed by the next read
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted => {}
                    ErrorKind::InvalidData => {
                        self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                        debug!(error = %e, "dropping undecodable line");
                        line.clear();
                    }
                    kind => {
                        consecutive_errors += 1;
                        self.counters.read_errors.fetch_add(1, Ordering::Relaxed);
                        if consecutive_errors == 1 {
                            warn!(?kind, error = %e, "serial read failed");
                        } else {
                            debug!(?kind, consecutive_errors, "serial read still failing");
                        }
                        line.clear();
                        thread::sleep(Duration::from_millis(ERROR_BACKOFF_MS));
                    }
                },
            }

            if line.len() > MAX_LINE_BYTES {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                debug!(bytes = line.len(), "dropping oversized line");
                line.clear();
            }
        }

        self.device.lock().take();
        debug!(session = self.session, "read thread exiting");
    }

    fn handle_line(&self, raw: &[u8]) {
        let text = decode_line(raw);
        match parse_frame(&text) {
            Ok(sample) => {
                if self.slot.publish_in(self.session, sample) {
                    self.counters.accepted.fetch_add(1, Ordering::Relaxed);
                } else {
                    trace!(session = self.session, "dropping sample read after stop");
                }
            }
            Err(FrameError::Empty) => {}
            Err(FrameError::Header) => trace!("skipping header line"),
            Err(reason) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                debug!(%reason, line = %text.trim(), "dropping malformed frame");
            }
        }
    }
}

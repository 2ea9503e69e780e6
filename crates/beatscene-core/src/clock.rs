//! Stream Clock - fixed-period tick source
//!
//! A dedicated thread emits one [`ClockSignal`] per interval to the registered
//! [`ClockListener`]. The listener is called synchronously on that thread, so it
//! must return quickly and tolerate being called at the tick rate.
//!
//! `stop()` joins the thread: once it returns, no further signal is delivered.

use crate::{CoreError, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Kind tag carried by every signal of a clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// Coarse, roughly once per beat
    Beat,
    /// Fine-grained animation time
    Time,
}

impl SignalKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Beat => "beat",
            SignalKind::Time => "time",
        }
    }
}

/// Payload of one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockSignal {
    /// Kind tag
    pub kind: SignalKind,
    /// Tick number since `start()`, starting at 0
    pub sequence: u64,
    /// Clock time in seconds at emission
    pub elapsed: f64,
}

/// Receiver of clock ticks.
///
/// Called on the clock thread, once per tick, in tick order.
pub trait ClockListener: Send + Sync {
    /// Handle one tick
    fn on_signal(&self, signal: &ClockSignal);
}

/// Listener that forwards ticks into a bounded channel.
///
/// Ticks are dropped when the consumer falls behind.
pub struct ChannelListener {
    sender: Sender<ClockSignal>,
}

impl ChannelListener {
    /// Create a listener and the receiving end of its queue
    pub fn new(capacity: usize) -> (Self, Receiver<ClockSignal>) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender }, receiver)
    }
}

impl ClockListener for ChannelListener {
    fn on_signal(&self, signal: &ClockSignal) {
        if self.sender.try_send(*signal).is_err() {
            trace!("Dropped clock signal {} (queue full)", signal.sequence);
        }
    }
}

/// Clock configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Kind tag of emitted signals
    pub kind: SignalKind,
    /// Tick period in milliseconds
    pub interval_ms: u64,
    /// Upper bound on how long `stop()` waits for the thread, unbounded if unset
    pub stop_deadline_ms: Option<u64>,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self::time()
    }
}

impl ClockConfig {
    /// Coarse regime: one `beat` signal per second
    pub fn beat() -> Self {
        Self {
            kind: SignalKind::Beat,
            interval_ms: 1000,
            stop_deadline_ms: None,
        }
    }

    /// Fine regime: one `time` signal every 10 ms
    pub fn time() -> Self {
        Self {
            kind: SignalKind::Time,
            interval_ms: 10,
            stop_deadline_ms: None,
        }
    }

    /// Bound `stop()`
    pub fn with_stop_deadline(mut self, deadline: Duration) -> Self {
        self.stop_deadline_ms = Some(deadline.as_millis() as u64);
        self
    }

    /// Tick period
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    /// Stop deadline, if any
    pub fn stop_deadline(&self) -> Option<Duration> {
        self.stop_deadline_ms.map(Duration::from_millis)
    }
}

/// Observable clock state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClockState {
    /// Whether the clock thread is ticking
    pub running: bool,
    /// Seconds of clock time since the last `start()`
    pub elapsed: f64,
    /// Ticks emitted since the last `start()`
    pub ticks: u64,
}

type SharedListener = Arc<RwLock<Option<Arc<dyn ClockListener>>>>;

/// Background tick source
pub struct StreamClock {
    config: ClockConfig,
    state: Arc<RwLock<ClockState>>,
    listener: SharedListener,

    // Dropping the sender wakes and stops the clock thread
    stop_tx: Option<Sender<()>>,
    // Disconnects when the clock thread exits
    exit_rx: Option<Receiver<()>>,
    thread: Option<JoinHandle<()>>,
}

impl StreamClock {
    /// Create an idle clock
    pub fn new(config: ClockConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(ClockState::default())),
            listener: Arc::new(RwLock::new(None)),
            stop_tx: None,
            exit_rx: None,
            thread: None,
        }
    }

    /// Register the tick receiver, replacing any previous one
    pub fn set_listener(&self, listener: Arc<dyn ClockListener>) {
        *self.listener.write() = Some(listener);
    }

    /// Remove the tick receiver; ticks keep counting but go nowhere
    pub fn clear_listener(&self) {
        *self.listener.write() = None;
    }

    /// Current configuration
    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// Snapshot of the clock state
    pub fn state(&self) -> ClockState {
        *self.state.read()
    }

    /// Whether a clock thread exists
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Start ticking. Elapsed time restarts from zero.
    pub fn start(&mut self) -> Result<()> {
        if self.thread.is_some() {
            warn!("Stream clock already running");
            return Err(CoreError::ClockAlreadyRunning);
        }

        *self.state.write() = ClockState {
            running: true,
            elapsed: 0.0,
            ticks: 0,
        };

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let (exit_tx, exit_rx) = bounded::<()>(1);
        let state = self.state.clone();
        let listener = self.listener.clone();
        let kind = self.config.kind;
        let interval = self.config.interval();

        let spawned = thread::Builder::new()
            .name("stream-clock".to_string())
            .spawn(move || {
                let _exit = exit_tx;
                info!(
                    "Stream clock started ({} every {:?})",
                    kind.as_str(),
                    interval
                );
                let mut next = Instant::now();

                loop {
                    let signal = {
                        let s = state.read();
                        ClockSignal {
                            kind,
                            sequence: s.ticks,
                            elapsed: s.elapsed,
                        }
                    };

                    let current = listener.read().clone();
                    if let Some(current) = current {
                        current.on_signal(&signal);
                    }

                    {
                        let mut s = state.write();
                        s.ticks += 1;
                        s.elapsed += interval.as_secs_f64();
                    }

                    next += interval;
                    let now = Instant::now();
                    if next < now {
                        // Listener overran the period; skip ahead rather than burst
                        next = now;
                    }

                    match stop_rx.recv_deadline(next) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                state.write().running = false;
                info!("Stream clock stopped");
            });

        match spawned {
            Ok(handle) => {
                self.stop_tx = Some(stop_tx);
                self.exit_rx = Some(exit_rx);
                self.thread = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.state.write().running = false;
                Err(CoreError::Io(e))
            }
        }
    }

    /// Stop ticking and wait for the clock thread, bounded by the configured
    /// deadline. A no-op when idle.
    pub fn stop(&mut self) -> Result<()> {
        self.stop_with_deadline(self.config.stop_deadline())
    }

    /// Stop ticking and wait for the clock thread, at most `deadline` if given.
    ///
    /// On [`CoreError::ShutdownTimeout`] the thread has been told to stop but
    /// is still alive; calling `stop` again resumes waiting for it.
    pub fn stop_with_deadline(&mut self, deadline: Option<Duration>) -> Result<()> {
        let Some(handle) = self.thread.take() else {
            return Ok(());
        };

        debug!("Stopping stream clock");
        drop(self.stop_tx.take());

        if let (Some(deadline), Some(exit_rx)) = (deadline, self.exit_rx.as_ref()) {
            if let Err(RecvTimeoutError::Timeout) = exit_rx.recv_timeout(deadline) {
                warn!("Stream clock did not stop within {:?}", deadline);
                self.thread = Some(handle);
                return Err(CoreError::ShutdownTimeout(deadline));
            }
        }
        self.exit_rx = None;

        let joined = handle.join();
        self.state.write().running = false;
        joined.map_err(|_| CoreError::ClockThread("clock thread panicked".to_string()))
    }
}

impl Drop for StreamClock {
    fn drop(&mut self) {
        if let Err(e) = self.stop_with_deadline(None) {
            warn!("Stream clock shutdown failed: {}", e);
        }
    }
}

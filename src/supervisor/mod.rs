//! Connection lifecycle: connect both layers, run the background capture
//! worker, watch liveness, retry on failure, fan out status changes.

mod link;

pub use link::DesktopLink;

use crate::error::ConnectError;
use crate::frame::{self, Frame, RenderableImage};
use crate::keys::{Key, KeyEvent, KeyTranslator, NO_KEY};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Pacing for the capture worker, ~60 captures/s ceiling.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);
/// Slice length for interval sleeps so shutdown stays responsive.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Where the bridge currently is in its lifecycle. Mutated only by the
/// supervisor; observers read it through [`ConnectionSupervisor::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    TunnelEstablished,
    SessionActive,
    Reconnecting,
}

/// The two connection layers as one seam, so the lifecycle logic can be
/// driven against a scripted double in tests.
///
/// `capture_frame` and `send_key` take `&self` with interior locking:
/// a blocking capture on the worker thread must never serialize key
/// sends or liveness checks issued from the cooperative loop.
pub trait Transport: Send + Sync + 'static {
    fn connect_tunnel(&mut self) -> Result<(), ConnectError>;
    fn connect_session(&mut self) -> Result<(), ConnectError>;
    fn tunnel_connected(&self) -> bool;
    fn session_connected(&self) -> bool;
    fn capture_frame(&self) -> Result<Frame, ConnectError>;
    /// Fire-and-forget; implementations swallow transient send failures.
    fn send_key(&self, keysym: u32, pressed: bool);
    fn disconnect(&mut self);

    /// Both layers up.
    fn is_connected(&self) -> bool {
        self.tunnel_connected() && self.session_connected()
    }
}

type Observer = Arc<dyn Fn() + Send + Sync>;

struct Shared<T: Transport> {
    /// Read side shared by captures, key sends and liveness probes;
    /// write side taken only to (re)connect or tear down.
    transport: RwLock<T>,
    retry_interval: Duration,
    state: Mutex<ConnectionState>,
    observers: Mutex<Vec<Observer>>,
    translator: Mutex<KeyTranslator>,
    /// Single-slot handoff cell between the capture worker and the tick.
    pending_frame: Mutex<Option<Frame>>,
    /// Worker is the only setter, the tick the only clearer.
    frame_pending: AtomicBool,
    image: Mutex<Option<Arc<RenderableImage>>>,
    worker_stop: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
    retrying: AtomicBool,
    watching: AtomicBool,
    loops: Mutex<Vec<JoinHandle<()>>>,
    shutting_down: AtomicBool,
}

/// Owns the whole remote-desktop lifecycle. Constructed once by the
/// process entry point and shared by handle; there is no ambient global.
pub struct ConnectionSupervisor<T: Transport> {
    shared: Arc<Shared<T>>,
}

impl<T: Transport> ConnectionSupervisor<T> {
    /// `retry_interval` should come pre-clamped from
    /// [`ConnectionConfig::retry_interval`](crate::config::ConnectionConfig::retry_interval).
    pub fn new(transport: T, retry_interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport: RwLock::new(transport),
                retry_interval,
                state: Mutex::new(ConnectionState::Disconnected),
                observers: Mutex::new(Vec::new()),
                translator: Mutex::new(KeyTranslator::new()),
                pending_frame: Mutex::new(None),
                frame_pending: AtomicBool::new(false),
                image: Mutex::new(None),
                worker_stop: AtomicBool::new(false),
                worker: Mutex::new(None),
                retrying: AtomicBool::new(false),
                watching: AtomicBool::new(false),
                loops: Mutex::new(Vec::new()),
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    /// Registers a status observer. Observers get a no-argument call on
    /// every status check and re-query whatever they need (pull model).
    pub fn add_observer(&self, observer: impl Fn() + Send + Sync + 'static) {
        self.shared.observers.lock().push(Arc::new(observer));
    }

    /// Launches a connection attempt. Never propagates a failure: on any
    /// error the state stays [`ConnectionState::Disconnected`] and the
    /// periodic retry loop keeps trying at the configured interval.
    pub fn connect_to_host(&self) {
        self.shared.connect_to_host();
    }

    /// Cooperative update entry, called once per tick by the host loop.
    /// Converts and publishes at most one pending frame; the frame is
    /// taken out of the slot before conversion so it is released on
    /// every exit path and a bad frame can never stall the pipeline.
    pub fn on_tick(&self) {
        let shared = &self.shared;
        if !shared.frame_pending.load(Ordering::SeqCst) {
            return;
        }
        let taken = shared.pending_frame.lock().take();
        if let Some(frame) = taken {
            match frame::to_image(&frame) {
                Ok(img) => {
                    // Replacing the slot drops the previous image and
                    // its backing buffer with it.
                    *shared.image.lock() = Some(Arc::new(img));
                }
                Err(e) => tracing::warn!(error = %e, "dropping unconvertible frame"),
            }
        }
        shared.frame_pending.store(false, Ordering::SeqCst);
    }

    /// Translates and forwards one key edge. Modifier bookkeeping
    /// happens even while offline so the state stays consistent; the
    /// wire send is skipped unless a session is active, and transient
    /// send failures are never surfaced.
    pub fn send_event(&self, event: KeyEvent) {
        let code = self
            .shared
            .translator
            .lock()
            .translate(event.key, event.pressed);
        if code == NO_KEY {
            return;
        }
        if *self.shared.state.lock() != ConnectionState::SessionActive {
            return;
        }
        self.shared.transport.read().send_key(code, event.pressed);
    }

    /// Convenience form of [`send_event`](Self::send_event).
    pub fn send_key(&self, key: Key, pressed: bool) {
        self.send_event(KeyEvent { key, pressed });
    }

    /// Forwards at most one key-down and one key-up per update tick, in
    /// that order. Extra edges within the same tick are dropped by the
    /// input collaborator for protocol-traffic economy.
    pub fn send_tick_input(&self, key_down: Option<Key>, key_up: Option<Key>) {
        if let Some(key) = key_down {
            self.send_event(KeyEvent { key, pressed: true });
        }
        if let Some(key) = key_up {
            self.send_event(KeyEvent { key, pressed: false });
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock()
    }

    /// Boolean liveness of both layers, for observers.
    pub fn connection_status(&self) -> bool {
        self.shared.transport.read().is_connected()
    }

    /// The current display-ready image, if any frame has been published.
    pub fn current_image(&self) -> Option<Arc<RenderableImage>> {
        self.shared.image.lock().clone()
    }

    /// True while a captured frame waits for the next tick to convert.
    pub fn has_pending_frame(&self) -> bool {
        self.shared.frame_pending.load(Ordering::SeqCst)
    }

    /// Stops the worker (signal and join), disconnects session then
    /// tunnel, and joins the periodic loops. Safe to call once from the
    /// process shutdown path; repeated calls are no-ops.
    pub fn shutdown(&self) {
        if self.shared.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("shutting down remote desktop bridge");
        self.shared.cancel_refresh();
        self.shared.transport.write().disconnect();
        self.shared.set_state(ConnectionState::Disconnected);
        let handles: Vec<JoinHandle<()>> = self.shared.loops.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }
    }
}

impl<T: Transport> Drop for ConnectionSupervisor<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<T: Transport> Shared<T> {
    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }

    /// Fan-out happens outside the observers lock so a callback may
    /// itself register further observers.
    fn notify(&self) {
        let observers: Vec<Observer> = self.observers.lock().clone();
        for observer in &observers {
            observer();
        }
    }

    fn connect_to_host(self: &Arc<Self>) {
        if self.shutting_down.load(Ordering::SeqCst) {
            return;
        }
        tracing::info!("attempting to connect to host");
        match self.try_connect() {
            Ok(()) => {
                if self.shutting_down.load(Ordering::SeqCst) {
                    self.transport.write().disconnect();
                    return;
                }
                self.set_state(ConnectionState::SessionActive);
                self.start_worker();
                self.start_liveness_loop();
                self.notify();
            }
            Err(e) => {
                tracing::warn!(error = %e, "connection to host not successful");
                self.set_state(ConnectionState::Disconnected);
                self.start_retry_loop();
            }
        }
    }

    /// Connects the tunnel, then the session. A session failure tears
    /// the tunnel down too: retry assumes a clean starting point, so no
    /// partially-connected state may survive this function.
    fn try_connect(&self) -> Result<(), ConnectError> {
        let mut transport = self.transport.write();
        if !transport.tunnel_connected() {
            transport.connect_tunnel()?;
        }
        self.set_state(ConnectionState::TunnelEstablished);
        if !transport.session_connected() {
            if let Err(e) = transport.connect_session() {
                transport.disconnect();
                return Err(e);
            }
        }
        Ok(())
    }

    /// Retries indefinitely at the fixed interval, no backoff. Skipped
    /// while the liveness loop is running, since that loop already
    /// re-invokes connection establishment once per tick.
    fn start_retry_loop(self: &Arc<Self>) {
        if self.watching.load(Ordering::SeqCst) || self.retrying.swap(true, Ordering::SeqCst) {
            return;
        }
        let shared = Arc::clone(self);
        let handle = thread::spawn(move || {
            tracing::debug!("retry loop started");
            loop {
                shared.sleep_interval();
                if shared.shutting_down.load(Ordering::SeqCst) {
                    break;
                }
                if shared.transport.read().is_connected() {
                    break;
                }
                shared.connect_to_host();
                if shared.transport.read().is_connected() {
                    break;
                }
            }
            tracing::debug!("retry loop stopped");
            shared.retrying.store(false, Ordering::SeqCst);
        });
        self.loops.lock().push(handle);
    }

    /// Notifies observers every tick for the lifetime of the bridge and
    /// drives reconnection when the status check comes back offline.
    fn start_liveness_loop(self: &Arc<Self>) {
        if self.watching.swap(true, Ordering::SeqCst) {
            return;
        }
        let shared = Arc::clone(self);
        let handle = thread::spawn(move || {
            tracing::debug!("liveness loop started");
            while !shared.shutting_down.load(Ordering::SeqCst) {
                let alive = shared.transport.read().is_connected();
                tracing::debug!(alive, "connection status check");
                shared.notify();
                if !alive && !shared.shutting_down.load(Ordering::SeqCst) {
                    shared.set_state(ConnectionState::Reconnecting);
                    shared.cancel_refresh();
                    // Distinct went-offline signal before the reconnect
                    // attempt, so observers can react to the outage.
                    shared.notify();
                    shared.connect_to_host();
                }
                shared.sleep_interval();
            }
            tracing::debug!("liveness loop stopped");
            shared.watching.store(false, Ordering::SeqCst);
        });
        self.loops.lock().push(handle);
    }

    /// One dedicated worker per active session. It captures only while
    /// the single-slot cell is empty, so at most one frame is ever in
    /// flight between capture and conversion.
    fn start_worker(self: &Arc<Self>) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return;
        }
        self.worker_stop.store(false, Ordering::SeqCst);
        let shared = Arc::clone(self);
        *worker = Some(thread::spawn(move || {
            tracing::debug!("capture worker started");
            while !shared.worker_stop.load(Ordering::SeqCst)
                && !shared.shutting_down.load(Ordering::SeqCst)
            {
                if !shared.frame_pending.load(Ordering::SeqCst) {
                    let captured = shared.transport.read().capture_frame();
                    match captured {
                        Ok(frame) => {
                            *shared.pending_frame.lock() = Some(frame);
                            shared.frame_pending.store(true, Ordering::SeqCst);
                        }
                        Err(e) => {
                            // The liveness loop decides what to do about it.
                            tracing::trace!(error = %e, "frame capture failed");
                        }
                    }
                }
                thread::sleep(FRAME_INTERVAL);
            }
            tracing::debug!("capture worker stopped");
        }));
    }

    /// Stops the capture worker (cooperative flag, then join — a capture
    /// in flight is waited out, never interrupted) and clears the
    /// pending frame slot.
    fn cancel_refresh(&self) {
        self.worker_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                tracing::warn!("capture worker panicked");
            }
        }
        *self.pending_frame.lock() = None;
        self.frame_pending.store(false, Ordering::SeqCst);
    }

    /// Sleeps the retry interval in slices, bailing early on shutdown.
    fn sleep_interval(&self) {
        let mut remaining = self.retry_interval;
        while remaining > Duration::ZERO && !self.shutting_down.load(Ordering::SeqCst) {
            let step = remaining.min(SHUTDOWN_POLL);
            thread::sleep(step);
            remaining = remaining.saturating_sub(step);
        }
    }
}

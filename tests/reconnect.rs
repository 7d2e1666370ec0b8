//! End-to-end lifecycle tests against a scripted transport: outage
//! detection, periodic retry, recovery, and frame handoff.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use vnc_bridge::{ConnectError, ConnectionState, ConnectionSupervisor, Frame, Key, Transport};

const INTERVAL: Duration = Duration::from_millis(200);

/// Remote end simulated by shared flags: `reachable` gates connection
/// attempts, `alive` is the current link state.
#[derive(Clone)]
struct RemoteEnd {
    reachable: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
    tunnel_connects: Arc<AtomicUsize>,
    session_connects: Arc<AtomicUsize>,
    captures: Arc<AtomicUsize>,
    keysyms: Arc<parking_lot::Mutex<Vec<(u32, bool)>>>,
}

impl RemoteEnd {
    fn new(reachable: bool) -> Self {
        Self {
            reachable: Arc::new(AtomicBool::new(reachable)),
            alive: Arc::new(AtomicBool::new(false)),
            tunnel_connects: Arc::new(AtomicUsize::new(0)),
            session_connects: Arc::new(AtomicUsize::new(0)),
            captures: Arc::new(AtomicUsize::new(0)),
            keysyms: Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    fn kill_link(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

struct MockTransport {
    remote: RemoteEnd,
}

impl Transport for MockTransport {
    fn connect_tunnel(&mut self) -> Result<(), ConnectError> {
        self.remote.tunnel_connects.fetch_add(1, Ordering::SeqCst);
        if !self.remote.reachable.load(Ordering::SeqCst) {
            return Err(ConnectError::Network("host unreachable".to_string()));
        }
        self.remote.alive.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn connect_session(&mut self) -> Result<(), ConnectError> {
        self.remote.session_connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn tunnel_connected(&self) -> bool {
        self.remote.alive.load(Ordering::SeqCst)
    }

    fn session_connected(&self) -> bool {
        self.remote.alive.load(Ordering::SeqCst)
    }

    fn capture_frame(&self) -> Result<Frame, ConnectError> {
        if !self.remote.alive.load(Ordering::SeqCst) {
            return Err(ConnectError::Network("link is down".to_string()));
        }
        self.remote.captures.fetch_add(1, Ordering::SeqCst);
        // 2x2 BGRA frame.
        Ok(Frame::new(2, 2, vec![0x10; 16]))
    }

    fn send_key(&self, keysym: u32, pressed: bool) {
        self.remote.keysyms.lock().push((keysym, pressed));
    }

    fn disconnect(&mut self) {
        self.remote.alive.store(false, Ordering::SeqCst);
    }
}

fn bridge(remote: &RemoteEnd) -> ConnectionSupervisor<MockTransport> {
    ConnectionSupervisor::new(
        MockTransport {
            remote: remote.clone(),
        },
        INTERVAL,
    )
}

#[test]
fn connect_publishes_frames_through_the_tick() {
    let remote = RemoteEnd::new(true);
    let bridge = bridge(&remote);

    let notified = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&notified);
    bridge.add_observer(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    bridge.connect_to_host();
    assert_eq!(bridge.state(), ConnectionState::SessionActive);
    assert!(bridge.connection_status());
    assert!(notified.load(Ordering::SeqCst) >= 1);

    // The worker parks one frame; nothing is published before a tick.
    thread::sleep(Duration::from_millis(150));
    assert!(bridge.has_pending_frame());
    assert!(bridge.current_image().is_none());

    bridge.on_tick();
    assert!(!bridge.has_pending_frame());
    let image = bridge.current_image().expect("tick must publish the frame");
    assert_eq!(image.width(), 2);
    assert_eq!(image.height(), 2);

    bridge.shutdown();
}

#[test]
fn unreachable_host_retries_at_the_interval_not_before() {
    let remote = RemoteEnd::new(false);
    let bridge = bridge(&remote);

    bridge.connect_to_host();
    assert_eq!(bridge.state(), ConnectionState::Disconnected);
    assert_eq!(remote.tunnel_connects.load(Ordering::SeqCst), 1);

    thread::sleep(INTERVAL / 2);
    assert_eq!(
        remote.tunnel_connects.load(Ordering::SeqCst),
        1,
        "no retry may fire before the configured interval"
    );

    thread::sleep(INTERVAL);
    assert!(remote.tunnel_connects.load(Ordering::SeqCst) >= 2);
    bridge.shutdown();
}

#[test]
fn outage_cancels_capture_and_reconnects_once_per_tick() {
    let remote = RemoteEnd::new(true);
    let bridge = bridge(&remote);
    bridge.connect_to_host();
    assert_eq!(bridge.state(), ConnectionState::SessionActive);

    // Keep the host unreachable so the outage persists across ticks.
    remote.reachable.store(false, Ordering::SeqCst);
    remote.kill_link();

    thread::sleep(INTERVAL + INTERVAL / 2);
    assert!(!bridge.connection_status());
    assert!(!bridge.has_pending_frame(), "outage must clear the frame slot");

    let after_first_tick = remote.tunnel_connects.load(Ordering::SeqCst);
    thread::sleep(INTERVAL);
    let after_second_tick = remote.tunnel_connects.load(Ordering::SeqCst);
    assert!(after_second_tick > after_first_tick);
    assert!(
        after_second_tick - after_first_tick <= 2,
        "reconnect attempts must stay paced by the interval"
    );

    // Host comes back; the next tick restores the session.
    remote.reachable.store(true, Ordering::SeqCst);
    thread::sleep(INTERVAL * 2);
    assert_eq!(bridge.state(), ConnectionState::SessionActive);
    assert!(bridge.connection_status());

    bridge.shutdown();
}

#[test]
fn captures_stall_until_the_pending_frame_is_consumed() {
    let remote = RemoteEnd::new(true);
    let bridge = bridge(&remote);
    bridge.connect_to_host();

    thread::sleep(Duration::from_millis(200));
    assert_eq!(
        remote.captures.load(Ordering::SeqCst),
        1,
        "at most one frame may be in flight between worker and tick"
    );

    bridge.on_tick();
    thread::sleep(Duration::from_millis(150));
    assert_eq!(remote.captures.load(Ordering::SeqCst), 2);

    bridge.shutdown();
}

#[test]
fn key_edges_reach_the_remote_in_order() {
    let remote = RemoteEnd::new(true);
    let bridge = bridge(&remote);
    bridge.connect_to_host();

    bridge.send_tick_input(Some(Key::H), None);
    bridge.send_tick_input(None, Some(Key::H));
    // Shift toggles the modifier silently, then uppercases the letter.
    bridge.send_key(Key::LeftShift, true);
    bridge.send_key(Key::A, true);

    let sent = remote.keysyms.lock().clone();
    assert_eq!(sent, vec![(0x68, true), (0x68, false), (0x41, true)]);

    bridge.shutdown();
}

#[test]
fn shutdown_tears_everything_down() {
    let remote = RemoteEnd::new(true);
    let bridge = bridge(&remote);
    bridge.connect_to_host();

    bridge.shutdown();
    assert_eq!(bridge.state(), ConnectionState::Disconnected);
    assert!(!remote.alive.load(Ordering::SeqCst));

    // Idempotent; a second call must not hang on already-joined loops.
    bridge.shutdown();
}

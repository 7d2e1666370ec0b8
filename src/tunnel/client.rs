use super::AuthMethod;
use crate::error::ConnectError;
use parking_lot::Mutex;
use ssh2::Session;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const ACCEPT_POLL: Duration = Duration::from_millis(50);
const RELAY_IDLE: Duration = Duration::from_millis(5);
const RELAY_BUF_LEN: usize = 16 * 1024;

/// Encrypted transport to the remote host, with an optional local port
/// forward so the framebuffer protocol can ride inside it.
///
/// `connect` either succeeds completely or leaves the client exactly as
/// it was: the session and the forward listener are only stored once
/// every step has succeeded.
pub struct TunnelClient {
    host: String,
    port: u16,
    username: String,
    auth: AuthMethod,
    forward: Option<ForwardSpec>,
    active: Option<ActiveTunnel>,
    connected: Arc<AtomicBool>,
}

#[derive(Debug, Clone)]
struct ForwardSpec {
    bind_addr: String,
    bind_port: u16,
    target_addr: String,
    target_port: u16,
}

struct ActiveTunnel {
    session: Arc<Mutex<Session>>,
    listener: Option<ForwardListener>,
}

struct ForwardListener {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ForwardListener {
    fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl TunnelClient {
    pub fn new(host: &str, port: u16, username: &str, auth: AuthMethod) -> Self {
        Self {
            host: host.to_string(),
            port,
            username: username.to_string(),
            auth,
            forward: None,
            active: None,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Registers a local-to-remote port forward, activated on `connect`.
    pub fn add_port_forward(
        &mut self,
        bind_addr: &str,
        bind_port: u16,
        target_addr: &str,
        target_port: u16,
    ) {
        self.forward = Some(ForwardSpec {
            bind_addr: bind_addr.to_string(),
            bind_port,
            target_addr: target_addr.to_string(),
            target_port,
        });
    }

    /// True when a port forward has been registered.
    pub fn has_forward(&self) -> bool {
        self.forward.is_some()
    }

    /// Opens the session, authenticates, and starts the forward listener
    /// if one was registered. Already-connected clients return
    /// immediately. Any failure tears down whatever was built so far and
    /// surfaces as a single [`ConnectError`].
    pub fn connect(&mut self) -> Result<(), ConnectError> {
        if self.is_connected() {
            return Ok(());
        }
        // Clear remnants of a previously dead session.
        self.disconnect();

        let session = Arc::new(Mutex::new(self.open_session()?));
        let listener = match self.forward.clone() {
            Some(spec) => Some(self.start_forward(spec, Arc::clone(&session))?),
            None => None,
        };

        self.active = Some(ActiveTunnel { session, listener });
        self.connected.store(true, Ordering::SeqCst);
        tracing::info!(host = %self.host, port = self.port, "SSH tunnel established");
        Ok(())
    }

    fn open_session(&self) -> Result<Session, ConnectError> {
        let addr = format!("{}:{}", self.host, self.port);
        let tcp = TcpStream::connect(&addr)
            .map_err(|e| ConnectError::Network(format!("failed to connect to {addr}: {e}")))?;
        tcp.set_nonblocking(false)?;

        let mut session =
            Session::new().map_err(|e| ConnectError::Network(e.to_string()))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| ConnectError::Protocol(format!("SSH handshake failed: {e}")))?;

        match &self.auth {
            AuthMethod::Password { password } => {
                session
                    .userauth_password(&self.username, password)
                    .map_err(|e| ConnectError::Authentication(e.to_string()))?;
            }
            AuthMethod::PublicKey {
                private_key_path,
                passphrase,
            } => {
                session
                    .userauth_pubkey_file(
                        &self.username,
                        None,
                        Path::new(private_key_path),
                        passphrase.as_deref(),
                    )
                    .map_err(|e| ConnectError::Authentication(e.to_string()))?;
            }
        }

        if !session.authenticated() {
            return Err(ConnectError::Authentication(
                "SSH authentication failed".to_string(),
            ));
        }

        // Relay channels poll; the accept loop switches to blocking mode
        // only while a channel is being opened.
        session.set_blocking(false);
        Ok(session)
    }

    fn start_forward(
        &self,
        spec: ForwardSpec,
        session: Arc<Mutex<Session>>,
    ) -> Result<ForwardListener, ConnectError> {
        let bind = format!("{}:{}", spec.bind_addr, spec.bind_port);
        let listener = TcpListener::bind(&bind)
            .map_err(|e| ConnectError::Network(format!("forward bind on {bind} failed: {e}")))?;
        listener.set_nonblocking(true)?;

        let stop = Arc::new(AtomicBool::new(false));
        let connected = Arc::clone(&self.connected);
        let accept_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            run_forward_listener(listener, session, spec, accept_stop, connected);
        });

        Ok(ForwardListener {
            stop,
            handle: Some(handle),
        })
    }

    /// Current liveness. Tolerates a dead or disposed session by
    /// reporting `false` rather than failing.
    pub fn is_connected(&self) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        if !self.connected.load(Ordering::SeqCst) {
            return false;
        }
        match active.session.lock().keepalive_send() {
            Ok(_) => true,
            Err(ref e) if is_again(e) => true,
            Err(e) => {
                tracing::debug!(error = %e, "SSH keepalive failed, marking tunnel dead");
                self.connected.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    /// Stops the forward, then closes the session. Safe to call at any
    /// time, including when already disconnected.
    pub fn disconnect(&mut self) {
        if let Some(mut active) = self.active.take() {
            if let Some(mut listener) = active.listener.take() {
                listener.stop();
            }
            let session = active.session.lock();
            session.set_blocking(true);
            let _ = session.disconnect(
                Some(ssh2::DisconnectCode::ByApplication),
                "bridge shutdown",
                None,
            );
            tracing::info!(host = %self.host, "SSH tunnel closed");
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Drop for TunnelClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// libssh2's EAGAIN, surfaced when the session is in non-blocking mode.
fn is_again(e: &ssh2::Error) -> bool {
    matches!(e.code(), ssh2::ErrorCode::Session(-37))
}

fn run_forward_listener(
    listener: TcpListener,
    session: Arc<Mutex<Session>>,
    spec: ForwardSpec,
    stop: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
) {
    tracing::debug!(
        bind = %format!("{}:{}", spec.bind_addr, spec.bind_port),
        target = %format!("{}:{}", spec.target_addr, spec.target_port),
        "port forward listening"
    );
    while !stop.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((local, peer)) => {
                tracing::debug!(%peer, "forward connection accepted");
                let channel = {
                    let session = session.lock();
                    session.set_blocking(true);
                    let channel = session.channel_direct_tcpip(
                        &spec.target_addr,
                        spec.target_port,
                        None,
                    );
                    session.set_blocking(false);
                    channel
                };
                match channel {
                    Ok(channel) => {
                        let relay_stop = Arc::clone(&stop);
                        thread::spawn(move || relay(local, channel, relay_stop));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "direct-tcpip channel open failed");
                        connected.store(false, Ordering::SeqCst);
                    }
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                tracing::warn!(error = %e, "forward listener error, stopping");
                break;
            }
        }
    }
}

/// Shuttles bytes between one accepted local connection and its
/// direct-tcpip channel until either side closes or a stop is requested.
fn relay(local: TcpStream, mut channel: ssh2::Channel, stop: Arc<AtomicBool>) {
    if local.set_nonblocking(true).is_err() {
        return;
    }
    let mut local = local;
    let mut buf = [0u8; RELAY_BUF_LEN];

    loop {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        let mut moved = false;

        match channel.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if write_all_retry(&mut local, &buf[..n]).is_err() {
                    break;
                }
                moved = true;
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(_) => break,
        }

        match local.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if write_all_retry(&mut channel, &buf[..n]).is_err() {
                    break;
                }
                moved = true;
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(_) => break,
        }

        if !moved {
            thread::sleep(RELAY_IDLE);
        }
    }

    let _ = channel.close();
}

/// Write with retry for non-blocking endpoints.
fn write_all_retry(writer: &mut impl Write, data: &[u8]) -> std::io::Result<()> {
    let mut remaining = data;
    while !remaining.is_empty() {
        match writer.write(remaining) {
            Ok(0) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "endpoint stopped accepting data",
                ))
            }
            Ok(n) => remaining = &remaining[n..],
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(1));
            }
            Err(e) => return Err(e),
        }
    }
    loop {
        match writer.flush() {
            Ok(()) => return Ok(()),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(1));
            }
            Err(e) => return Err(e),
        }
    }
}

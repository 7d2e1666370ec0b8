use super::Transport;
use crate::config::ConnectionConfig;
use crate::error::ConnectError;
use crate::frame::Frame;
use crate::rfb::FrameBufferClient;
use crate::supervisor::ConnectionSupervisor;
use crate::tunnel::{AuthMethod, TunnelClient};

const LOCALHOST: &str = "127.0.0.1";

/// The production transport: a framebuffer session riding an SSH tunnel
/// with a local port forward. The session always dials the forwarded
/// local port, never the remote host directly.
pub struct DesktopLink {
    config: ConnectionConfig,
    tunnel: TunnelClient,
    session: Option<FrameBufferClient>,
}

impl DesktopLink {
    pub fn new(config: ConnectionConfig) -> Self {
        let auth = match &config.ssh.key_auth {
            Some(key) if config.use_key_auth() => {
                let passphrase = (!key.passphrase.is_empty()).then(|| key.passphrase.clone());
                AuthMethod::public_key(key.path.clone(), passphrase)
            }
            _ => AuthMethod::password(config.ssh.password.clone()),
        };

        let mut tunnel = TunnelClient::new(
            &config.vnc.host,
            config.ssh.port,
            &config.ssh.username,
            auth,
        );
        tunnel.add_port_forward(
            LOCALHOST,
            config.vnc.port,
            &config.vnc.host,
            config.vnc.port,
        );

        Self {
            config,
            tunnel,
            session: None,
        }
    }
}

impl Transport for DesktopLink {
    fn connect_tunnel(&mut self) -> Result<(), ConnectError> {
        // A session that rode the previous forward cannot survive a
        // tunnel re-dial; drop it so the supervisor reconnects it too.
        if let Some(session) = self.session.take() {
            session.disconnect();
        }
        self.tunnel.connect()
    }

    fn connect_session(&mut self) -> Result<(), ConnectError> {
        let client = FrameBufferClient::connect(
            LOCALHOST,
            self.config.vnc.port,
            &self.config.vnc.password,
        )?;
        self.session = Some(client);
        Ok(())
    }

    fn tunnel_connected(&self) -> bool {
        self.tunnel.is_connected()
    }

    fn session_connected(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_connected())
    }

    fn capture_frame(&self) -> Result<Frame, ConnectError> {
        match &self.session {
            Some(session) => session.capture_frame(),
            None => Err(ConnectError::Network("no active session".to_string())),
        }
    }

    fn send_key(&self, keysym: u32, pressed: bool) {
        if let Some(session) = &self.session {
            session.send_key_event(keysym, pressed);
        }
    }

    /// Session first, tunnel second; the reverse order would cut the
    /// forwarded port out from under a live protocol connection.
    fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            session.disconnect();
        }
        self.tunnel.disconnect();
    }
}

impl ConnectionSupervisor<DesktopLink> {
    /// Bridge wired for production from a loaded configuration.
    pub fn from_config(config: ConnectionConfig) -> Self {
        let interval = config.retry_interval();
        tracing::info!(config = ?config, "remote desktop bridge configured");
        Self::new(DesktopLink::new(config), interval)
    }
}

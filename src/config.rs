use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Floor for the retry/liveness interval. Anything shorter would
/// hot-loop connection attempts against a dead host.
pub const MIN_RETRY_INTERVAL: Duration = Duration::from_secs(8);

const DEFAULT_VNC_PORT: u16 = 5900;
const DEFAULT_SSH_PORT: u16 = 22;
const DEFAULT_RETRY_SECS: u64 = 7;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// All connection parameters the bridge needs, loaded once at startup.
/// The core never mutates it.
#[derive(Clone, Deserialize)]
pub struct ConnectionConfig {
    pub vnc: VncConfig,
    pub ssh: SshConfig,
    #[serde(default = "default_retry_secs")]
    pub retry_interval_secs: u64,
}

#[derive(Clone, Deserialize)]
pub struct VncConfig {
    pub host: String,
    #[serde(default = "default_vnc_port")]
    pub port: u16,
    #[serde(default)]
    pub password: String,
}

#[derive(Clone, Deserialize)]
pub struct SshConfig {
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub key_auth: Option<KeyAuthConfig>,
}

/// Private-key authentication parameters for the tunnel.
#[derive(Clone, Deserialize)]
pub struct KeyAuthConfig {
    pub path: String,
    #[serde(default)]
    pub passphrase: String,
    /// Prefer the key over the password when both are present.
    #[serde(default)]
    pub prefer_key: bool,
}

fn default_vnc_port() -> u16 {
    DEFAULT_VNC_PORT
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_retry_secs() -> u64 {
    DEFAULT_RETRY_SECS
}

impl ConnectionConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// The interval between connection checks/attempts, floor-clamped to
    /// [`MIN_RETRY_INTERVAL`].
    pub fn retry_interval(&self) -> Duration {
        MIN_RETRY_INTERVAL.max(Duration::from_secs(self.retry_interval_secs))
    }

    /// True when key-based SSH authentication should be used: a key block
    /// is configured, marked preferred, and actually names a file.
    pub fn use_key_auth(&self) -> bool {
        matches!(&self.ssh.key_auth, Some(k) if k.prefer_key && !k.path.trim().is_empty())
    }
}

// Credentials are masked; config summaries end up in logs.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("vnc.host", &self.vnc.host)
            .field("vnc.port", &self.vnc.port)
            .field("vnc.password", &mask(&self.vnc.password))
            .field("ssh.port", &self.ssh.port)
            .field("ssh.username", &self.ssh.username)
            .field("ssh.password", &mask(&self.ssh.password))
            .field("ssh.key_path", &self.ssh.key_auth.as_ref().map(|k| k.path.as_str()))
            .field("prefer_key", &self.use_key_auth())
            .field("retry_interval_secs", &self.retry_interval_secs)
            .finish()
    }
}

fn mask(secret: &str) -> String {
    "*".repeat(secret.len())
}

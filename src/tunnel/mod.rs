pub mod client;

pub use client::TunnelClient;

/// Credential used to authenticate the tunnel.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    Password { password: String },
    PublicKey { private_key_path: String, passphrase: Option<String> },
}

impl AuthMethod {
    pub fn password(password: impl Into<String>) -> Self {
        Self::Password { password: password.into() }
    }

    pub fn public_key(private_key_path: impl Into<String>, passphrase: Option<String>) -> Self {
        Self::PublicKey {
            private_key_path: private_key_path.into(),
            passphrase,
        }
    }
}

//! Remote desktop bridge: a VNC framebuffer session carried over an SSH
//! tunnel, supervised for automatic reconnection.
//!
//! The pieces compose bottom-up: [`tunnel`] provides the encrypted
//! transport with a local port forward, [`rfb`] speaks the framebuffer
//! protocol over it, [`keys`] translates host key events into keysyms,
//! [`frame`] converts captured pixel data into display-ready images, and
//! [`supervisor`] ties the lifecycle together (connect, background
//! capture, liveness, retry).
//!
//! ```no_run
//! use vnc_bridge::{ConnectionConfig, ConnectionSupervisor};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConnectionConfig::load("connection.json")?;
//! let bridge = ConnectionSupervisor::from_config(config);
//! bridge.connect_to_host();
//! // Host loop: call bridge.on_tick() once per frame, poll
//! // bridge.current_image() for the latest picture.
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod frame;
pub mod keys;
pub mod rfb;
pub mod supervisor;
pub mod tunnel;

pub use config::{ConnectionConfig, MIN_RETRY_INTERVAL};
pub use error::{ConnectError, ConvertError};
pub use frame::{to_image, Frame, RenderableImage};
pub use keys::{Key, KeyEvent, KeyTranslator, ModifierState, NO_KEY};
pub use rfb::FrameBufferClient;
pub use supervisor::{ConnectionState, ConnectionSupervisor, DesktopLink, Transport};
pub use tunnel::{AuthMethod, TunnelClient};

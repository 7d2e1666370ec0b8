use super::FrameBuffer;
use crate::error::ConnectError;
use crate::frame::Frame;
use parking_lot::Mutex;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use vnc::{PixelFormat, Rect};

/// How long a full-frame request may go unanswered before the capture is
/// treated as a protocol failure instead of hanging the worker.
const FULL_FRAME_DEADLINE: Duration = Duration::from_secs(10);
const EVENT_POLL: Duration = Duration::from_millis(1);

/// Framebuffer-protocol session: handshake, password authentication,
/// full-frame capture and key forwarding.
pub struct FrameBufferClient {
    client: Mutex<vnc::Client>,
    buffer: Mutex<FrameBuffer>,
    size: Mutex<(u16, u16)>,
    connected: AtomicBool,
}

impl FrameBufferClient {
    /// Opens a session against `host:port` (typically `127.0.0.1` when
    /// riding a tunnel). Fails with a typed error and retains nothing on
    /// any failure path.
    pub fn connect(host: &str, port: u16, password: &str) -> Result<Self, ConnectError> {
        let addr = format!("{host}:{port}");
        let tcp = TcpStream::connect(&addr)
            .map_err(|e| ConnectError::Network(format!("failed to connect to {addr}: {e}")))?;
        tcp.set_nonblocking(false)?;

        let password = password.to_string();
        let mut client = vnc::Client::from_tcp_stream(tcp, false, move |_auth_methods| {
            if password.is_empty() {
                Some(vnc::client::AuthChoice::None)
            } else {
                // VNC passwords are DES keys: 8 bytes, zero padded.
                let mut key = [0u8; 8];
                let bytes = password.as_bytes();
                let len = bytes.len().min(8);
                key[..len].copy_from_slice(&bytes[..len]);
                Some(vnc::client::AuthChoice::Password(key))
            }
        })?;

        let (width, height) = client.size();

        // 32-bit true colour, BGRA byte order on the wire.
        let pixel_format = PixelFormat {
            bits_per_pixel: 32,
            depth: 24,
            big_endian: false,
            true_colour: true,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
        };
        client.set_format(pixel_format)?;

        client.set_encodings(&[
            vnc::Encoding::Zrle,
            vnc::Encoding::CopyRect,
            vnc::Encoding::Raw,
        ])?;

        client.request_update(
            Rect {
                left: 0,
                top: 0,
                width,
                height,
            },
            false,
        )?;

        tracing::info!(host, port, width, height, "VNC session established");
        Ok(Self {
            client: Mutex::new(client),
            buffer: Mutex::new(FrameBuffer::new(width, height)),
            size: Mutex::new((width, height)),
            connected: AtomicBool::new(true),
        })
    }

    /// Requests a full (non-incremental) update, folds the resulting
    /// rectangles into the internal buffer, and returns an owned
    /// snapshot. The server keeps mutating its side asynchronously, so
    /// the copy is the only safe thing to hand out.
    pub fn capture_frame(&self) -> Result<Frame, ConnectError> {
        if !self.is_connected() {
            return Err(ConnectError::Network("VNC session is down".to_string()));
        }

        {
            let mut client = self.client.lock();
            let (width, height) = *self.size.lock();
            client
                .request_update(
                    Rect {
                        left: 0,
                        top: 0,
                        width,
                        height,
                    },
                    false,
                )
                .map_err(|e| {
                    self.connected.store(false, Ordering::SeqCst);
                    ConnectError::from(e)
                })?;
        }

        let deadline = Instant::now() + FULL_FRAME_DEADLINE;
        let mut buffer = self.buffer.lock();
        loop {
            // The client lock is re-taken per poll so key events can
            // interleave with a long frame drain.
            let event = self.client.lock().poll_event();
            match event {
                Some(vnc::client::Event::PutPixels(rect, pixels)) => {
                    buffer.update_rect(rect.left, rect.top, rect.width, rect.height, &pixels);
                }
                Some(vnc::client::Event::CopyPixels { src, dst }) => {
                    buffer.copy_rect(src.left, src.top, dst.left, dst.top, dst.width, dst.height);
                }
                Some(vnc::client::Event::Resize(width, height)) => {
                    buffer.resize(width, height);
                    *self.size.lock() = (width, height);
                }
                Some(vnc::client::Event::EndOfFrame) => break,
                Some(vnc::client::Event::Disconnected(reason)) => {
                    self.connected.store(false, Ordering::SeqCst);
                    let detail = reason
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "server closed the connection".to_string());
                    return Err(ConnectError::Network(detail));
                }
                Some(_) => {}
                None => {
                    if Instant::now() > deadline {
                        self.connected.store(false, Ordering::SeqCst);
                        return Err(ConnectError::Protocol(
                            "timed out waiting for a full frame".to_string(),
                        ));
                    }
                    thread::sleep(EVENT_POLL);
                }
            }
        }

        Ok(buffer.snapshot())
    }

    /// Fire-and-forget key forwarding. A failed send demotes the
    /// connected flag; the liveness check picks real disconnects up.
    pub fn send_key_event(&self, keysym: u32, pressed: bool) {
        if !self.is_connected() {
            return;
        }
        let mut client = self.client.lock();
        if let Err(e) = client.send_key_event(pressed, keysym) {
            tracing::trace!(error = %e, keysym, "key event dropped");
            self.connected.store(false, Ordering::SeqCst);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Idempotent; the socket closes when the client is dropped.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn width(&self) -> u16 {
        self.size.lock().0
    }

    pub fn height(&self) -> u16 {
        self.size.lock().1
    }
}

mod client;
mod framebuffer;

pub use client::FrameBufferClient;
pub use framebuffer::FrameBuffer;

use crate::error::ConvertError;
use image::RgbaImage;

/// Size of the bitmap container header some wire snapshots carry in
/// front of the pixel rows.
const BITMAP_HEADER_LEN: usize = 54;

/// One full-screen capture of the remote desktop, owned by whoever holds
/// it. The capture worker hands a `Frame` off exactly once and never
/// touches it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u16,
    pub height: u16,
    /// Pixel rows in BGRA order, optionally preceded by a 54-byte
    /// bitmap header when the snapshot came in container form.
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u16, height: u16, data: Vec<u8>) -> Self {
        Self { width, height, data }
    }
}

/// The converted, display-ready image. Replacing the published instance
/// drops the previous backing buffer with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderableImage {
    image: RgbaImage,
}

impl RenderableImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Raw RGBA bytes, row-major, for upload to whatever display surface
    /// consumes the bridge output.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn into_inner(self) -> RgbaImage {
        self.image
    }
}

/// Converts a captured frame into a renderable image.
///
/// Pure and deterministic: the same bytes and dimensions always produce
/// the same output, no shared state, safe from any thread. A leading
/// 54-byte bitmap header (`BM` magic) is stripped before the remainder is
/// read as BGRA.
pub fn to_image(frame: &Frame) -> Result<RenderableImage, ConvertError> {
    let expected = frame.width as usize * frame.height as usize * 4;

    let pixels = if frame.data.len() == BITMAP_HEADER_LEN + expected
        && frame.data.starts_with(b"BM")
    {
        &frame.data[BITMAP_HEADER_LEN..]
    } else {
        &frame.data[..]
    };

    if pixels.len() != expected {
        return Err(ConvertError::Truncated {
            width: frame.width,
            height: frame.height,
            expected,
            actual: pixels.len(),
        });
    }

    let mut rgba = Vec::with_capacity(expected);
    for px in pixels.chunks_exact(4) {
        // BGRA on the wire.
        rgba.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
    }

    // Length was checked above; from_raw only fails on a size mismatch.
    let image = RgbaImage::from_raw(frame.width as u32, frame.height as u32, rgba)
        .ok_or(ConvertError::Truncated {
            width: frame.width,
            height: frame.height,
            expected,
            actual: pixels.len(),
        })?;

    Ok(RenderableImage { image })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bgra_frame(width: u16, height: u16) -> Frame {
        let mut data = Vec::new();
        for i in 0..(width as usize * height as usize) {
            data.extend_from_slice(&[i as u8, 0x20, 0x30, 0xff]);
        }
        Frame::new(width, height, data)
    }

    #[test]
    fn test_round_trip_preserves_dimensions() {
        let img = to_image(&bgra_frame(16, 9)).unwrap();
        assert_eq!(img.width(), 16);
        assert_eq!(img.height(), 9);
        assert_eq!(img.as_raw().len(), 16 * 9 * 4);
    }

    #[test]
    fn test_bgra_channels_are_swizzled_to_rgba() {
        let frame = Frame::new(1, 1, vec![0x01, 0x02, 0x03, 0x04]);
        let img = to_image(&frame).unwrap();
        assert_eq!(img.as_raw(), &[0x03, 0x02, 0x01, 0x04]);
    }

    #[test]
    fn test_bitmap_header_is_stripped() {
        let mut data = vec![0u8; 54];
        data[0] = b'B';
        data[1] = b'M';
        data.extend_from_slice(&[0x01, 0x02, 0x03, 0x04]);
        let img = to_image(&Frame::new(1, 1, data)).unwrap();
        assert_eq!(img.as_raw(), &[0x03, 0x02, 0x01, 0x04]);
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let frame = bgra_frame(8, 8);
        assert_eq!(to_image(&frame).unwrap(), to_image(&frame).unwrap());
    }

    #[test]
    fn test_truncated_buffer_is_an_error() {
        let frame = Frame::new(4, 4, vec![0u8; 7]);
        assert!(matches!(
            to_image(&frame),
            Err(ConvertError::Truncated { expected: 64, actual: 7, .. })
        ));
    }
}

use crate::frame::Frame;

/// Full-frame pixel accumulator in BGRA order. Update rectangles from
/// the server are folded in here; `snapshot` hands out owned copies.
pub struct FrameBuffer {
    width: u16,
    height: u16,
    data: Vec<u8>,
}

impl FrameBuffer {
    pub fn new(width: u16, height: u16) -> Self {
        let size = (width as usize) * (height as usize) * 4;
        Self {
            width,
            height,
            data: vec![0; size],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Replaces the buffer on a server-side resolution change.
    pub fn resize(&mut self, width: u16, height: u16) {
        *self = Self::new(width, height);
    }

    pub fn update_rect(&mut self, x: u16, y: u16, width: u16, height: u16, data: &[u8]) {
        for row in 0..height {
            let src_offset = (row as usize) * (width as usize) * 4;
            let dst_offset =
                ((y as usize + row as usize) * self.width as usize + x as usize) * 4;
            let len = (width as usize) * 4;

            if src_offset + len <= data.len() && dst_offset + len <= self.data.len() {
                self.data[dst_offset..dst_offset + len]
                    .copy_from_slice(&data[src_offset..src_offset + len]);
            }
        }
    }

    /// CopyRect: moves a rectangle within the buffer. Copies through a
    /// staging buffer so overlapping regions stay correct.
    pub fn copy_rect(
        &mut self,
        src_x: u16,
        src_y: u16,
        dst_x: u16,
        dst_y: u16,
        width: u16,
        height: u16,
    ) {
        let len = (width as usize) * 4;
        let mut staged = vec![0u8; len * height as usize];
        for row in 0..height as usize {
            let src = ((src_y as usize + row) * self.width as usize + src_x as usize) * 4;
            if src + len <= self.data.len() {
                staged[row * len..(row + 1) * len].copy_from_slice(&self.data[src..src + len]);
            }
        }
        self.update_rect(dst_x, dst_y, width, height, &staged);
    }

    /// Owned defensive copy of the current contents.
    pub fn snapshot(&self) -> Frame {
        Frame::new(self.width, self.height, self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_rect_writes_into_place() {
        let mut fb = FrameBuffer::new(4, 4);
        fb.update_rect(1, 1, 2, 1, &[1, 2, 3, 4, 5, 6, 7, 8]);
        let frame = fb.snapshot();
        let offset = (1 * 4 + 1) * 4;
        assert_eq!(&frame.data[offset..offset + 8], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_out_of_bounds_rect_is_ignored() {
        let mut fb = FrameBuffer::new(2, 2);
        fb.update_rect(1, 1, 4, 4, &[0xff; 64]);
        // Nothing panicked and in-bounds data is untouched garbage-free.
        assert_eq!(fb.snapshot().data.len(), 2 * 2 * 4);
    }

    #[test]
    fn test_rect_at_the_coordinate_limit_is_ignored() {
        let mut fb = FrameBuffer::new(4, 4);
        // y + height exceeds u16::MAX; rows land out of bounds, no panic.
        fb.update_rect(0, u16::MAX, 1, 2, &[0xff; 8]);
        assert_eq!(fb.snapshot().data, vec![0; 4 * 4 * 4]);
    }

    #[test]
    fn test_copy_rect_moves_pixels() {
        let mut fb = FrameBuffer::new(4, 1);
        fb.update_rect(0, 0, 1, 1, &[9, 9, 9, 9]);
        fb.copy_rect(0, 0, 2, 0, 1, 1);
        let frame = fb.snapshot();
        assert_eq!(&frame.data[8..12], &[9, 9, 9, 9]);
    }

    #[test]
    fn test_snapshot_is_a_defensive_copy() {
        let mut fb = FrameBuffer::new(2, 2);
        let before = fb.snapshot();
        fb.update_rect(0, 0, 2, 2, &[0xaa; 16]);
        assert_ne!(before, fb.snapshot());
    }
}

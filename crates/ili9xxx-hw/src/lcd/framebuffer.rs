//! Lazily allocated frame buffer in one of the three stored layouts.

use super::color::ColorMode;
use crate::{Error, Result};

/// Byte frame buffer of `width * height * bytes_per_pixel` bytes.
///
/// Nothing is allocated until the first pixel write or fill.
#[derive(Clone)]
pub struct Framebuffer {
    /// Pixel data, `None` until allocated.
    data: Option<Vec<u8>>,
    width: u16,
    height: u16,
    mode: ColorMode,
    /// Upper bound on the allocation, if the target has one.
    limit: Option<usize>,
}

impl Framebuffer {
    /// Creates an unallocated frame buffer.
    pub fn new(width: u16, height: u16, mode: ColorMode) -> Self {
        Self {
            data: None,
            width,
            height,
            mode,
            limit: None,
        }
    }

    /// Caps the allocation at `limit` bytes.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Size of the buffer in bytes once allocated.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.mode.bytes_per_pixel()
    }

    /// Returns true once the buffer exists.
    pub fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    /// Allocates the buffer on first call; later calls do nothing.
    pub fn ensure_allocated(&mut self) -> Result<()> {
        if self.data.is_some() {
            return Ok(());
        }
        let bytes = self.byte_len();
        if let Some(limit) = self.limit {
            if bytes > limit {
                return Err(Error::BufferTooLarge { bytes, limit });
            }
        }
        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|source| Error::Allocation { bytes, source })?;
        data.resize(bytes, 0);
        self.data = Some(data);
        Ok(())
    }

    /// Raw bytes, if allocated.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Stores `value` at `(x, y)` and reports whether any stored byte changed.
    ///
    /// Out of bounds coordinates and an unallocated buffer are ignored.
    pub fn set_pixel(&mut self, x: u16, y: u16, value: u16) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = self.index(x, y);
        let mode = self.mode;
        let Some(data) = self.data.as_mut() else {
            return false;
        };
        match mode {
            ColorMode::Rgb565 => {
                let pos = idx * 2;
                let bytes = value.to_be_bytes();
                let changed = data[pos] != bytes[0] || data[pos + 1] != bytes[1];
                data[pos] = bytes[0];
                data[pos + 1] = bytes[1];
                changed
            }
            ColorMode::Indexed8 | ColorMode::Rgb332 => {
                let byte = value as u8;
                let changed = data[idx] != byte;
                data[idx] = byte;
                changed
            }
        }
    }

    /// Stored value at `(x, y)`.
    pub fn get_pixel(&self, x: u16, y: u16) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let data = self.data.as_ref()?;
        Some(Self::stored_at(data, self.mode, self.index(x, y)))
    }

    /// Stored value at pixel index `idx` of `data` laid out as `mode`.
    #[inline]
    pub(crate) fn stored_at(data: &[u8], mode: ColorMode, idx: usize) -> u16 {
        match mode {
            ColorMode::Rgb565 => u16::from_be_bytes([data[idx * 2], data[idx * 2 + 1]]),
            ColorMode::Indexed8 | ColorMode::Rgb332 => data[idx] as u16,
        }
    }

    /// Writes `value` to every pixel. Does nothing when unallocated.
    pub fn fill(&mut self, value: u16) {
        let mode = self.mode;
        let Some(data) = self.data.as_mut() else {
            return;
        };
        match mode {
            ColorMode::Rgb565 => {
                let [hi, lo] = value.to_be_bytes();
                if hi == lo {
                    data.fill(hi);
                } else {
                    for chunk in data.chunks_exact_mut(2) {
                        chunk[0] = hi;
                        chunk[1] = lo;
                    }
                }
            }
            ColorMode::Indexed8 | ColorMode::Rgb332 => data.fill(value as u8),
        }
    }

    /// Bytes covering full rows `y_low..=y_high`.
    pub fn rows(&self, y_low: u16, y_high: u16) -> Option<&[u8]> {
        let data = self.data.as_ref()?;
        let stride = self.width as usize * self.mode.bytes_per_pixel();
        let start = y_low as usize * stride;
        let end = (y_high as usize + 1) * stride;
        data.get(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_allocation() {
        let mut fb = Framebuffer::new(320, 240, ColorMode::Rgb565);
        assert!(!fb.is_allocated());
        assert_eq!(fb.byte_len(), 320 * 240 * 2);
        assert!(fb.data().is_none());

        fb.ensure_allocated().unwrap();
        assert!(fb.is_allocated());
        assert_eq!(fb.data().unwrap().len(), 320 * 240 * 2);

        // Second call keeps the existing contents.
        fb.set_pixel(1, 1, 0xABCD);
        fb.ensure_allocated().unwrap();
        assert_eq!(fb.get_pixel(1, 1), Some(0xABCD));
    }

    #[test]
    fn test_allocation_limit() {
        let mut fb = Framebuffer::new(320, 240, ColorMode::Rgb565).with_limit(Some(1024));
        assert!(matches!(
            fb.ensure_allocated(),
            Err(Error::BufferTooLarge { limit: 1024, .. })
        ));
        assert!(!fb.is_allocated());
    }

    #[test]
    fn test_set_pixel_reports_change() {
        let mut fb = Framebuffer::new(10, 10, ColorMode::Rgb565);
        fb.ensure_allocated().unwrap();
        assert!(fb.set_pixel(3, 4, 0xF800));
        assert!(!fb.set_pixel(3, 4, 0xF800));
        // Only the low byte differs.
        assert!(fb.set_pixel(3, 4, 0xF801));
        assert_eq!(fb.get_pixel(3, 4), Some(0xF801));
        let data = fb.data().unwrap();
        let pos = (4 * 10 + 3) * 2;
        assert_eq!(&data[pos..pos + 2], &[0xF8, 0x01]);
    }

    #[test]
    fn test_out_of_bounds_ignored() {
        let mut fb = Framebuffer::new(10, 10, ColorMode::Rgb332);
        fb.ensure_allocated().unwrap();
        assert!(!fb.set_pixel(10, 0, 0xFF));
        assert!(!fb.set_pixel(0, 10, 0xFF));
        assert_eq!(fb.get_pixel(10, 0), None);
    }

    #[test]
    fn test_fill_16bit() {
        let mut fb = Framebuffer::new(4, 3, ColorMode::Rgb565);
        fb.ensure_allocated().unwrap();
        fb.fill(0xF800);
        assert!(fb.data().unwrap().chunks(2).all(|c| c == [0xF8, 0x00]));
        fb.fill(0xFFFF);
        assert!(fb.data().unwrap().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_fill_8bit() {
        let mut fb = Framebuffer::new(4, 3, ColorMode::Indexed8);
        fb.ensure_allocated().unwrap();
        fb.fill(7);
        assert_eq!(fb.data().unwrap(), &[7u8; 12][..]);
    }

    #[test]
    fn test_rows_slice() {
        let mut fb = Framebuffer::new(4, 3, ColorMode::Rgb565);
        fb.ensure_allocated().unwrap();
        fb.set_pixel(0, 1, 0x1234);
        let rows = fb.rows(1, 2).unwrap();
        assert_eq!(rows.len(), 16);
        assert_eq!(&rows[0..2], &[0x12, 0x34]);
    }
}

//! Chooses how to transmit a dirty region.
//!
//! A single write sends whole rows straight out of a 16-bit frame buffer. A
//! multiple write sends only the dirty rectangle, converting pixels through a
//! small staging buffer. Both are costed by an estimate in microseconds.

use super::color::ColorMode;
use super::dirty::DirtyRegion;

/// Estimated fixed overhead of one bus write, in microseconds.
pub const SPI_SETUP_US: usize = 100;

/// Largest contiguous bus transfer.
pub const SPI_MAX_BLOCK_SIZE: usize = 4092;

/// Staging buffer size. Divisible by 2 and 3 so wire pixels never straddle
/// two writes.
pub const TRANSFER_BUFFER_SIZE: usize = 126;

/// Transfer strategy for one flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Full-width rows sent directly from the frame buffer.
    SingleWrite,
    /// Dirty rectangle converted through the staging buffer.
    MultipleWrite,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::SingleWrite => write!(f, "single write"),
            Strategy::MultipleWrite => write!(f, "multiple write"),
        }
    }
}

/// Cost estimates for both strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferEstimate {
    /// Cost of sending full rows, in microseconds.
    pub single_us: usize,
    /// Cost of sending the rectangle through the staging buffer.
    pub multiple_us: usize,
}

/// Estimates both strategies for `region` on a panel `panel_width` wide.
pub fn estimate(panel_width: u16, region: &DirtyRegion, data_rate: u32) -> TransferEstimate {
    let w = region.width();
    let h = region.height();
    let mhz = ((data_rate / 1_000_000) as usize).max(1);
    let row_pixels = panel_width as usize * h;
    let rect_pixels = w * h;

    let single_us =
        row_pixels * 16 / mhz + row_pixels * 2 / SPI_MAX_BLOCK_SIZE * SPI_SETUP_US * 2;
    let multiple_us =
        rect_pixels * 16 / mhz + rect_pixels * 2 / TRANSFER_BUFFER_SIZE * SPI_SETUP_US;

    TransferEstimate {
        single_us,
        multiple_us,
    }
}

/// Picks the strategy. Single writes need the frame buffer to already be in
/// 16-bit wire format and must be strictly cheaper.
pub fn select(mode: ColorMode, is_18bit: bool, estimate: &TransferEstimate) -> Strategy {
    if mode == ColorMode::Rgb565 && !is_18bit && estimate.single_us < estimate.multiple_us {
        Strategy::SingleWrite
    } else {
        Strategy::MultipleWrite
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_panel(width: u16, height: u16) -> DirtyRegion {
        let mut region = DirtyRegion::new(width, height);
        region.mark_all();
        region
    }

    #[test]
    fn test_full_panel_prefers_single_write() {
        let region = full_panel(320, 240);
        let est = estimate(320, &region, 40_000_000);
        assert_eq!(est.single_us, 30720 + 37 * 200);
        assert_eq!(est.multiple_us, 30720 + 1219 * 100);
        assert_eq!(
            select(ColorMode::Rgb565, false, &est),
            Strategy::SingleWrite
        );
    }

    #[test]
    fn test_single_pixel_prefers_multiple_write() {
        let mut region = DirtyRegion::new(320, 240);
        region.on_pixel_changed(100, 100);
        let est = estimate(320, &region, 40_000_000);
        assert_eq!(est.single_us, 128);
        assert_eq!(est.multiple_us, 0);
        assert_eq!(
            select(ColorMode::Rgb565, false, &est),
            Strategy::MultipleWrite
        );
    }

    #[test]
    fn test_single_write_needs_native_format() {
        let region = full_panel(320, 240);
        let est = estimate(320, &region, 40_000_000);
        assert_eq!(select(ColorMode::Rgb565, true, &est), Strategy::MultipleWrite);
        assert_eq!(select(ColorMode::Rgb332, false, &est), Strategy::MultipleWrite);
        assert_eq!(
            select(ColorMode::Indexed8, false, &est),
            Strategy::MultipleWrite
        );
    }

    #[test]
    fn test_equal_cost_prefers_multiple_write() {
        let est = TransferEstimate {
            single_us: 10,
            multiple_us: 10,
        };
        assert_eq!(select(ColorMode::Rgb565, false, &est), Strategy::MultipleWrite);
    }

    #[test]
    fn test_slow_clock_does_not_divide_by_zero() {
        let region = full_panel(8, 8);
        let est = estimate(8, &region, 500_000);
        assert_eq!(est.single_us, 64 * 16);
    }
}

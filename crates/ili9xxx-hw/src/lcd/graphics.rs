//! embedded-graphics drawing into the frame buffer.

use embedded_graphics_core::pixelcolor::{Rgb565, Rgb888, RgbColor};
use embedded_graphics_core::prelude::{DrawTarget, OriginDimensions, Pixel, Point, Size};

use super::bus::{Bus, Host};
use super::color::Color;
use super::device::Ili9xxx;
use crate::Error;

impl From<Rgb565> for Color {
    fn from(color: Rgb565) -> Self {
        let rgb = Rgb888::from(color);
        Color::new(rgb.r(), rgb.g(), rgb.b())
    }
}

impl<B: Bus, H: Host> DrawTarget for Ili9xxx<B, H> {
    type Color = Rgb565;
    type Error = Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(Point { x, y }, color) in pixels {
            self.write_pixel(x, y, color.into())?;
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color.into())
    }
}

impl<B: Bus, H: Host> OriginDimensions for Ili9xxx<B, H> {
    fn size(&self) -> Size {
        Size::new(self.width() as u32, self.height() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lcd::capture::{CaptureBus, CountingHost};
    use crate::lcd::device::DriverConfig;

    fn driver() -> Ili9xxx<CaptureBus, CountingHost> {
        let config = DriverConfig {
            width: 20,
            height: 10,
            ..Default::default()
        };
        Ili9xxx::new(CaptureBus::new(40_000_000), CountingHost::default(), config)
    }

    #[test]
    fn test_size() {
        assert_eq!(driver().size(), Size::new(20, 10));
    }

    #[test]
    fn test_draw_iter_clips_and_marks_dirty() {
        let mut d = driver();
        d.draw_iter([
            Pixel(Point::new(2, 3), Rgb565::RED),
            Pixel(Point::new(-4, 3), Rgb565::RED),
            Pixel(Point::new(7, 8), Rgb565::GREEN),
        ])
        .unwrap();
        assert_eq!(d.dirty_region().bounds(), Some((2, 3, 7, 8)));
        assert_eq!(d.framebuffer().get_pixel(2, 3), Some(0xF800));
        assert_eq!(d.framebuffer().get_pixel(7, 8), Some(0x07E0));
    }

    #[test]
    fn test_clear_fills() {
        let mut d = driver();
        d.clear(Rgb565::BLUE).unwrap();
        assert_eq!(d.dirty_region().bounds(), Some((0, 0, 19, 9)));
        assert_eq!(d.framebuffer().get_pixel(19, 9), Some(0x001F));
    }
}

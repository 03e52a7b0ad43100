//! Pixel format conversion between generic colors, frame buffer layouts and
//! wire colors.

use crate::{Error, Result};
use std::str::FromStr;

/// A 24-bit RGB color as handed in by the graphics layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);

    /// Creates a color from 8-bit channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packs to RGB565.
    #[inline]
    pub fn to_565(self) -> u16 {
        rgb888_to_rgb565(self.r, self.g, self.b)
    }

    /// Packs to RGB332.
    #[inline]
    pub fn to_332(self) -> u8 {
        (self.r & 0xE0) | ((self.g & 0xE0) >> 3) | (self.b >> 6)
    }

    /// Expands an RGB565 value.
    #[inline]
    pub fn from_565(pixel: u16) -> Self {
        let (r, g, b) = rgb565_to_rgb888(pixel);
        Self { r, g, b }
    }

    /// Expands an RGB332 value, scaling each field to the full 8-bit range.
    #[inline]
    pub fn from_332(value: u8) -> Self {
        Self {
            r: scale(((value >> 5) & 0x07) as u16, 7),
            g: scale(((value >> 2) & 0x07) as u16, 7),
            b: scale((value & 0x03) as u16, 3),
        }
    }

    /// Parses `#RRGGBB` or `RRGGBB`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self::new(r, g, b))
    }

    fn distance_sq(self, other: Color) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

#[inline]
fn scale(value: u16, max: u16) -> u8 {
    (value * 255 / max) as u8
}

/// Converts RGB888 to RGB565.
#[inline]
pub fn rgb888_to_rgb565(r: u8, g: u8, b: u8) -> u16 {
    let r5 = (r >> 3) as u16;
    let g6 = (g >> 2) as u16;
    let b5 = (b >> 3) as u16;
    (r5 << 11) | (g6 << 5) | b5
}

/// Converts RGB565 to RGB888.
#[inline]
pub fn rgb565_to_rgb888(pixel: u16) -> (u8, u8, u8) {
    let r = ((pixel >> 11) & 0x1F) as u8;
    let g = ((pixel >> 5) & 0x3F) as u8;
    let b = (pixel & 0x1F) as u8;
    let r8 = (r << 3) | (r >> 2);
    let g8 = (g << 2) | (g >> 4);
    let b8 = (b << 3) | (b >> 2);
    (r8, g8, b8)
}

/// Expands a 565 wire color into the three bytes an 18-bit panel expects.
///
/// The channels are shifted out of the 565 value rather than reconverted from
/// the original color, so the low bit of red and blue is always zero.
#[inline]
pub fn rgb565_to_wire18(pixel: u16) -> [u8; 3] {
    [
        ((pixel & 0xF800) >> 8) as u8,
        ((pixel & 0x07E0) >> 3) as u8,
        (pixel << 3) as u8,
    ]
}

/// Frame buffer layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// One byte per pixel, index into a palette.
    Indexed8,
    /// One byte per pixel, packed 3-3-2.
    Rgb332,
    /// Two bytes per pixel, 5-6-5 stored high byte first.
    #[default]
    Rgb565,
}

impl ColorMode {
    /// Bytes each pixel occupies in the frame buffer.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ColorMode::Indexed8 | ColorMode::Rgb332 => 1,
            ColorMode::Rgb565 => 2,
        }
    }
}

impl FromStr for ColorMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "indexed8" | "8bit-indexed" | "8bit_indexed" => Ok(ColorMode::Indexed8),
            "rgb332" | "8bit" => Ok(ColorMode::Rgb332),
            "rgb565" | "16bit" => Ok(ColorMode::Rgb565),
            _ => Err(Error::InvalidColorMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for ColorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorMode::Indexed8 => write!(f, "8bit Indexed"),
            ColorMode::Rgb332 => write!(f, "8bit 332 mode"),
            ColorMode::Rgb565 => write!(f, "16bit"),
        }
    }
}

/// A 256-entry RGB888 palette for indexed mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<Color>,
}

impl Palette {
    /// Builds a palette from packed `[r, g, b, r, g, b, ...]` bytes. A trailing
    /// partial entry is ignored and at most 256 entries are kept.
    pub fn from_rgb888(bytes: &[u8]) -> Self {
        let entries = bytes
            .chunks_exact(3)
            .take(256)
            .map(|c| Color::new(c[0], c[1], c[2]))
            .collect();
        Self { entries }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the palette has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the closest entry; ties go to the lowest index.
    pub fn nearest_index(&self, color: Color) -> u8 {
        let mut best = 0usize;
        let mut best_distance = u32::MAX;
        for (i, entry) in self.entries.iter().enumerate() {
            let d = entry.distance_sq(color);
            if d < best_distance {
                best = i;
                best_distance = d;
                if d == 0 {
                    break;
                }
            }
        }
        best as u8
    }

    /// Color stored at `index`, black when the palette is shorter.
    pub fn color(&self, index: u8) -> Color {
        self.entries
            .get(index as usize)
            .copied()
            .unwrap_or(Color::BLACK)
    }
}

/// Converts between colors and stored frame buffer values for one mode.
///
/// Indexed mode without a palette stores and decodes RGB332 values, so the
/// indices behave like a fixed 3-3-2 palette.
#[derive(Debug, Clone)]
pub struct PixelConverter {
    mode: ColorMode,
    palette: Option<Palette>,
}

impl PixelConverter {
    /// Creates a converter for `mode`.
    pub fn new(mode: ColorMode, palette: Option<Palette>) -> Self {
        Self { mode, palette }
    }

    /// Returns the frame buffer layout.
    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    /// Stored value for `color`. Only the low byte is used in 8-bit modes.
    pub fn to_buffer_value(&self, color: Color) -> u16 {
        match self.mode {
            ColorMode::Indexed8 => match &self.palette {
                Some(palette) => palette.nearest_index(color) as u16,
                None => color.to_332() as u16,
            },
            ColorMode::Rgb332 => color.to_332() as u16,
            ColorMode::Rgb565 => color.to_565(),
        }
    }

    /// 565 wire color for a stored value.
    pub fn to_wire565(&self, stored: u16) -> u16 {
        match self.mode {
            ColorMode::Indexed8 => {
                let color = match &self.palette {
                    Some(palette) => palette.color(stored as u8),
                    None => Color::from_332(stored as u8),
                };
                color.to_565()
            }
            ColorMode::Rgb332 => Color::from_332(stored as u8).to_565(),
            ColorMode::Rgb565 => stored,
        }
    }
}

/// Channel order of externally supplied pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorOrder {
    #[default]
    Rgb,
    Bgr,
}

/// Bit depth of externally supplied pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorBitness {
    Rgb332,
    #[default]
    Rgb565,
    Rgb888,
}

impl ColorBitness {
    /// Bytes each source pixel occupies.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ColorBitness::Rgb332 => 1,
            ColorBitness::Rgb565 => 2,
            ColorBitness::Rgb888 => 3,
        }
    }
}

/// Layout of a caller-supplied pixel block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFormat {
    pub order: ColorOrder,
    pub bitness: ColorBitness,
    pub big_endian: bool,
}

impl SourceFormat {
    /// The panel's native wire format.
    pub const NATIVE: SourceFormat = SourceFormat {
        order: ColorOrder::Rgb,
        bitness: ColorBitness::Rgb565,
        big_endian: true,
    };

    /// Decodes the pixel starting at `bytes[0]`.
    pub fn decode(&self, bytes: &[u8]) -> Color {
        let color = match self.bitness {
            ColorBitness::Rgb332 => Color::from_332(bytes[0]),
            ColorBitness::Rgb565 => {
                let pixel = if self.big_endian {
                    u16::from_be_bytes([bytes[0], bytes[1]])
                } else {
                    u16::from_le_bytes([bytes[0], bytes[1]])
                };
                Color::from_565(pixel)
            }
            ColorBitness::Rgb888 => Color::new(bytes[0], bytes[1], bytes[2]),
        };
        match self.order {
            ColorOrder::Rgb => color,
            ColorOrder::Bgr => Color::new(color.b, color.g, color.r),
        }
    }
}

impl Default for SourceFormat {
    fn default() -> Self {
        Self::NATIVE
    }
}

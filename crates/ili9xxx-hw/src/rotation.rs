//! Display rotation support.
//!
//! Rotation is done by the controller through the MADCTL register: rows and
//! columns can be exchanged and either axis mirrored. The driver itself never
//! rotates pixels in software.

use crate::{Error, Result};
use std::str::FromStr;

/// MADCTL row address order (mirror Y).
pub const MADCTL_MY: u8 = 0x80;
/// MADCTL column address order (mirror X).
pub const MADCTL_MX: u8 = 0x40;
/// MADCTL row/column exchange.
pub const MADCTL_MV: u8 = 0x20;
/// MADCTL BGR color filter order.
pub const MADCTL_BGR: u8 = 0x08;

/// Display rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    /// Controller native orientation.
    #[default]
    Deg0,
    /// Rotated 90° clockwise.
    Deg90,
    /// Rotated 180°.
    Deg180,
    /// Rotated 270° clockwise.
    Deg270,
}

impl Rotation {
    /// Returns the MADCTL address-order bits for this rotation.
    pub fn madctl_bits(&self) -> u8 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => MADCTL_MV | MADCTL_MX,
            Rotation::Deg180 => MADCTL_MX | MADCTL_MY,
            Rotation::Deg270 => MADCTL_MV | MADCTL_MY,
        }
    }

    /// Returns true if rows and columns are exchanged.
    pub fn swaps_axes(&self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    /// Returns the logical dimensions for a panel of native `width` x `height`.
    pub fn dimensions(&self, width: u16, height: u16) -> (u16, u16) {
        if self.swaps_axes() {
            (height, width)
        } else {
            (width, height)
        }
    }
}

/// Builds the MADCTL byte for a rotation with optional mirroring and BGR order.
pub fn madctl(rotation: Rotation, mirror_x: bool, mirror_y: bool, bgr: bool) -> u8 {
    let mut value = rotation.madctl_bits();
    if mirror_x {
        value ^= MADCTL_MX;
    }
    if mirror_y {
        value ^= MADCTL_MY;
    }
    if bgr {
        value |= MADCTL_BGR;
    }
    value
}

impl FromStr for Rotation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().trim_end_matches("deg") {
            "0" => Ok(Rotation::Deg0),
            "90" => Ok(Rotation::Deg90),
            "180" => Ok(Rotation::Deg180),
            "270" => Ok(Rotation::Deg270),
            _ => Err(Error::InvalidRotation(s.to_string())),
        }
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rotation::Deg0 => write!(f, "0"),
            Rotation::Deg90 => write!(f, "90"),
            Rotation::Deg180 => write!(f, "180"),
            Rotation::Deg270 => write!(f, "270"),
        }
    }
}

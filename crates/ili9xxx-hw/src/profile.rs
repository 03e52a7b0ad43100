//! Panel profiles.
//!
//! Every supported controller/board combination is plain data: an init table,
//! default geometry and two flags. Selecting a model picks one of these.

use crate::lcd::protocol::*;
use crate::{Error, Result};
use std::str::FromStr;

/// Static description of a panel model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelProfile {
    /// Initialization table, see [`InitTable`](crate::lcd::protocol::InitTable).
    pub init_table: &'static [u8],
    /// Width used when none is configured.
    pub default_width: u16,
    /// Height used when none is configured.
    pub default_height: u16,
    /// Whether the panel needs inversion on to show true colors.
    pub invert_on_init: bool,
    /// Whether the panel takes 3-byte pixels.
    pub is_18bit: bool,
}

/// Supported panel models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelModel {
    M5Stack,
    M5Core,
    St7789v,
    #[default]
    Ili9341,
    Ili9342,
    Ili9481,
    Ili9481_18,
    Ili9486,
    Ili9488,
    Ili9488A,
    St7796,
    S3Box,
    S3BoxLite,
}

impl PanelModel {
    /// All models, in display order.
    pub const ALL: [PanelModel; 13] = [
        PanelModel::M5Stack,
        PanelModel::M5Core,
        PanelModel::St7789v,
        PanelModel::Ili9341,
        PanelModel::Ili9342,
        PanelModel::Ili9481,
        PanelModel::Ili9481_18,
        PanelModel::Ili9486,
        PanelModel::Ili9488,
        PanelModel::Ili9488A,
        PanelModel::St7796,
        PanelModel::S3Box,
        PanelModel::S3BoxLite,
    ];

    /// Returns the profile for this model.
    pub fn profile(&self) -> PanelProfile {
        let (init_table, default_width, default_height, invert_on_init, is_18bit) = match self {
            PanelModel::M5Stack => (INITCMD_M5STACK, 320, 240, true, false),
            PanelModel::M5Core => (INITCMD_M5CORE, 320, 240, true, false),
            PanelModel::St7789v => (INITCMD_ST7789V, 240, 320, false, false),
            PanelModel::Ili9341 => (INITCMD_ILI9341, 240, 320, false, false),
            PanelModel::Ili9342 => (INITCMD_ILI9341, 320, 240, false, false),
            PanelModel::Ili9481 => (INITCMD_ILI9481, 480, 320, false, false),
            PanelModel::Ili9481_18 => (INITCMD_ILI9481_18, 320, 480, false, true),
            PanelModel::Ili9486 => (INITCMD_ILI9486, 480, 320, false, false),
            PanelModel::Ili9488 => (INITCMD_ILI9488, 480, 320, false, true),
            PanelModel::Ili9488A => (INITCMD_ILI9488_A, 480, 320, false, true),
            PanelModel::St7796 => (INITCMD_ST7796, 320, 480, false, false),
            PanelModel::S3Box => (INITCMD_S3BOX, 320, 240, false, false),
            PanelModel::S3BoxLite => (INITCMD_S3BOXLITE, 320, 240, true, false),
        };
        PanelProfile {
            init_table,
            default_width,
            default_height,
            invert_on_init,
            is_18bit,
        }
    }
}

impl FromStr for PanelModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.to_lowercase().replace('_', "-");
        PanelModel::ALL
            .iter()
            .find(|m| m.to_string() == name)
            .copied()
            .ok_or_else(|| Error::InvalidModel(s.to_string()))
    }
}

impl std::fmt::Display for PanelModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PanelModel::M5Stack => "m5stack",
            PanelModel::M5Core => "m5core",
            PanelModel::St7789v => "st7789v",
            PanelModel::Ili9341 => "ili9341",
            PanelModel::Ili9342 => "ili9342",
            PanelModel::Ili9481 => "ili9481",
            PanelModel::Ili9481_18 => "ili9481-18",
            PanelModel::Ili9486 => "ili9486",
            PanelModel::Ili9488 => "ili9488",
            PanelModel::Ili9488A => "ili9488-a",
            PanelModel::St7796 => "st7796",
            PanelModel::S3Box => "s3box",
            PanelModel::S3BoxLite => "s3boxlite",
        };
        write!(f, "{}", name)
    }
}

const D: u8 = INIT_DELAY_FLAG;

#[rustfmt::skip]
static INITCMD_ILI9341: &[u8] = &[
    0xEF, 3, 0x03, 0x80, 0x02,
    0xCF, 3, 0x00, 0xC1, 0x30,
    0xED, 4, 0x64, 0x03, 0x12, 0x81,
    0xE8, 3, 0x85, 0x00, 0x78,
    0xCB, 5, 0x39, 0x2C, 0x00, 0x34, 0x02,
    0xF7, 1, 0x20,
    0xEA, 2, 0x00, 0x00,
    PWCTR1, 1, 0x23,
    PWCTR2, 1, 0x10,
    VMCTR1, 2, 0x3E, 0x28,
    VMCTR2, 1, 0x86,
    MADCTL, 1, 0x48,
    PIXFMT, 1, 0x55,
    FRMCTR1, 2, 0x00, 0x18,
    DFUNCTR, 3, 0x08, 0x82, 0x27,
    0xF2, 1, 0x00,
    GAMMASET, 1, 0x01,
    GMCTRP1, 15, 0x0F, 0x31, 0x2B, 0x0C, 0x0E, 0x08, 0x4E, 0xF1,
                 0x37, 0x07, 0x10, 0x03, 0x0E, 0x09, 0x00,
    GMCTRN1, 15, 0x00, 0x0E, 0x14, 0x03, 0x11, 0x07, 0x31, 0xC1,
                 0x48, 0x08, 0x0F, 0x0C, 0x31, 0x36, 0x0F,
    SLPOUT, D,
    DISPON, D,
    0x00,
];

#[rustfmt::skip]
static INITCMD_M5STACK: &[u8] = &[
    0xEF, 3, 0x03, 0x80, 0x02,
    0xCF, 3, 0x00, 0xC1, 0x30,
    0xED, 4, 0x64, 0x03, 0x12, 0x81,
    0xE8, 3, 0x85, 0x00, 0x78,
    0xCB, 5, 0x39, 0x2C, 0x00, 0x34, 0x02,
    0xF7, 1, 0x20,
    0xEA, 2, 0x00, 0x00,
    PWCTR1, 1, 0x23,
    PWCTR2, 1, 0x10,
    VMCTR1, 2, 0x3E, 0x28,
    VMCTR2, 1, 0x86,
    MADCTL, 1, 0x08,
    PIXFMT, 1, 0x55,
    FRMCTR1, 2, 0x00, 0x13,
    DFUNCTR, 3, 0x08, 0x82, 0x27,
    0xF2, 1, 0x00,
    GAMMASET, 1, 0x01,
    GMCTRP1, 15, 0x0F, 0x31, 0x2B, 0x0C, 0x0E, 0x08, 0x4E, 0xF1,
                 0x37, 0x07, 0x10, 0x03, 0x0E, 0x09, 0x00,
    GMCTRN1, 15, 0x00, 0x0E, 0x14, 0x03, 0x11, 0x07, 0x31, 0xC1,
                 0x48, 0x08, 0x0F, 0x0C, 0x31, 0x36, 0x0F,
    SLPOUT, D,
    DISPON, D,
    0x00,
];

#[rustfmt::skip]
static INITCMD_M5CORE: &[u8] = &[
    0xC8, 3, 0xFF, 0x93, 0x42,
    PWCTR1, 2, 0x12, 0x12,
    PWCTR2, 1, 0x03,
    VMCTR1, 1, 0xF2,
    0xB0, 1, 0xE0,
    0xF6, 3, 0x01, 0x00, 0x00,
    GMCTRP1, 15, 0x00, 0x0C, 0x11, 0x04, 0x11, 0x08, 0x37, 0x89,
                 0x4C, 0x06, 0x0C, 0x0A, 0x2E, 0x34, 0x0F,
    GMCTRN1, 15, 0x00, 0x0B, 0x11, 0x05, 0x13, 0x09, 0x33, 0x67,
                 0x48, 0x07, 0x0E, 0x0B, 0x2E, 0x33, 0x0F,
    DFUNCTR, 4, 0x08, 0x82, 0x1D, 0x04,
    MADCTL, 1, 0x08,
    PIXFMT, 1, 0x55,
    SLPOUT, D,
    DISPON, D,
    0x00,
];

#[rustfmt::skip]
static INITCMD_ST7789V: &[u8] = &[
    SLPOUT, D,
    0xB2, 5, 0x0C, 0x0C, 0x00, 0x33, 0x33,
    0xB7, 1, 0x35,
    0xBB, 1, 0x19,
    0xC0, 1, 0x2C,
    0xC2, 1, 0x01,
    0xC3, 1, 0x12,
    0xC4, 1, 0x20,
    0xC6, 1, 0x0F,
    0xD0, 2, 0xA4, 0xA1,
    GMCTRP1, 14, 0xD0, 0x04, 0x0D, 0x11, 0x13, 0x2B, 0x3F, 0x54,
                 0x4C, 0x18, 0x0D, 0x0B, 0x1F, 0x23,
    GMCTRN1, 14, 0xD0, 0x04, 0x0C, 0x11, 0x13, 0x2C, 0x3F, 0x44,
                 0x51, 0x2F, 0x1F, 0x1F, 0x20, 0x23,
    MADCTL, 1, 0x00,
    PIXFMT, 1, 0x55,
    NORON, D,
    DISPON, D,
    0x00,
];

#[rustfmt::skip]
static INITCMD_ILI9481: &[u8] = &[
    SLPOUT, D,
    0xD0, 3, 0x07, 0x42, 0x18,
    0xD1, 3, 0x00, 0x07, 0x10,
    0xD2, 2, 0x01, 0x02,
    PWCTR1, 5, 0x10, 0x3B, 0x00, 0x02, 0x11,
    VMCTR1, 1, 0x03,
    0xC8, 12, 0x00, 0x32, 0x36, 0x45, 0x06, 0x16, 0x37, 0x75,
              0x77, 0x54, 0x0C, 0x00,
    MADCTL, 1, 0x0A,
    PIXFMT, 1, 0x55,
    DISPON, D,
    0x00,
];

#[rustfmt::skip]
static INITCMD_ILI9481_18: &[u8] = &[
    SLPOUT, D,
    0xD0, 3, 0x07, 0x42, 0x18,
    0xD1, 3, 0x00, 0x07, 0x10,
    0xD2, 2, 0x01, 0x02,
    PWCTR1, 5, 0x10, 0x3B, 0x00, 0x02, 0x11,
    VMCTR1, 1, 0x03,
    0xC8, 12, 0x00, 0x32, 0x36, 0x45, 0x06, 0x16, 0x37, 0x75,
              0x77, 0x54, 0x0C, 0x00,
    MADCTL, 1, 0x0A,
    PIXFMT, 1, 0x66,
    DISPON, D,
    0x00,
];

#[rustfmt::skip]
static INITCMD_ILI9486: &[u8] = &[
    SLPOUT, D,
    PIXFMT, 1, 0x55,
    0xC2, 1, 0x44,
    VMCTR1, 4, 0x00, 0x00, 0x00, 0x00,
    GMCTRP1, 15, 0x0F, 0x1F, 0x1C, 0x0C, 0x0F, 0x08, 0x48, 0x98,
                 0x37, 0x0A, 0x13, 0x04, 0x11, 0x0D, 0x00,
    GMCTRN1, 15, 0x0F, 0x32, 0x2E, 0x0B, 0x0D, 0x05, 0x47, 0x75,
                 0x37, 0x06, 0x10, 0x03, 0x24, 0x20, 0x00,
    MADCTL, 1, 0x48,
    DISPON, D,
    0x00,
];

#[rustfmt::skip]
static INITCMD_ILI9488: &[u8] = &[
    GMCTRP1, 15, 0x00, 0x03, 0x09, 0x08, 0x16, 0x0A, 0x3F, 0x78,
                 0x4C, 0x09, 0x0A, 0x08, 0x16, 0x1A, 0x0F,
    GMCTRN1, 15, 0x00, 0x16, 0x19, 0x03, 0x0F, 0x05, 0x32, 0x45,
                 0x46, 0x04, 0x0E, 0x0D, 0x35, 0x37, 0x0F,
    PWCTR1, 2, 0x17, 0x15,
    PWCTR2, 1, 0x41,
    VMCTR1, 3, 0x00, 0x12, 0x80,
    MADCTL, 1, 0x48,
    PIXFMT, 1, 0x66,
    0xB0, 1, 0x00,
    FRMCTR1, 1, 0xA0,
    0xB4, 1, 0x02,
    DFUNCTR, 3, 0x02, 0x02, 0x3B,
    0xB7, 1, 0xC6,
    0xF7, 4, 0xA9, 0x51, 0x2C, 0x82,
    SLPOUT, D,
    DISPON, D,
    0x00,
];

#[rustfmt::skip]
static INITCMD_ILI9488_A: &[u8] = &[
    GMCTRP1, 15, 0x00, 0x04, 0x0E, 0x08, 0x17, 0x0A, 0x40, 0x79,
                 0x4D, 0x07, 0x0E, 0x0A, 0x1A, 0x1D, 0x0F,
    GMCTRN1, 15, 0x00, 0x1B, 0x1F, 0x02, 0x10, 0x05, 0x32, 0x34,
                 0x43, 0x02, 0x0A, 0x09, 0x33, 0x37, 0x0F,
    PWCTR1, 2, 0x18, 0x16,
    PWCTR2, 1, 0x41,
    VMCTR1, 3, 0x00, 0x1E, 0x80,
    MADCTL, 1, 0x48,
    PIXFMT, 1, 0x66,
    0xB0, 1, 0x00,
    FRMCTR1, 1, 0xA0,
    INVOFF, 0,
    0xB4, 1, 0x02,
    DFUNCTR, 3, 0x02, 0x02, 0x3B,
    0xE9, 1, 0x00,
    0xF7, 4, 0xA9, 0x51, 0x2C, 0x82,
    SLPOUT, D,
    DISPON, D,
    0x00,
];

#[rustfmt::skip]
static INITCMD_ST7796: &[u8] = &[
    SWRESET, D,
    SLPOUT, D,
    0xF0, 1, 0xC3,
    0xF0, 1, 0x96,
    MADCTL, 1, 0x48,
    PIXFMT, 1, 0x55,
    0xB4, 1, 0x01,
    DFUNCTR, 3, 0x80, 0x02, 0x3B,
    0xE8, 8, 0x40, 0x8A, 0x00, 0x00, 0x29, 0x19, 0xA5, 0x33,
    PWCTR2, 1, 0x06,
    0xC2, 1, 0xA7,
    VMCTR1, 1, 0x18,
    GMCTRP1, 14, 0xF0, 0x09, 0x0B, 0x06, 0x04, 0x15, 0x2F, 0x54,
                 0x42, 0x3C, 0x17, 0x14, 0x18, 0x1B,
    GMCTRN1, 14, 0xE0, 0x09, 0x0B, 0x06, 0x04, 0x03, 0x2B, 0x43,
                 0x42, 0x3B, 0x16, 0x14, 0x17, 0x1B,
    0xF0, 1, 0x3C,
    0xF0, 1, 0x69,
    DISPON, D,
    0x00,
];

#[rustfmt::skip]
static INITCMD_S3BOX: &[u8] = &[
    0xEF, 3, 0x03, 0x80, 0x02,
    0xCF, 3, 0x00, 0xC1, 0x30,
    0xED, 4, 0x64, 0x03, 0x12, 0x81,
    0xE8, 3, 0x85, 0x00, 0x78,
    0xCB, 5, 0x39, 0x2C, 0x00, 0x34, 0x02,
    0xF7, 1, 0x20,
    0xEA, 2, 0x00, 0x00,
    PWCTR1, 1, 0x23,
    PWCTR2, 1, 0x10,
    VMCTR1, 2, 0x3E, 0x28,
    VMCTR2, 1, 0x86,
    MADCTL, 1, 0xC8,
    PIXFMT, 1, 0x55,
    FRMCTR1, 2, 0x00, 0x18,
    DFUNCTR, 3, 0x08, 0x82, 0x27,
    0xF2, 1, 0x00,
    GAMMASET, 1, 0x01,
    GMCTRP1, 15, 0x0F, 0x31, 0x2B, 0x0C, 0x0E, 0x08, 0x4E, 0xF1,
                 0x37, 0x07, 0x10, 0x03, 0x0E, 0x09, 0x00,
    GMCTRN1, 15, 0x00, 0x0E, 0x14, 0x03, 0x11, 0x07, 0x31, 0xC1,
                 0x48, 0x08, 0x0F, 0x0C, 0x31, 0x36, 0x0F,
    SLPOUT, D,
    DISPON, D,
    0x00,
];

#[rustfmt::skip]
static INITCMD_S3BOXLITE: &[u8] = &[
    0xEF, 3, 0x03, 0x80, 0x02,
    0xCF, 3, 0x00, 0xC1, 0x30,
    0xED, 4, 0x64, 0x03, 0x12, 0x81,
    0xE8, 3, 0x85, 0x00, 0x78,
    0xCB, 5, 0x39, 0x2C, 0x00, 0x34, 0x02,
    0xF7, 1, 0x20,
    0xEA, 2, 0x00, 0x00,
    PWCTR1, 1, 0x23,
    PWCTR2, 1, 0x10,
    VMCTR1, 2, 0x3E, 0x28,
    VMCTR2, 1, 0x86,
    MADCTL, 1, 0x40,
    PIXFMT, 1, 0x55,
    FRMCTR1, 2, 0x00, 0x18,
    DFUNCTR, 3, 0x08, 0x82, 0x27,
    0xF2, 1, 0x00,
    GAMMASET, 1, 0x01,
    GMCTRP1, 15, 0xF0, 0x09, 0x0B, 0x06, 0x04, 0x15, 0x2F, 0x54,
                 0x42, 0x3C, 0x17, 0x14, 0x18, 0x1B, 0x00,
    GMCTRN1, 15, 0xE0, 0x09, 0x0B, 0x06, 0x04, 0x03, 0x2B, 0x43,
                 0x42, 0x3B, 0x16, 0x14, 0x17, 0x1B, 0x00,
    SLPOUT, D,
    DISPON, D,
    0x00,
];

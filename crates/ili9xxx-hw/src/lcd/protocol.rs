//! ILI9xxx command set and wire encoding.
//!
//! Protocol structure:
//! - Command bytes are sent with DC low, their arguments with DC high
//! - Window coordinates are 16-bit big-endian
//! - Init tables are `cmd, count, args...` records terminated by a zero command;
//!   bit 7 of `count` requests a 150ms pause after the command

use crate::{Error, Result};

/// Software reset.
pub const SWRESET: u8 = 0x01;
/// Sleep out.
pub const SLPOUT: u8 = 0x11;
/// Normal display mode on.
pub const NORON: u8 = 0x13;
/// Display inversion off.
pub const INVOFF: u8 = 0x20;
/// Display inversion on.
pub const INVON: u8 = 0x21;
/// Gamma set.
pub const GAMMASET: u8 = 0x26;
/// Display on.
pub const DISPON: u8 = 0x29;
/// Column address set.
pub const CASET: u8 = 0x2A;
/// Page (row) address set.
pub const PASET: u8 = 0x2B;
/// Memory write.
pub const RAMWR: u8 = 0x2C;
/// Memory access control.
pub const MADCTL: u8 = 0x36;
/// Pixel format set.
pub const PIXFMT: u8 = 0x3A;
/// Frame rate control (normal mode).
pub const FRMCTR1: u8 = 0xB1;
/// Display function control.
pub const DFUNCTR: u8 = 0xB6;
/// Power control 1.
pub const PWCTR1: u8 = 0xC0;
/// Power control 2.
pub const PWCTR2: u8 = 0xC1;
/// VCOM control 1.
pub const VMCTR1: u8 = 0xC5;
/// VCOM control 2.
pub const VMCTR2: u8 = 0xC7;
/// Index register used before register reads.
pub const READ_INDEX: u8 = 0xD9;
/// Positive gamma correction.
pub const GMCTRP1: u8 = 0xE0;
/// Negative gamma correction.
pub const GMCTRN1: u8 = 0xE1;

/// Bit in an init table count byte requesting a delay after the command.
pub const INIT_DELAY_FLAG: u8 = 0x80;

/// Delay requested by [`INIT_DELAY_FLAG`], in milliseconds.
pub const INIT_DELAY_MS: u32 = 150;

/// Encodes a 16-bit value big-endian into `buf[0..2]`.
#[inline]
pub fn put16_be(buf: &mut [u8], value: u16) {
    buf[0] = (value >> 8) as u8;
    buf[1] = value as u8;
}

/// Arguments for a CASET or PASET command covering `start..=end`.
pub fn build_address_args(start: u16, end: u16) -> [u8; 4] {
    let mut buf = [0u8; 4];
    put16_be(&mut buf[0..2], start);
    put16_be(&mut buf[2..4], end);
    buf
}

/// One record of an initialization table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitCommand<'a> {
    pub command: u8,
    pub args: &'a [u8],
    pub delay: bool,
}

/// Iterates the records of an initialization table.
pub struct InitTable<'a> {
    table: &'a [u8],
    pos: usize,
}

impl<'a> InitTable<'a> {
    /// Starts iterating at the first record.
    pub fn new(table: &'a [u8]) -> Self {
        Self { table, pos: 0 }
    }

    /// Checks the whole table parses and is terminated.
    pub fn validate(table: &[u8]) -> Result<usize> {
        let mut count = 0;
        for record in InitTable::new(table) {
            record?;
            count += 1;
        }
        Ok(count)
    }
}

impl<'a> Iterator for InitTable<'a> {
    type Item = Result<InitCommand<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.pos;
        let Some(&command) = self.table.get(start) else {
            // Ran off the end without the terminating zero.
            self.pos = usize::MAX;
            return if start == usize::MAX {
                None
            } else {
                Some(Err(Error::InitTable { offset: start }))
            };
        };
        if command == 0 {
            self.pos = usize::MAX;
            return None;
        }
        let Some(&count) = self.table.get(start + 1) else {
            self.pos = usize::MAX;
            return Some(Err(Error::InitTable { offset: start }));
        };
        let num_args = (count & !INIT_DELAY_FLAG) as usize;
        let args_start = start + 2;
        let Some(args) = self.table.get(args_start..args_start + num_args) else {
            self.pos = usize::MAX;
            return Some(Err(Error::InitTable { offset: start }));
        };
        self.pos = args_start + num_args;
        Some(Ok(InitCommand {
            command,
            args,
            delay: count & INIT_DELAY_FLAG != 0,
        }))
    }
}

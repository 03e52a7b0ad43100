//! In-memory transport for running the driver on a host.
//!
//! [`CaptureBus`] records everything written to the bus and [`Gram`] replays a
//! capture the way the controller would, so the image a flush produced can be
//! checked or saved as a PNG.

use super::bus::{Bus, Host};
use super::color::rgb565_to_rgb888;
use super::protocol::{CASET, INVOFF, INVON, PASET, RAMWR};
use crate::{Error, Result};
use std::collections::VecDeque;
use std::path::Path;
use tracing::trace;

/// One recorded bus operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    /// A byte written with DC low.
    Command(u8),
    /// One `write_bytes` call with DC high.
    Data(Vec<u8>),
    /// A byte read back from the controller.
    Read(u8),
}

/// Bus that records transactions instead of driving hardware.
#[derive(Debug, Clone)]
pub struct CaptureBus {
    transactions: Vec<Transaction>,
    data_mode: bool,
    acquired: bool,
    acquire_count: usize,
    release_count: usize,
    write_calls: usize,
    data_bytes: usize,
    data_rate: u32,
    reset_wired: bool,
    reset_levels: Vec<bool>,
    fail_at_write: Option<usize>,
    read_queue: VecDeque<u8>,
}

impl CaptureBus {
    /// Creates a capture bus reporting `data_rate` Hz.
    pub fn new(data_rate: u32) -> Self {
        Self {
            transactions: Vec::new(),
            data_mode: false,
            acquired: false,
            acquire_count: 0,
            release_count: 0,
            write_calls: 0,
            data_bytes: 0,
            data_rate,
            reset_wired: false,
            reset_levels: Vec::new(),
            fail_at_write: None,
            read_queue: VecDeque::new(),
        }
    }

    /// Pretends a hardware reset line is wired.
    pub fn with_reset_line(mut self) -> Self {
        self.reset_wired = true;
        self
    }

    /// Makes the `n`th `write_bytes` call from now (0-based) fail.
    pub fn fail_at_write(&mut self, n: usize) {
        self.fail_at_write = Some(self.write_calls + n);
    }

    /// Queues bytes returned by subsequent reads.
    pub fn queue_reads(&mut self, bytes: &[u8]) {
        self.read_queue.extend(bytes);
    }

    /// Everything recorded so far.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Drops recorded transactions and counters.
    pub fn clear(&mut self) {
        self.transactions.clear();
        self.acquire_count = 0;
        self.release_count = 0;
        self.write_calls = 0;
        self.data_bytes = 0;
        self.reset_levels.clear();
    }

    /// Number of `acquire` calls.
    pub fn acquire_count(&self) -> usize {
        self.acquire_count
    }

    /// Number of `release` calls.
    pub fn release_count(&self) -> usize {
        self.release_count
    }

    /// Whether the bus is currently held.
    pub fn is_acquired(&self) -> bool {
        self.acquired
    }

    /// Total pixel/argument bytes written with DC high.
    pub fn data_bytes(&self) -> usize {
        self.data_bytes
    }

    /// Levels driven on the reset line, oldest first.
    pub fn reset_levels(&self) -> &[bool] {
        &self.reset_levels
    }

    /// Command bytes in the order they were sent.
    pub fn commands(&self) -> Vec<u8> {
        self.transactions
            .iter()
            .filter_map(|t| match t {
                Transaction::Command(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    /// Data bytes following each occurrence of `command`, up to the next command.
    pub fn args_of(&self, command: u8) -> Vec<Vec<u8>> {
        let mut result = Vec::new();
        let mut current: Option<Vec<u8>> = None;
        for t in &self.transactions {
            match t {
                Transaction::Command(c) => {
                    if let Some(args) = current.take() {
                        result.push(args);
                    }
                    if *c == command {
                        current = Some(Vec::new());
                    }
                }
                Transaction::Data(bytes) => {
                    if let Some(args) = current.as_mut() {
                        args.extend_from_slice(bytes);
                    }
                }
                Transaction::Read(_) => {}
            }
        }
        if let Some(args) = current {
            result.push(args);
        }
        result
    }

    /// Sizes of the individual data writes made after the last RAMWR.
    pub fn pixel_writes(&self) -> Vec<usize> {
        let start = self
            .transactions
            .iter()
            .rposition(|t| *t == Transaction::Command(RAMWR))
            .map(|i| i + 1)
            .unwrap_or(self.transactions.len());
        self.transactions[start..]
            .iter()
            .take_while(|t| matches!(t, Transaction::Data(_)))
            .filter_map(|t| match t {
                Transaction::Data(bytes) => Some(bytes.len()),
                _ => None,
            })
            .collect()
    }
}

impl Bus for CaptureBus {
    fn acquire(&mut self) -> Result<()> {
        self.acquired = true;
        self.acquire_count += 1;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.acquired = false;
        self.release_count += 1;
        Ok(())
    }

    fn set_data_mode(&mut self, data: bool) -> Result<()> {
        self.data_mode = data;
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        let call = self.write_calls;
        self.write_calls += 1;
        if self.fail_at_write == Some(call) {
            self.fail_at_write = None;
            return Err(Error::Bus(format!("injected failure on write {}", call)));
        }
        if !self.acquired {
            return Err(Error::Bus("write without acquiring the bus".to_string()));
        }
        if self.data_mode {
            self.data_bytes += data.len();
            self.transactions.push(Transaction::Data(data.to_vec()));
        } else {
            self.transactions
                .extend(data.iter().map(|&b| Transaction::Command(b)));
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8> {
        let byte = self.read_queue.pop_front().unwrap_or(0);
        self.transactions.push(Transaction::Read(byte));
        Ok(byte)
    }

    fn has_reset(&self) -> bool {
        self.reset_wired
    }

    fn set_reset(&mut self, high: bool) -> Result<()> {
        if self.reset_wired {
            self.reset_levels.push(high);
        }
        Ok(())
    }

    fn data_rate(&self) -> u32 {
        self.data_rate
    }
}

/// Host that counts watchdog feeds and accumulates requested delays.
#[derive(Debug, Default, Clone)]
pub struct CountingHost {
    pub watchdog_feeds: usize,
    pub delayed_ms: u64,
}

impl Host for CountingHost {
    fn feed_watchdog(&mut self) {
        self.watchdog_feeds += 1;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delayed_ms += ms as u64;
    }
}

/// Simulated controller graphics RAM.
#[derive(Debug, Clone)]
pub struct Gram {
    width: u16,
    height: u16,
    offset_x: u16,
    offset_y: u16,
    wire_bytes: usize,
    pixels: Vec<u16>,
    inverted: bool,
    columns: (u16, u16),
    rows: (u16, u16),
    cursor: (u16, u16),
    command: Option<u8>,
    args: Vec<u8>,
    pending: Vec<u8>,
}

impl Gram {
    /// Creates a black GRAM. `is_18bit` selects 3-byte wire pixels.
    pub fn new(width: u16, height: u16, is_18bit: bool) -> Self {
        Self {
            width,
            height,
            offset_x: 0,
            offset_y: 0,
            wire_bytes: if is_18bit { 3 } else { 2 },
            pixels: vec![0; width as usize * height as usize],
            inverted: false,
            columns: (0, width.saturating_sub(1)),
            rows: (0, height.saturating_sub(1)),
            cursor: (0, 0),
            command: None,
            args: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Subtracts the panel offset from window addresses.
    pub fn with_offset(mut self, offset_x: u16, offset_y: u16) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }

    /// Whether the last inversion command was INVON.
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// 565 value at `(x, y)`.
    pub fn pixel(&self, x: u16, y: u16) -> Option<u16> {
        if x < self.width && y < self.height {
            Some(self.pixels[y as usize * self.width as usize + x as usize])
        } else {
            None
        }
    }

    /// Replays recorded transactions.
    pub fn apply(&mut self, transactions: &[Transaction]) {
        for t in transactions {
            match t {
                Transaction::Command(c) => self.on_command(*c),
                Transaction::Data(bytes) => self.on_data(bytes),
                Transaction::Read(_) => {}
            }
        }
    }

    fn on_command(&mut self, command: u8) {
        self.command = Some(command);
        self.args.clear();
        self.pending.clear();
        match command {
            RAMWR => self.cursor = (self.columns.0, self.rows.0),
            INVON => self.inverted = true,
            INVOFF => self.inverted = false,
            _ => {}
        }
    }

    fn on_data(&mut self, bytes: &[u8]) {
        match self.command {
            Some(RAMWR) => {
                for &b in bytes {
                    self.pending.push(b);
                    if self.pending.len() == self.wire_bytes {
                        let pixel = self.decode_pending();
                        self.pending.clear();
                        self.store(pixel);
                    }
                }
            }
            Some(CASET) | Some(PASET) => {
                self.args.extend_from_slice(bytes);
                if self.args.len() >= 4 {
                    let start = u16::from_be_bytes([self.args[0], self.args[1]]);
                    let end = u16::from_be_bytes([self.args[2], self.args[3]]);
                    if self.command == Some(CASET) {
                        self.columns = (
                            start.wrapping_sub(self.offset_x),
                            end.wrapping_sub(self.offset_x),
                        );
                    } else {
                        self.rows = (
                            start.wrapping_sub(self.offset_y),
                            end.wrapping_sub(self.offset_y),
                        );
                    }
                    trace!("GRAM window cols={:?} rows={:?}", self.columns, self.rows);
                }
            }
            _ => {}
        }
    }

    fn decode_pending(&self) -> u16 {
        let p = &self.pending;
        if self.wire_bytes == 3 {
            ((p[0] as u16 & 0xF8) << 8) | ((p[1] as u16 & 0xFC) << 3) | (p[2] as u16 >> 3)
        } else {
            u16::from_be_bytes([p[0], p[1]])
        }
    }

    fn store(&mut self, pixel: u16) {
        let (x, y) = self.cursor;
        if x < self.width && y < self.height {
            self.pixels[y as usize * self.width as usize + x as usize] = pixel;
        }
        if x >= self.columns.1 {
            self.cursor.0 = self.columns.0;
            self.cursor.1 = if y >= self.rows.1 { self.rows.0 } else { y + 1 };
        } else {
            self.cursor.0 = x + 1;
        }
    }

    /// Converts to RGBA8 bytes, applying inversion.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.pixels.len() * 4);
        for &pixel in &self.pixels {
            let pixel = if self.inverted { !pixel } else { pixel };
            let (r, g, b) = rgb565_to_rgb888(pixel);
            rgba.push(r);
            rgba.push(g);
            rgba.push(b);
            rgba.push(255);
        }
        rgba
    }

    /// Encodes the GRAM contents as PNG bytes.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut png_data = Vec::new();
        {
            let mut encoder =
                png::Encoder::new(&mut png_data, self.width as u32, self.height as u32);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.to_rgba8())?;
        }
        Ok(png_data)
    }

    /// Writes the GRAM contents to a PNG file.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_png()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(bus: &mut CaptureBus, f: impl FnOnce(&mut CaptureBus)) {
        bus.acquire().unwrap();
        f(bus);
        bus.release().unwrap();
    }

    fn command(bus: &mut CaptureBus, cmd: u8, args: &[u8]) {
        bus.set_data_mode(false).unwrap();
        bus.write_bytes(&[cmd]).unwrap();
        bus.set_data_mode(true).unwrap();
        if !args.is_empty() {
            bus.write_bytes(args).unwrap();
        }
    }

    #[test]
    fn test_records_commands_and_data() {
        let mut bus = CaptureBus::new(40_000_000);
        session(&mut bus, |bus| command(bus, CASET, &[0, 1, 0, 2]));
        assert_eq!(bus.commands(), vec![CASET]);
        assert_eq!(bus.args_of(CASET), vec![vec![0, 1, 0, 2]]);
        assert_eq!(bus.acquire_count(), 1);
        assert_eq!(bus.release_count(), 1);
        assert_eq!(bus.data_bytes(), 4);
    }

    #[test]
    fn test_write_requires_acquire() {
        let mut bus = CaptureBus::new(1_000_000);
        assert!(matches!(bus.write_bytes(&[1]), Err(Error::Bus(_))));
    }

    #[test]
    fn test_injected_failure() {
        let mut bus = CaptureBus::new(1_000_000);
        bus.fail_at_write(1);
        bus.acquire().unwrap();
        assert!(bus.write_bytes(&[1]).is_ok());
        assert!(bus.write_bytes(&[2]).is_err());
        assert!(bus.write_bytes(&[3]).is_ok());
    }

    #[test]
    fn test_gram_window_replay() {
        let mut bus = CaptureBus::new(1_000_000);
        session(&mut bus, |bus| {
            command(bus, CASET, &[0, 1, 0, 2]);
            command(bus, PASET, &[0, 3, 0, 3]);
            command(bus, RAMWR, &[]);
            bus.write_bytes(&[0xF8, 0x00, 0x07, 0xE0]).unwrap();
        });
        let mut gram = Gram::new(4, 4, false);
        gram.apply(bus.transactions());
        assert_eq!(gram.pixel(1, 3), Some(0xF800));
        assert_eq!(gram.pixel(2, 3), Some(0x07E0));
        assert_eq!(gram.pixel(0, 0), Some(0));
        assert_eq!(bus.pixel_writes(), vec![4]);
    }

    #[test]
    fn test_gram_18bit_decode() {
        let mut bus = CaptureBus::new(1_000_000);
        session(&mut bus, |bus| {
            command(bus, CASET, &[0, 0, 0, 0]);
            command(bus, PASET, &[0, 0, 0, 0]);
            command(bus, RAMWR, &[]);
            bus.write_bytes(&[0xF8, 0xFC, 0xF8]).unwrap();
        });
        let mut gram = Gram::new(1, 1, true);
        gram.apply(bus.transactions());
        assert_eq!(gram.pixel(0, 0), Some(0xFFFF));
    }

    #[test]
    fn test_gram_png() {
        let gram = Gram::new(2, 2, false);
        let png = gram.to_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
        assert_eq!(gram.to_rgba8().len(), 16);
    }
}

//! ILI9xxx panel driver.

use crate::profile::{PanelModel, PanelProfile};
use crate::{Error, Result};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

use super::bus::{Bus, Host};
use super::color::{rgb565_to_wire18, Color, ColorMode, Palette, PixelConverter, SourceFormat};
use super::dirty::DirtyRegion;
use super::framebuffer::Framebuffer;
use super::protocol::{
    build_address_args, put16_be, InitTable, CASET, INIT_DELAY_MS, INVOFF, INVON, MADCTL, PASET,
    RAMWR, READ_INDEX,
};
use super::strategy::{self, Strategy, TransferEstimate, TRANSFER_BUFFER_SIZE};
use super::update::{UpdateGuard, UpdateState};

/// Hold time for each edge of the hardware reset pulse.
const RESET_DELAY_MS: u32 = 10;

/// Driver configuration.
#[derive(Debug, Clone, Default)]
pub struct DriverConfig {
    /// Panel model, selects the init table and defaults.
    pub model: PanelModel,
    /// Width in pixels, 0 for the model default.
    pub width: u16,
    /// Height in pixels, 0 for the model default.
    pub height: u16,
    /// Column offset added to every window address.
    pub offset_x: u16,
    /// Row offset added to every window address.
    pub offset_y: u16,
    /// Frame buffer layout.
    pub color_mode: ColorMode,
    /// Forces 3-byte wire pixels even if the model does not need them.
    pub is_18bit: bool,
    /// Inversion on/off, `None` for the model default.
    pub invert: Option<bool>,
    /// MADCTL value sent after init, 0 to keep the init table's.
    pub madctl: u8,
    /// Palette for [`ColorMode::Indexed8`].
    pub palette: Option<Palette>,
    /// Upper bound on the frame buffer size in bytes.
    pub buffer_limit: Option<usize>,
}

/// A caller-supplied block of pixels for [`Ili9xxx::write_block`].
#[derive(Debug, Clone, Copy)]
pub struct PixelBlock<'a> {
    /// Source pixel data.
    pub data: &'a [u8],
    /// Layout of `data`.
    pub format: SourceFormat,
    /// Pixels to skip at the start of every source row.
    pub x_offset: usize,
    /// Source rows to skip.
    pub y_offset: usize,
    /// Pixels of padding after each row.
    pub x_pad: usize,
}

impl<'a> PixelBlock<'a> {
    /// A tightly packed block in `format`.
    pub fn new(data: &'a [u8], format: SourceFormat) -> Self {
        Self {
            data,
            format,
            x_offset: 0,
            y_offset: 0,
            x_pad: 0,
        }
    }

    /// Source row length in pixels for a `w` wide block.
    fn stride(&self, w: usize) -> usize {
        self.x_offset + w + self.x_pad
    }

    /// Byte offset of the source pixel at `(col, row)` of the block.
    fn offset(&self, w: usize, col: usize, row: usize) -> usize {
        ((self.y_offset + row) * self.stride(w) + self.x_offset + col)
            * self.format.bitness.bytes_per_pixel()
    }
}

/// Outcome of a flush that transmitted something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Strategy used for the transfer.
    pub strategy: Strategy,
    /// Costs the choice was made from.
    pub estimate: TransferEstimate,
    /// `(x_low, y_low, x_high, y_high)` that was sent.
    pub bounds: (u16, u16, u16, u16),
    /// Wall time of the transfer.
    pub elapsed: Duration,
}

/// Display driver for ILI9xxx-family controllers.
pub struct Ili9xxx<B: Bus, H: Host> {
    bus: B,
    host: H,
    model: PanelModel,
    profile: PanelProfile,
    width: u16,
    height: u16,
    offset_x: u16,
    offset_y: u16,
    madctl: u8,
    is_18bit: bool,
    invert: bool,
    converter: PixelConverter,
    framebuffer: Framebuffer,
    dirty: DirtyRegion,
    guard: UpdateGuard,
    ready: bool,
    failed: bool,
    last_flush: Option<FlushReport>,
}

impl<B: Bus, H: Host> Ili9xxx<B, H> {
    /// Creates a driver. Nothing is sent until [`setup`](Self::setup).
    pub fn new(bus: B, host: H, config: DriverConfig) -> Self {
        let profile = config.model.profile();
        let width = if config.width == 0 {
            profile.default_width
        } else {
            config.width
        };
        let height = if config.height == 0 {
            profile.default_height
        } else {
            config.height
        };

        Self {
            bus,
            host,
            model: config.model,
            profile,
            width,
            height,
            offset_x: config.offset_x,
            offset_y: config.offset_y,
            madctl: config.madctl,
            is_18bit: config.is_18bit || profile.is_18bit,
            invert: config.invert.unwrap_or(profile.invert_on_init),
            converter: PixelConverter::new(config.color_mode, config.palette),
            framebuffer: Framebuffer::new(width, height, config.color_mode)
                .with_limit(config.buffer_limit),
            dirty: DirtyRegion::new(width, height),
            guard: UpdateGuard::new(),
            ready: false,
            failed: false,
            last_flush: None,
        }
    }

    /// Resets and initializes the controller.
    pub fn setup(&mut self) -> Result<()> {
        info!("{} setup starts", self.model);

        self.setup_pins()?;
        self.init_lcd(self.profile.init_table)?;
        self.command(if self.invert { INVON } else { INVOFF })?;
        if self.madctl != 0 {
            self.send_command(MADCTL, &[self.madctl])?;
        }
        self.dirty.reset();
        self.ready = true;

        info!("{} setup complete", self.model);
        Ok(())
    }

    fn setup_pins(&mut self) -> Result<()> {
        self.bus.set_data_mode(false)?;
        if self.bus.has_reset() {
            self.bus.set_reset(true)?;
        }
        self.hard_reset()
    }

    /// Pulses the reset line if one is wired.
    pub fn hard_reset(&mut self) -> Result<()> {
        if self.bus.has_reset() {
            self.bus.set_reset(false)?;
            self.host.delay_ms(RESET_DELAY_MS);
            self.bus.set_reset(true)?;
            self.host.delay_ms(RESET_DELAY_MS);
        }
        Ok(())
    }

    /// Sends every record of an init table.
    pub fn init_lcd(&mut self, table: &[u8]) -> Result<()> {
        for record in InitTable::new(table) {
            let record = record?;
            self.send_command(record.command, record.args)?;
            if record.delay {
                self.host.delay_ms(INIT_DELAY_MS);
            }
        }
        Ok(())
    }

    /// Logs the effective configuration.
    pub fn dump_config(&self) {
        info!("Display model: {}", self.model);
        info!("  Dimensions: {}x{}", self.width, self.height);
        info!("  Width Offset: {}", self.offset_x);
        info!("  Height Offset: {}", self.offset_y);
        info!("  Color mode: {}", self.converter.mode());
        if self.is_18bit {
            info!("  18-Bit Mode: YES");
        }
        info!("  Invert: {}", if self.invert { "yes" } else { "no" });
        info!("  Data rate: {}MHz", self.bus.data_rate() / 1_000_000);
        if self.failed {
            info!("  => Failed to init Memory: YES!");
        }
    }

    /// Returns the configured panel model.
    pub fn model(&self) -> PanelModel {
        self.model
    }

    /// Returns the panel width in pixels.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Returns the panel height in pixels.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Returns the frame buffer layout.
    pub fn color_mode(&self) -> ColorMode {
        self.converter.mode()
    }

    /// Whether pixels go out as three bytes.
    pub fn is_18bit(&self) -> bool {
        self.is_18bit
    }

    /// Whether color inversion is on, or will be after `setup`.
    pub fn is_inverted(&self) -> bool {
        self.invert
    }

    /// Whether `setup` completed.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether the driver is permanently failed.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Returns the region waiting for the next flush.
    pub fn dirty_region(&self) -> &DirtyRegion {
        &self.dirty
    }

    /// Returns the frame buffer.
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Returns whether an update is running.
    pub fn update_state(&self) -> UpdateState {
        self.guard.state()
    }

    /// Whether a running update was asked to repaint again.
    pub fn update_repeat_requested(&self) -> bool {
        self.guard.repeat_requested()
    }

    /// Report of the last flush that transmitted pixels.
    pub fn last_flush(&self) -> Option<&FlushReport> {
        self.last_flush.as_ref()
    }

    /// Returns the bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Returns the bus mutably. Writing to it bypasses the dirty region.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Returns the host services.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Releases the bus and host.
    pub fn release(self) -> (B, H) {
        (self.bus, self.host)
    }

    /// Runs `f` with the bus acquired, releasing it even when `f` fails.
    fn with_bus<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.bus.acquire()?;
        let result = f(self);
        let released = self.bus.release();
        let value = result?;
        released?;
        Ok(value)
    }

    /// Sends a bare command byte.
    pub fn command(&mut self, value: u8) -> Result<()> {
        self.bus.set_data_mode(false)?;
        self.with_bus(|d| d.bus.write_bytes(&[value]))
    }

    /// Sends a single data byte.
    pub fn data(&mut self, value: u8) -> Result<()> {
        self.bus.set_data_mode(true)?;
        self.with_bus(|d| d.bus.write_bytes(&[value]))
    }

    /// Sends a command followed by its argument bytes.
    pub fn send_command(&mut self, command: u8, args: &[u8]) -> Result<()> {
        self.command(command)?;
        self.bus.set_data_mode(true)?;
        if args.is_empty() {
            return Ok(());
        }
        self.with_bus(|d| d.bus.write_bytes(args))
    }

    /// Reads parameter byte `index` of register `command`.
    pub fn read_command(&mut self, command: u8, index: u8) -> Result<u8> {
        self.send_command(READ_INDEX, &[0x10 + index])?;
        self.bus.set_data_mode(false)?;
        self.with_bus(|d| {
            d.bus.write_bytes(&[command])?;
            d.bus.set_data_mode(true)?;
            let mut result = 0;
            for _ in 0..=index {
                result = d.bus.read_byte()?;
            }
            Ok(result)
        })
    }

    /// Turns color inversion on or off. Sent immediately once set up,
    /// otherwise applied by `setup`.
    pub fn set_invert(&mut self, invert: bool) -> Result<()> {
        self.invert = invert;
        if self.ready {
            self.command(if invert { INVON } else { INVOFF })?;
        }
        Ok(())
    }

    /// Programs the write window `(x1, y1)..=(x2, y2)` and starts a memory
    /// write. The bus must already be acquired; bounds are not checked.
    /// Offset addresses wrap at 16 bits like the controller's counters.
    pub fn set_window(&mut self, x1: u16, y1: u16, x2: u16, y2: u16) -> Result<()> {
        self.bus.set_data_mode(false)?;
        self.bus.write_bytes(&[CASET])?;
        self.bus.set_data_mode(true)?;
        self.bus.write_bytes(&build_address_args(
            x1.wrapping_add(self.offset_x),
            x2.wrapping_add(self.offset_x),
        ))?;
        self.bus.set_data_mode(false)?;
        self.bus.write_bytes(&[PASET])?;
        self.bus.set_data_mode(true)?;
        self.bus.write_bytes(&build_address_args(
            y1.wrapping_add(self.offset_y),
            y2.wrapping_add(self.offset_y),
        ))?;
        self.bus.set_data_mode(false)?;
        self.bus.write_bytes(&[RAMWR])?;
        self.bus.set_data_mode(true)
    }

    /// Allocates the frame buffer on first use. An allocation failure puts
    /// the driver in the failed state for good.
    pub fn ensure_allocated(&mut self) -> Result<()> {
        if self.failed {
            return Err(Error::Failed);
        }
        if let Err(e) = self.framebuffer.ensure_allocated() {
            error!("Could not allocate frame buffer: {}", e);
            self.failed = true;
            return Err(e);
        }
        Ok(())
    }

    /// Sets one pixel. Coordinates outside the panel are ignored.
    pub fn write_pixel(&mut self, x: i32, y: i32, color: Color) -> Result<()> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return Ok(());
        }
        self.ensure_allocated()?;
        let (x, y) = (x as u16, y as u16);
        let value = self.converter.to_buffer_value(color);
        if self.framebuffer.set_pixel(x, y, value) {
            self.dirty.on_pixel_changed(x, y);
        }
        Ok(())
    }

    /// Sets every pixel and marks the whole panel dirty.
    pub fn fill(&mut self, color: Color) -> Result<()> {
        self.ensure_allocated()?;
        let value = self.converter.to_buffer_value(color);
        self.framebuffer.fill(value);
        self.dirty.mark_all();
        Ok(())
    }

    /// Draws a `w` x `h` block at `(x, y)`.
    ///
    /// Blocks already in the panel's wire format that fit on the panel are
    /// streamed straight to the controller, bypassing the frame buffer and the
    /// dirty region. Anything else is converted pixel by pixel.
    pub fn write_block(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        block: &PixelBlock<'_>,
    ) -> Result<()> {
        debug!("drawing into {}/{}, {}/{}", x, y, w, h);
        if w <= 0 || h <= 0 {
            return Ok(());
        }
        let (w_px, h_px) = (w as usize, h as usize);
        let required = block.offset(w_px, w_px, h_px - 1);
        if block.data.len() < required {
            return Err(Error::BlockSize {
                expected: required,
                actual: block.data.len(),
            });
        }

        let fits = x >= 0
            && y >= 0
            && x as i64 + w as i64 <= self.width as i64
            && y as i64 + h as i64 <= self.height as i64;
        if fits
            && block.format == SourceFormat::NATIVE
            && self.converter.mode() == ColorMode::Rgb565
            && !self.is_18bit
        {
            let (x, y) = (x as u16, y as u16);
            return self.with_bus(|d| {
                d.set_window(x, y, x + w as u16 - 1, y + h as u16 - 1)?;
                for row in 0..h_px {
                    let start = block.offset(w_px, 0, row);
                    d.bus.write_bytes(&block.data[start..start + w_px * 2])?;
                }
                Ok(())
            });
        }

        for row in 0..h_px {
            for col in 0..w_px {
                let start = block.offset(w_px, col, row);
                let color = block.format.decode(&block.data[start..]);
                self.write_pixel(x + col as i32, y + row as i32, color)?;
            }
        }
        Ok(())
    }

    /// Repaints and flushes the panel.
    ///
    /// `repaint` redraws into the frame buffer. If it (or anything it calls)
    /// requests another update, that request is folded into this one: the
    /// repaint runs again and the panel is flushed once at the end.
    pub fn update<F>(&mut self, mut repaint: F) -> Result<()>
    where
        F: FnMut(&mut Self) -> Result<()>,
    {
        if !self.guard.try_begin() {
            trace!("Update requested while updating, repeating repaint");
            return Ok(());
        }
        let result = loop {
            self.guard.start_pass();
            if let Err(e) = repaint(self) {
                break Err(e);
            }
            if !self.guard.repeat_requested() {
                break Ok(());
            }
        };
        self.guard.finish();
        result?;
        self.flush().map(|_| ())
    }

    /// Requests an update with nothing to repaint.
    pub fn request_update(&mut self) -> Result<()> {
        self.update(|_| Ok(()))
    }

    /// Sends the dirty region to the panel and clears it.
    ///
    /// The region is cleared even if the transfer fails.
    pub fn flush(&mut self) -> Result<Option<FlushReport>> {
        let Some(bounds) = self.dirty.bounds() else {
            trace!("Nothing to display");
            return Ok(None);
        };
        if !self.framebuffer.is_allocated() {
            trace!("Nothing to display");
            return Ok(None);
        }
        let (x_low, y_low, x_high, y_high) = bounds;

        let estimate = strategy::estimate(self.width, &self.dirty, self.bus.data_rate());
        let strategy = strategy::select(self.converter.mode(), self.is_18bit, &estimate);
        debug!(
            "Start display(xlow:{}, ylow:{}, xhigh:{}, yhigh:{}, width:{}, height:{}, mode={:?}, 18bit={}, sw_time={}us, mw_time={}us)",
            x_low,
            y_low,
            x_high,
            y_high,
            self.dirty.width(),
            self.dirty.height(),
            self.converter.mode(),
            self.is_18bit,
            estimate.single_us,
            estimate.multiple_us
        );

        let started = Instant::now();
        let result = self.with_bus(|d| match strategy {
            Strategy::SingleWrite => d.write_rows(y_low, y_high),
            Strategy::MultipleWrite => d.write_rect(x_low, y_low, x_high, y_high),
        });
        self.dirty.reset();
        result?;

        let report = FlushReport {
            strategy,
            estimate,
            bounds,
            elapsed: started.elapsed(),
        };
        trace!("Data write took {:?} ({})", report.elapsed, strategy);
        self.last_flush = Some(report);
        Ok(Some(report))
    }

    /// Full rows straight out of the frame buffer.
    fn write_rows(&mut self, y_low: u16, y_high: u16) -> Result<()> {
        self.set_window(0, y_low, self.width - 1, y_high)?;
        let rows = self.framebuffer.rows(y_low, y_high).ok_or(Error::Failed)?;
        trace!("Doing single write of {} bytes", rows.len());
        self.bus.write_bytes(rows)
    }

    /// The dirty rectangle, converted through the staging buffer.
    fn write_rect(&mut self, x_low: u16, y_low: u16, x_high: u16, y_high: u16) -> Result<()> {
        trace!("Doing multiple write");
        self.set_window(x_low, y_low, x_high, y_high)?;

        let data = self.framebuffer.data().ok_or(Error::Failed)?;
        let mode = self.converter.mode();
        let width = self.width as usize;
        let mut staging = [0u8; TRANSFER_BUFFER_SIZE];
        let mut idx = 0;

        for y in y_low..=y_high {
            let row = y as usize * width;
            for x in x_low..=x_high {
                let stored = Framebuffer::stored_at(data, mode, row + x as usize);
                let color = self.converter.to_wire565(stored);
                if self.is_18bit {
                    staging[idx..idx + 3].copy_from_slice(&rgb565_to_wire18(color));
                    idx += 3;
                } else {
                    put16_be(&mut staging[idx..idx + 2], color);
                    idx += 2;
                }
                if idx == TRANSFER_BUFFER_SIZE {
                    self.bus.write_bytes(&staging)?;
                    idx = 0;
                    self.host.feed_watchdog();
                }
            }
        }
        if idx != 0 {
            self.bus.write_bytes(&staging[..idx])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lcd::capture::{CaptureBus, CountingHost, Gram, Transaction};

    type TestDriver = Ili9xxx<CaptureBus, CountingHost>;

    fn driver(width: u16, height: u16, mode: ColorMode) -> TestDriver {
        let config = DriverConfig {
            model: PanelModel::Ili9342,
            width,
            height,
            color_mode: mode,
            ..Default::default()
        };
        Ili9xxx::new(CaptureBus::new(40_000_000), CountingHost::default(), config)
    }

    fn gram_of(d: &TestDriver) -> Gram {
        let mut gram = Gram::new(d.width(), d.height(), d.is_18bit());
        gram.apply(d.bus().transactions());
        gram
    }

    fn count_command(bus: &CaptureBus, command: u8) -> usize {
        bus.commands().iter().filter(|&&c| c == command).count()
    }

    #[test]
    fn test_defaults_from_profile() {
        let d = driver(0, 0, ColorMode::Rgb565);
        assert_eq!((d.width(), d.height()), (320, 240));
        assert!(!d.is_18bit());
        assert!(!d.framebuffer().is_allocated());

        let config = DriverConfig {
            model: PanelModel::Ili9488,
            ..Default::default()
        };
        let d = Ili9xxx::new(CaptureBus::new(1), CountingHost::default(), config);
        assert_eq!((d.width(), d.height()), (480, 320));
        assert!(d.is_18bit());
    }

    #[test]
    fn test_setup_sequence() {
        let config = DriverConfig {
            model: PanelModel::M5Stack,
            madctl: 0x08,
            ..Default::default()
        };
        let bus = CaptureBus::new(40_000_000).with_reset_line();
        let mut d = Ili9xxx::new(bus, CountingHost::default(), config);
        d.setup().unwrap();

        assert!(d.is_ready());
        assert!(d.is_inverted());
        assert_eq!(d.bus().reset_levels(), &[true, false, true]);

        let commands = d.bus().commands();
        let invon = commands.iter().rposition(|&c| c == INVON).unwrap();
        assert_eq!(commands[invon + 1], MADCTL);
        assert_eq!(d.bus().args_of(MADCTL).last().unwrap(), &vec![0x08]);
        // Reset pulse plus SLPOUT and DISPON delays.
        assert_eq!(d.host().delayed_ms, 20 + 2 * 150);
        assert!(!d.bus().is_acquired());
        assert_eq!(d.bus().acquire_count(), d.bus().release_count());
    }

    #[test]
    fn test_set_window_applies_offset() {
        let config = DriverConfig {
            offset_x: 2,
            offset_y: 3,
            ..Default::default()
        };
        let mut d = Ili9xxx::new(CaptureBus::new(1), CountingHost::default(), config);
        d.bus_mut().acquire().unwrap();
        d.set_window(5, 5, 10, 10).unwrap();

        assert_eq!(d.bus().commands(), vec![CASET, PASET, RAMWR]);
        assert_eq!(d.bus().args_of(CASET), vec![vec![0, 7, 0, 12]]);
        assert_eq!(d.bus().args_of(PASET), vec![vec![0, 8, 0, 13]]);
    }

    #[test]
    fn test_set_window_offset_wraps() {
        let config = DriverConfig {
            offset_x: 0xFFFF,
            offset_y: 0xFFFE,
            ..Default::default()
        };
        let mut d = Ili9xxx::new(CaptureBus::new(1), CountingHost::default(), config);
        d.bus_mut().acquire().unwrap();
        d.set_window(1, 2, 3, 4).unwrap();

        assert_eq!(d.bus().args_of(CASET), vec![vec![0, 0, 0, 2]]);
        assert_eq!(d.bus().args_of(PASET), vec![vec![0, 0, 0, 2]]);
    }

    #[test]
    fn test_dirty_region_tracks_changed_writes_only() {
        let mut d = driver(320, 240, ColorMode::Rgb565);
        d.write_pixel(10, 20, Color::RED).unwrap();
        d.write_pixel(5, 100, Color::BLUE).unwrap();
        assert_eq!(d.dirty_region().bounds(), Some((5, 20, 10, 100)));

        d.flush().unwrap();
        assert!(d.dirty_region().is_empty());

        // Same value again: nothing changes, nothing is dirty.
        d.write_pixel(10, 20, Color::RED).unwrap();
        assert!(d.dirty_region().is_empty());
        // Black onto a freshly allocated buffer changes nothing either.
        d.write_pixel(200, 200, Color::BLACK).unwrap();
        assert!(d.dirty_region().is_empty());
    }

    #[test]
    fn test_out_of_bounds_write_ignored() {
        let mut d = driver(10, 10, ColorMode::Rgb565);
        d.write_pixel(-1, 0, Color::RED).unwrap();
        d.write_pixel(0, 10, Color::RED).unwrap();
        d.write_pixel(10, 0, Color::RED).unwrap();
        assert!(d.dirty_region().is_empty());
        assert!(!d.framebuffer().is_allocated());
    }

    #[test]
    fn test_fill_marks_whole_panel() {
        let mut d = driver(16, 8, ColorMode::Rgb332);
        d.fill(Color::GREEN).unwrap();
        assert_eq!(d.dirty_region().bounds(), Some((0, 0, 15, 7)));
        let expected = Color::GREEN.to_332();
        assert!(d.framebuffer().data().unwrap().iter().all(|&b| b == expected));
    }

    #[test]
    fn test_flush_twice_is_noop_second_time() {
        let mut d = driver(32, 32, ColorMode::Rgb565);
        d.write_pixel(3, 3, Color::WHITE).unwrap();
        assert!(d.flush().unwrap().is_some());
        let transactions = d.bus().transactions().len();
        let acquires = d.bus().acquire_count();

        assert!(d.flush().unwrap().is_none());
        assert_eq!(d.bus().transactions().len(), transactions);
        assert_eq!(d.bus().acquire_count(), acquires);
    }

    #[test]
    fn test_full_panel_uses_single_write() {
        let mut d = driver(320, 240, ColorMode::Rgb565);
        d.fill(Color::RED).unwrap();
        let report = d.flush().unwrap().unwrap();
        assert_eq!(report.strategy, Strategy::SingleWrite);
        assert_eq!(d.bus().args_of(CASET), vec![vec![0, 0, 0x01, 0x3F]]);
        assert_eq!(d.bus().args_of(PASET), vec![vec![0, 0, 0, 0xEF]]);
        assert_eq!(d.bus().pixel_writes(), vec![320 * 240 * 2]);
        assert_eq!(gram_of(&d).pixel(319, 239), Some(0xF800));
    }

    #[test]
    fn test_single_pixel_uses_multiple_write() {
        let mut d = driver(320, 240, ColorMode::Rgb565);
        d.write_pixel(100, 100, Color::BLUE).unwrap();
        let report = d.flush().unwrap().unwrap();
        assert_eq!(report.strategy, Strategy::MultipleWrite);
        assert_eq!(report.bounds, (100, 100, 100, 100));
        assert_eq!(d.bus().args_of(CASET), vec![vec![0, 100, 0, 100]]);
        assert_eq!(d.bus().pixel_writes(), vec![2]);
        assert_eq!(gram_of(&d).pixel(100, 100), Some(0x001F));
    }

    #[test]
    fn test_partial_rows_single_write() {
        let mut d = driver(320, 240, ColorMode::Rgb565);
        for x in 0..320 {
            d.write_pixel(x, 50, Color::WHITE).unwrap();
            d.write_pixel(x, 59, Color::WHITE).unwrap();
        }
        let report = d.flush().unwrap().unwrap();
        assert_eq!(report.strategy, Strategy::SingleWrite);
        assert_eq!(d.bus().pixel_writes(), vec![320 * 10 * 2]);
        let gram = gram_of(&d);
        assert_eq!(gram.pixel(0, 50), Some(0xFFFF));
        assert_eq!(gram.pixel(0, 55), Some(0x0000));
    }

    #[test]
    fn test_multiple_write_batches_and_feeds_watchdog() {
        let mut d = driver(100, 100, ColorMode::Rgb332);
        for y in 10..20 {
            for x in 10..20 {
                d.write_pixel(x, y, Color::RED).unwrap();
            }
        }
        d.flush().unwrap();
        // 100 pixels * 2 bytes = 200 bytes: one full staging buffer plus 74.
        assert_eq!(d.bus().pixel_writes(), vec![TRANSFER_BUFFER_SIZE, 74]);
        assert_eq!(d.host().watchdog_feeds, 1);

        let gram = gram_of(&d);
        let red = Color::from_332(Color::RED.to_332()).to_565();
        assert_eq!(gram.pixel(10, 10), Some(red));
        assert_eq!(gram.pixel(19, 19), Some(red));
        assert_eq!(gram.pixel(20, 20), Some(0));
    }

    #[test]
    fn test_18bit_wire_expansion() {
        let config = DriverConfig {
            model: PanelModel::Ili9488,
            width: 8,
            height: 8,
            ..Default::default()
        };
        let mut d = Ili9xxx::new(CaptureBus::new(40_000_000), CountingHost::default(), config);
        d.fill(Color::WHITE).unwrap();
        let report = d.flush().unwrap().unwrap();
        assert_eq!(report.strategy, Strategy::MultipleWrite);
        let total: usize = d.bus().pixel_writes().iter().sum();
        assert_eq!(total, 64 * 3);
        assert!(d.bus().pixel_writes().iter().all(|&n| n % 3 == 0));

        match d.bus().transactions().last().unwrap() {
            Transaction::Data(bytes) => assert_eq!(&bytes[0..3], &[0xF8, 0xFC, 0xF8]),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(gram_of(&d).pixel(7, 7), Some(0xFFFF));
    }

    #[test]
    fn test_indexed_mode_flush() {
        let palette = Palette::from_rgb888(&[0, 0, 0, 255, 0, 0, 0, 255, 0]);
        let config = DriverConfig {
            width: 4,
            height: 4,
            color_mode: ColorMode::Indexed8,
            palette: Some(palette),
            ..Default::default()
        };
        let mut d = Ili9xxx::new(CaptureBus::new(40_000_000), CountingHost::default(), config);
        d.write_pixel(1, 1, Color::new(0, 240, 10)).unwrap();
        assert_eq!(d.framebuffer().get_pixel(1, 1), Some(2));
        d.flush().unwrap();
        assert_eq!(gram_of(&d).pixel(1, 1), Some(0x07E0));
    }

    #[test]
    fn test_bus_failure_clears_region_and_releases() {
        let mut d = driver(32, 32, ColorMode::Rgb565);
        d.write_pixel(1, 1, Color::RED).unwrap();
        // CASET, args, PASET, args, RAMWR, then the pixel write fails.
        d.bus_mut().fail_at_write(5);
        assert!(matches!(d.flush(), Err(Error::Bus(_))));
        assert!(d.dirty_region().is_empty());
        assert!(!d.bus().is_acquired());
        assert!(d.flush().unwrap().is_none());
    }

    #[test]
    fn test_allocation_failure_is_permanent() {
        let config = DriverConfig {
            width: 64,
            height: 64,
            buffer_limit: Some(100),
            ..Default::default()
        };
        let mut d = Ili9xxx::new(CaptureBus::new(1), CountingHost::default(), config);
        assert!(matches!(
            d.write_pixel(0, 0, Color::RED),
            Err(Error::BufferTooLarge { .. })
        ));
        assert!(d.is_failed());
        assert!(matches!(d.fill(Color::RED), Err(Error::Failed)));
        assert!(matches!(
            d.write_pixel(1, 1, Color::RED),
            Err(Error::Failed)
        ));
        assert!(d.flush().unwrap().is_none());
    }

    #[test]
    fn test_nested_update_coalesces() {
        let mut d = driver(32, 32, ColorMode::Rgb565);
        let mut passes = 0;
        d.update(|d| {
            passes += 1;
            d.write_pixel(passes, passes, Color::WHITE)?;
            if passes == 1 {
                d.request_update()?;
                assert!(d.update_repeat_requested());
                // Nothing has been sent yet.
                assert!(d.bus().transactions().is_empty());
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(passes, 2);
        assert_eq!(count_command(d.bus(), RAMWR), 1);
        assert_eq!(d.bus().acquire_count(), 1);
        assert_eq!(d.update_state(), UpdateState::Idle);
        assert!(!d.update_repeat_requested());
        assert_eq!(d.last_flush().unwrap().bounds, (1, 1, 2, 2));
    }

    #[test]
    fn test_update_error_resets_guard() {
        let mut d = driver(8, 8, ColorMode::Rgb565);
        let result = d.update(|_| Err(Error::Bus("repaint".to_string())));
        assert!(result.is_err());
        assert_eq!(d.update_state(), UpdateState::Idle);
        d.request_update().unwrap();
    }

    #[test]
    fn test_fast_path_bypasses_framebuffer() {
        let mut d = driver(32, 32, ColorMode::Rgb565);
        d.write_pixel(0, 0, Color::RED).unwrap();
        let before = *d.dirty_region();

        let pixels: Vec<u8> = (0..4).flat_map(|_| [0x07, 0xE0]).collect();
        let block = PixelBlock::new(&pixels, SourceFormat::NATIVE);
        d.write_block(10, 10, 2, 2, &block).unwrap();

        assert_eq!(*d.dirty_region(), before);
        assert_eq!(d.framebuffer().get_pixel(10, 10), Some(0));
        assert_eq!(d.bus().args_of(CASET), vec![vec![0, 10, 0, 11]]);
        assert_eq!(d.bus().pixel_writes(), vec![4, 4]);
        assert_eq!(gram_of(&d).pixel(11, 11), Some(0x07E0));
    }

    #[test]
    fn test_fast_path_honors_stride_and_offset() {
        let mut d = driver(32, 32, ColorMode::Rgb565);
        // 4x3 source, drawing the 2x2 block at source (1, 1).
        let mut pixels = vec![0u8; 4 * 3 * 2];
        for (i, chunk) in pixels.chunks_mut(2).enumerate() {
            chunk.copy_from_slice(&(i as u16).to_be_bytes());
        }
        let block = PixelBlock {
            data: &pixels,
            format: SourceFormat::NATIVE,
            x_offset: 1,
            y_offset: 1,
            x_pad: 1,
        };
        d.write_block(0, 0, 2, 2, &block).unwrap();
        let gram = gram_of(&d);
        assert_eq!(gram.pixel(0, 0), Some(5));
        assert_eq!(gram.pixel(1, 0), Some(6));
        assert_eq!(gram.pixel(0, 1), Some(9));
        assert_eq!(gram.pixel(1, 1), Some(10));
    }

    #[test]
    fn test_block_generic_path_marks_dirty() {
        let mut d = driver(32, 32, ColorMode::Rgb565);
        let pixels = [255u8, 0, 0, 0, 0, 255];
        let format = SourceFormat {
            bitness: crate::lcd::color::ColorBitness::Rgb888,
            ..SourceFormat::NATIVE
        };
        d.write_block(4, 5, 2, 1, &PixelBlock::new(&pixels, format))
            .unwrap();
        assert!(d.bus().transactions().is_empty());
        assert_eq!(d.dirty_region().bounds(), Some((4, 5, 5, 5)));
        assert_eq!(d.framebuffer().get_pixel(4, 5), Some(0xF800));
        assert_eq!(d.framebuffer().get_pixel(5, 5), Some(0x001F));
    }

    #[test]
    fn test_block_too_short() {
        let mut d = driver(32, 32, ColorMode::Rgb565);
        let block = PixelBlock::new(&[0u8; 6], SourceFormat::NATIVE);
        assert!(matches!(
            d.write_block(0, 0, 2, 2, &block),
            Err(Error::BlockSize {
                expected: 8,
                actual: 6
            })
        ));
    }

    #[test]
    fn test_set_invert_before_and_after_setup() {
        let mut d = driver(8, 8, ColorMode::Rgb565);
        d.set_invert(true).unwrap();
        assert!(d.bus().transactions().is_empty());
        d.setup().unwrap();
        assert!(d.bus().commands().contains(&INVON));
        assert!(gram_of(&d).is_inverted());

        d.bus_mut().clear();
        d.set_invert(false).unwrap();
        assert_eq!(d.bus().commands(), vec![INVOFF]);
    }

    #[test]
    fn test_read_command() {
        let mut d = driver(8, 8, ColorMode::Rgb565);
        d.bus_mut().queue_reads(&[0x00, 0x93, 0x41]);
        let value = d.read_command(0xD3, 2).unwrap();
        assert_eq!(value, 0x41);
        assert_eq!(d.bus().args_of(READ_INDEX), vec![vec![0x12]]);
    }
}

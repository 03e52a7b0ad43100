//! Transport and host seams the driver calls into.

use crate::Result;

/// Serial bus to the panel controller, including the DC and reset lines.
///
/// `acquire` and `release` bracket every command/data sequence; nothing else
/// may use the bus in between.
pub trait Bus {
    /// Asserts chip select and claims the bus.
    fn acquire(&mut self) -> Result<()>;

    /// Deasserts chip select.
    fn release(&mut self) -> Result<()>;

    /// Drives DC: `true` for data, `false` for commands.
    fn set_data_mode(&mut self, data: bool) -> Result<()>;

    /// Writes `data` and blocks until the transfer finished.
    fn write_bytes(&mut self, data: &[u8]) -> Result<()>;

    /// Clocks in a single byte.
    fn read_byte(&mut self) -> Result<u8>;

    /// Whether a hardware reset line is wired.
    fn has_reset(&self) -> bool {
        false
    }

    /// Drives the reset line. Ignored when no line is wired.
    fn set_reset(&mut self, _high: bool) -> Result<()> {
        Ok(())
    }

    /// Bus clock in Hz.
    fn data_rate(&self) -> u32;
}

impl<T: Bus + ?Sized> Bus for &mut T {
    fn acquire(&mut self) -> Result<()> {
        T::acquire(self)
    }

    fn release(&mut self) -> Result<()> {
        T::release(self)
    }

    fn set_data_mode(&mut self, data: bool) -> Result<()> {
        T::set_data_mode(self, data)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        T::write_bytes(self, data)
    }

    fn read_byte(&mut self) -> Result<u8> {
        T::read_byte(self)
    }

    fn has_reset(&self) -> bool {
        T::has_reset(self)
    }

    fn set_reset(&mut self, high: bool) -> Result<()> {
        T::set_reset(self, high)
    }

    fn data_rate(&self) -> u32 {
        T::data_rate(self)
    }
}

/// Services provided by the surrounding firmware.
pub trait Host {
    /// Signals liveness during long transfers.
    fn feed_watchdog(&mut self);

    /// Blocks for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

/// Host backed by the standard library. There is no watchdog to feed.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdHost;

impl Host for StdHost {
    fn feed_watchdog(&mut self) {}

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    }
}

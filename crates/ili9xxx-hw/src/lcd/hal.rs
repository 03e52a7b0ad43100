//! `embedded-hal` 1.0 backing for [`Bus`] and [`Host`].
//!
//! Chip select is owned by the [`SpiDevice`], which asserts it around every
//! write or read, so `acquire` and `release` have nothing to drive.

use crate::{Error, Result};
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::spi::{self, SpiDevice};

use super::bus::{Bus, Host};

fn spi_error<E: spi::Error>(e: E) -> Error {
    Error::Bus(format!("SPI: {:?}", e.kind()))
}

fn pin_error<E: digital::Error>(pin: &str, e: E) -> Error {
    Error::Bus(format!("{} pin: {:?}", pin, e.kind()))
}

/// Placeholder for a panel whose reset line is not wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResetPin;

impl digital::ErrorType for NoResetPin {
    type Error = Infallible;
}

impl OutputPin for NoResetPin {
    fn set_low(&mut self) -> core::result::Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Infallible> {
        Ok(())
    }
}

/// Four-wire SPI panel connection: SPI device, DC pin and optional reset pin.
pub struct SpiInterface<SPI, DC, RST = NoResetPin> {
    spi: SPI,
    dc: DC,
    rst: Option<RST>,
    data_rate: u32,
}

impl<SPI, DC> SpiInterface<SPI, DC, NoResetPin>
where
    SPI: SpiDevice,
    DC: OutputPin,
{
    /// Creates an interface without a reset line. `data_rate` is the SPI clock
    /// the device was configured with, used for transfer estimates only.
    pub fn new(spi: SPI, dc: DC, data_rate: u32) -> Self {
        Self {
            spi,
            dc,
            rst: None,
            data_rate,
        }
    }

    /// Adds a reset line, driven low to reset the controller.
    pub fn with_reset<RST: OutputPin>(self, rst: RST) -> SpiInterface<SPI, DC, RST> {
        SpiInterface {
            spi: self.spi,
            dc: self.dc,
            rst: Some(rst),
            data_rate: self.data_rate,
        }
    }
}

impl<SPI, DC, RST> SpiInterface<SPI, DC, RST> {
    /// Returns the SPI device and pins.
    pub fn into_parts(self) -> (SPI, DC, Option<RST>) {
        (self.spi, self.dc, self.rst)
    }
}

impl<SPI, DC, RST> Bus for SpiInterface<SPI, DC, RST>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
{
    fn acquire(&mut self) -> Result<()> {
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_data_mode(&mut self, data: bool) -> Result<()> {
        let level = if data {
            self.dc.set_high()
        } else {
            self.dc.set_low()
        };
        level.map_err(|e| pin_error("DC", e))
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.spi.write(data).map_err(spi_error)
    }

    fn read_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.spi.read(&mut buf).map_err(spi_error)?;
        Ok(buf[0])
    }

    fn has_reset(&self) -> bool {
        self.rst.is_some()
    }

    fn set_reset(&mut self, high: bool) -> Result<()> {
        let Some(rst) = self.rst.as_mut() else {
            return Ok(());
        };
        let level = if high { rst.set_high() } else { rst.set_low() };
        level.map_err(|e| pin_error("RST", e))
    }

    fn data_rate(&self) -> u32 {
        self.data_rate
    }
}

/// Host that delays through an [`embedded_hal::delay::DelayNs`] provider.
/// There is no watchdog to feed.
#[derive(Debug, Default, Clone)]
pub struct DelayHost<D> {
    delay: D,
}

impl<D: DelayNs> DelayHost<D> {
    pub fn new(delay: D) -> Self {
        Self { delay }
    }

    /// Returns the wrapped delay provider.
    pub fn into_inner(self) -> D {
        self.delay
    }
}

impl<D: DelayNs> Host for DelayHost<D> {
    fn feed_watchdog(&mut self) {}

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}

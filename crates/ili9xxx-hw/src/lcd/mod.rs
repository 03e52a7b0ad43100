//! Panel controller driver.
//!
//! Pixels are drawn into a frame buffer and only the region that changed is
//! sent on flush, either as full rows or as a converted rectangle.

mod device;
mod graphics;
mod update;

pub mod bus;
pub mod capture;
pub mod color;
pub mod dirty;
pub mod framebuffer;
pub mod hal;
pub mod protocol;
pub mod strategy;

pub use bus::{Bus, Host, StdHost};
pub use capture::{CaptureBus, CountingHost, Gram, Transaction};
pub use color::{Color, ColorBitness, ColorMode, ColorOrder, Palette, SourceFormat};
pub use device::{DriverConfig, FlushReport, Ili9xxx, PixelBlock};
pub use dirty::DirtyRegion;
pub use framebuffer::Framebuffer;
pub use hal::{DelayHost, NoResetPin, SpiInterface};
pub use strategy::{Strategy, TransferEstimate};
pub use update::UpdateState;

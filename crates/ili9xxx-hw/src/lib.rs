//! ILI9xxx Display Driver Library
//!
//! Frame-buffered driver for ILI9xxx and ST77xx family TFT controllers on a
//! serial bus. Drawing goes to memory; a flush sends just the changed region,
//! picking the cheaper of two transfer strategies.
//!
//! On hardware, wrap an `embedded-hal` SPI device and pins in
//! [`lcd::SpiInterface`] and a delay provider in [`lcd::DelayHost`].

pub mod error;
pub mod lcd;
pub mod profile;
pub mod rotation;

pub use error::{Error, Result};
pub use lcd::{Color, ColorMode, DriverConfig, Ili9xxx, PixelBlock, SourceFormat};
pub use profile::{PanelModel, PanelProfile};
pub use rotation::Rotation;

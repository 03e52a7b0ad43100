//! Panel configuration file.

use anyhow::{Context, Result};
use ili9xxx_hw::{rotation, ColorMode, DriverConfig, PanelModel, Rotation};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Panel description loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Panel model (e.g., "ili9341", "st7789v")
    #[serde(default = "default_model")]
    pub model: String,

    /// Width in pixels as seen after rotation, 0 for the model default
    /// (rotated along with the panel)
    #[serde(default)]
    pub width: u16,

    /// Height in pixels as seen after rotation, 0 for the model default
    /// (rotated along with the panel)
    #[serde(default)]
    pub height: u16,

    /// Column offset of the visible area
    #[serde(default)]
    pub offset_x: u16,

    /// Row offset of the visible area
    #[serde(default)]
    pub offset_y: u16,

    /// Frame buffer layout: indexed8, rgb332 or rgb565
    #[serde(default = "default_color_mode")]
    pub color_mode: String,

    /// Force 18-bit wire pixels
    #[serde(default)]
    pub is_18bit: bool,

    /// Color inversion, omit for the model default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invert: Option<bool>,

    /// Rotation in degrees: 0, 90, 180 or 270
    #[serde(default = "default_rotation")]
    pub rotation: String,

    #[serde(default)]
    pub mirror_x: bool,

    #[serde(default)]
    pub mirror_y: bool,

    /// Panel expects BGR subpixel order
    #[serde(default)]
    pub bgr: bool,

    /// Bus clock in Hz
    #[serde(default = "default_data_rate")]
    pub data_rate: u32,
}

// Default value functions
fn default_model() -> String {
    "ili9341".to_string()
}

fn default_color_mode() -> String {
    "rgb565".to_string()
}

fn default_rotation() -> String {
    "0".to_string()
}

fn default_data_rate() -> u32 {
    40_000_000
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path.as_ref(), content).context("Failed to write configuration file")?;
        Ok(())
    }

    /// Resolves the names and rotation into a driver configuration.
    pub fn driver_config(&self) -> Result<DriverConfig> {
        let model: PanelModel = self.model.parse()?;
        let color_mode: ColorMode = self.color_mode.parse()?;
        let rotation: Rotation = self.rotation.parse()?;

        // Only the model defaults are in native orientation.
        let profile = model.profile();
        let (default_width, default_height) =
            rotation.dimensions(profile.default_width, profile.default_height);
        let width = if self.width == 0 {
            default_width
        } else {
            self.width
        };
        let height = if self.height == 0 {
            default_height
        } else {
            self.height
        };

        Ok(DriverConfig {
            model,
            width,
            height,
            offset_x: self.offset_x,
            offset_y: self.offset_y,
            color_mode,
            is_18bit: self.is_18bit,
            invert: self.invert,
            madctl: rotation::madctl(rotation, self.mirror_x, self.mirror_y, self.bgr),
            ..Default::default()
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            width: 0,
            height: 0,
            offset_x: 0,
            offset_y: 0,
            color_mode: default_color_mode(),
            is_18bit: false,
            invert: None,
            rotation: default_rotation(),
            mirror_x: false,
            mirror_y: false,
            bgr: false,
            data_rate: default_data_rate(),
        }
    }
}

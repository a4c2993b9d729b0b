/*
 *  display/drivers/sh1106.rs
 *
 *  moled - moOde OLED now-playing monitor
 *
 *  SH1106 OLED display driver, I2C attached
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use embedded_graphics::geometry::Size;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

use linux_embedded_hal::I2cdev;
use sh1106::{Builder, prelude::*};

use crate::config::DisplayConfig;
use crate::display::error::DisplayError;
use crate::display::traits::{DisplayCapabilities, DisplayDriver};

use log::info;

/// Effective panel dimensions after rotation: a 90/270 mount swaps the
/// configured width and height.
fn oriented_dimensions(config: &DisplayConfig, rotation: DisplayRotation) -> (u32, u32) {
    let width = config.width.unwrap_or(128);
    let height = config.height.unwrap_or(64);
    match rotation {
        DisplayRotation::Rotate90 | DisplayRotation::Rotate270 => (height, width),
        DisplayRotation::Rotate0 | DisplayRotation::Rotate180 => (width, height),
    }
}

/// SH1106 display driver wrapper
pub struct Sh1106Driver {
    /// The underlying sh1106 driver in buffered graphics mode
    display: GraphicsMode<I2cInterface<I2cdev>>,

    /// Display capabilities
    capabilities: DisplayCapabilities,
}

impl Sh1106Driver {
    /// Create a new SH1106 driver using I2C
    ///
    /// # Arguments
    ///
    /// * `i2c_bus_path` - Path to I2C device (e.g., "/dev/i2c-1")
    /// * `address` - I2C address (typically 0x3C)
    /// * `config` - Display configuration
    pub fn new_i2c(
        i2c_bus_path: &str,
        address: u8,
        config: &DisplayConfig,
    ) -> Result<Self, DisplayError> {
        info!("Initializing SH1106 on {} at address 0x{:02X}", i2c_bus_path, address);

        let i2c = I2cdev::new(i2c_bus_path)
            .map_err(|e| DisplayError::I2cError(format!("Failed to open {}: {}", i2c_bus_path, e)))?;

        // Rotation is fixed at construction time on the SH1106.
        let rotation = match config.rotate_deg.unwrap_or(0) {
            0 => DisplayRotation::Rotate0,
            90 => DisplayRotation::Rotate90,
            180 => DisplayRotation::Rotate180,
            270 => DisplayRotation::Rotate270,
            deg => {
                return Err(DisplayError::InvalidConfiguration(format!(
                    "rotate_deg must be 0|90|180|270, got {}",
                    deg
                )));
            }
        };

        let display: GraphicsMode<_> = Builder::new()
            .with_i2c_addr(address)
            .with_rotation(rotation)
            .connect_i2c(i2c)
            .into();

        let (width, height) = oriented_dimensions(config, rotation);
        let capabilities = DisplayCapabilities { width, height };

        let mut driver = Self { display, capabilities };
        driver.init()?;

        if let Some(brightness) = config.brightness {
            driver.set_brightness(brightness)?;
        }

        info!(
            "SH1106 initialized ({}x{})",
            driver.capabilities.width, driver.capabilities.height
        );

        Ok(driver)
    }
}

impl DisplayDriver for Sh1106Driver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        self.display
            .init()
            .map_err(|e| DisplayError::InitializationFailed(format!("{:?}", e)))
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        self.display
            .flush()
            .map_err(|e| DisplayError::FlushFailed(format!("{:?}", e)))
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        self.display
            .set_contrast(value)
            .map_err(|e| DisplayError::Other(format!("Set contrast failed: {:?}", e)))
    }
}

impl DrawTarget for Sh1106Driver {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.display.draw_iter(pixels)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        // Qualified call: GraphicsMode also has an inherent no-arg clear().
        DrawTarget::clear(&mut self.display, color)
    }
}

impl OriginDimensions for Sh1106Driver {
    fn size(&self) -> Size {
        Size::new(self.capabilities.width, self.capabilities.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sideways_rotation_swaps_panel_dimensions() {
        let config = DisplayConfig {
            width: Some(128),
            height: Some(64),
            ..Default::default()
        };
        assert_eq!(oriented_dimensions(&config, DisplayRotation::Rotate0), (128, 64));
        assert_eq!(oriented_dimensions(&config, DisplayRotation::Rotate180), (128, 64));
        assert_eq!(oriented_dimensions(&config, DisplayRotation::Rotate90), (64, 128));
        assert_eq!(oriented_dimensions(&config, DisplayRotation::Rotate270), (64, 128));
    }
}

/*
 *  display/drivers/mock.rs
 *
 *  moled - moOde OLED now-playing monitor
 *
 *  Mock display driver for testing without hardware
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

use crate::display::error::DisplayError;
use crate::display::traits::{DisplayCapabilities, DisplayDriver};
use crate::vframebuf::VarFrameBuf;

use std::sync::{Arc, Mutex};

/// Mock display driver for tests and CI. Records every lifecycle call
/// and keeps each flushed frame for inspection.
#[derive(Debug, Clone)]
pub struct MockDriver {
    framebuffer: VarFrameBuf<BinaryColor>,
    capabilities: DisplayCapabilities,
    state: Arc<Mutex<MockDriverState>>,
}

/// Internal state for the mock driver (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockDriverState {
    pub init_count: usize,
    pub flush_count: usize,
    pub last_brightness: Option<u8>,
    /// Snapshot of the framebuffer at every flush, oldest first.
    pub flushed_frames: Vec<Vec<BinaryColor>>,
    /// Simulate failures (for error-path testing)
    pub simulate_flush_failure: bool,
}

impl MockDriver {
    pub fn new(width: u32, height: u32) -> Self {
        let capabilities = DisplayCapabilities { width, height };
        Self {
            framebuffer: VarFrameBuf::new(width, height, BinaryColor::Off),
            capabilities,
            state: Arc::new(Mutex::new(MockDriverState::default())),
        }
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockDriverState>> {
        Arc::clone(&self.state)
    }

    /// Get pixel at position for testing
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<BinaryColor> {
        self.framebuffer.pixel(x, y)
    }

    /// Count number of pixels currently set to On
    pub fn count_on_pixels(&self) -> usize {
        self.framebuffer
            .as_slice()
            .iter()
            .filter(|&&p| p == BinaryColor::On)
            .count()
    }
}

impl DisplayDriver for MockDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let mut state = self.state.lock().unwrap();
        state.init_count += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        let mut state = self.state.lock().unwrap();
        if state.simulate_flush_failure {
            return Err(DisplayError::FlushFailed("simulated".to_string()));
        }
        state.flush_count += 1;
        state.flushed_frames.push(self.framebuffer.as_slice().to_vec());
        Ok(())
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        self.state.lock().unwrap().last_brightness = Some(value);
        Ok(())
    }
}

impl DrawTarget for MockDriver {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.framebuffer.draw_iter(pixels)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.framebuffer.clear(color)
    }
}

impl OriginDimensions for MockDriver {
    fn size(&self) -> Size {
        Size::new(self.capabilities.width, self.capabilities.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{Line, PrimitiveStyle};

    #[test]
    fn creation_and_dimensions() {
        let driver = MockDriver::new(128, 64);
        assert_eq!(driver.dimensions(), (128, 64));
        assert_eq!(driver.count_on_pixels(), 0);
    }

    #[test]
    fn drawing_sets_pixels() {
        let mut driver = MockDriver::new(128, 64);
        Line::new(Point::new(0, 0), Point::new(10, 10))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut driver)
            .unwrap();
        assert!(driver.count_on_pixels() > 0);
        assert_eq!(driver.get_pixel(0, 0), Some(BinaryColor::On));
    }

    #[test]
    fn flush_records_frames() {
        let mut driver = MockDriver::new(8, 8);
        driver.flush().unwrap();
        Line::new(Point::new(0, 0), Point::new(7, 0))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut driver)
            .unwrap();
        driver.flush().unwrap();

        let state = driver.state();
        let state = state.lock().unwrap();
        assert_eq!(state.flush_count, 2);
        assert!(state.flushed_frames[0].iter().all(|&p| p == BinaryColor::Off));
        assert!(state.flushed_frames[1].contains(&BinaryColor::On));
    }

    #[test]
    fn brightness_calls_are_recorded() {
        let mut driver = MockDriver::new(8, 8);
        driver.set_brightness(0x7F).unwrap();
        assert_eq!(driver.state().lock().unwrap().last_brightness, Some(0x7F));
    }

    #[test]
    fn simulated_flush_failure() {
        let mut driver = MockDriver::new(8, 8);
        driver.state().lock().unwrap().simulate_flush_failure = true;
        assert!(driver.flush().is_err());
        driver.state().lock().unwrap().simulate_flush_failure = false;
        assert!(driver.flush().is_ok());
    }
}

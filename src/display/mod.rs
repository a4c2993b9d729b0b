/*
 *  display/mod.rs
 *
 *  moled - moOde OLED now-playing monitor
 *
 *  Display subsystem: driver abstraction and the scrolling renderer.
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

pub mod drivers;
pub mod error;
pub mod scroller;
pub mod traits;

// Re-exports for convenience
pub use error::DisplayError;
pub use scroller::Scroller;
pub use traits::{DisplayCapabilities, DisplayDriver};

/*
 *  display/error.rs
 *
 *  moled - moOde OLED now-playing monitor
 *
 *  Unified error type for the display subsystem
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

use thiserror::Error;

/// Unified error type for all display operations
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("Display initialization failed: {0}")]
    InitializationFailed(String),

    #[error("I2C communication error: {0}")]
    I2cError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Flush failed: {0}")]
    FlushFailed(String),

    #[error("{0}")]
    Other(String),
}

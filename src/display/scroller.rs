/*
 *  display/scroller.rs
 *
 *  moled - moOde OLED now-playing monitor
 *
 *  The scrolling renderer: composes the current two display lines into
 *  a wide off-screen canvas and slides a display-sized viewport across
 *  it, one full pass per line-buffer snapshot.
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

use std::time::Duration;

use embedded_graphics::mono_font::{MonoFont, MonoTextStyle, ascii::FONT_10X20};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use log::{error, info, warn};
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::constants::{SCROLL_FRAME_MS, SCROLL_HOLD_MS, SCROLL_STEP_PX};
use crate::display::error::DisplayError;
use crate::display::traits::DisplayDriver;
use crate::state::{DisplayLines, LineBuffer};
use crate::vframebuf::VarFrameBuf;

/// Pixel footprint of `text` rendered in a mono font.
pub fn measure(text: &str, font: &MonoFont<'_>) -> (u32, u32) {
    let glyphs = text.chars().count() as u32;
    let height = font.character_size.height;
    if glyphs == 0 {
        return (0, height);
    }
    let advance = font.character_size.width + font.character_spacing;
    (glyphs * advance - font.character_spacing, height)
}

/// Compose the off-screen canvas for one snapshot: both lines drawn once,
/// side by side vertically, with enough trailing margin for a full
/// horizontal scroll of a `display_width` viewport.
pub fn compose(
    snap: &DisplayLines,
    font: &MonoFont<'_>,
    display_width: u32,
    display_height: u32,
) -> VarFrameBuf<BinaryColor> {
    let (w1, _) = measure(&snap.primary, font);
    let (w2, _) = measure(&snap.secondary, font);
    let canvas_width = display_width + display_width + w1.max(w2);
    let mut canvas = VarFrameBuf::new(canvas_width, display_height, BinaryColor::Off);

    let style = MonoTextStyle::new(font, BinaryColor::On);
    // Drawing into the canvas is infallible.
    let _ = Text::with_baseline(&snap.primary, Point::zero(), style, Baseline::Top)
        .draw(&mut canvas);
    let _ = Text::with_baseline(
        &snap.secondary,
        Point::new(0, display_height as i32 / 2),
        style,
        Baseline::Top,
    )
    .draw(&mut canvas);

    canvas
}

/// The renderer loop. Owns the display driver for the process lifetime.
pub struct Scroller<D> {
    driver: D,
    lines: LineBuffer,
    font: &'static MonoFont<'static>,
    step_px: i32,
    frame: Duration,
    hold: Duration,
}

impl<D> Scroller<D>
where
    D: DisplayDriver + DrawTarget<Color = BinaryColor, Error = core::convert::Infallible>,
{
    pub fn new(driver: D, lines: LineBuffer) -> Self {
        Scroller {
            driver,
            lines,
            font: &FONT_10X20,
            step_px: SCROLL_STEP_PX,
            frame: Duration::from_millis(SCROLL_FRAME_MS),
            hold: Duration::from_millis(SCROLL_HOLD_MS),
        }
    }

    /// Override the animation timing (config and tests).
    pub fn with_timing(mut self, step_px: i32, frame: Duration, hold: Duration) -> Self {
        self.step_px = step_px.max(1);
        self.frame = frame;
        self.hold = hold;
        self
    }

    /// One complete scroll pass over `snap`: hold at the start position,
    /// then advance the viewport in fixed steps until it has traversed
    /// the display width plus the taller line's height. The snapshot is
    /// immutable for the whole pass.
    ///
    /// Returns `Ok(false)` when the stop signal arrived mid-pass.
    pub async fn render_pass(
        &mut self,
        snap: &DisplayLines,
        stop: &mut mpsc::Receiver<()>,
    ) -> Result<bool, DisplayError> {
        let (dw, dh) = self.driver.dimensions();
        let canvas = compose(snap, self.font, dw, dh);
        let (_, h1) = measure(&snap.primary, self.font);
        let (_, h2) = measure(&snap.secondary, self.font);
        let travel = (dw + h1.max(h2)) as i32;

        let mut offset = 0i32;
        while offset < travel {
            let _ = DrawTarget::clear(&mut self.driver, BinaryColor::Off);
            let _ = canvas.blit_window(offset, dw, dh, &mut self.driver);
            self.driver.flush()?;

            let delay = if offset == 0 { self.hold } else { self.frame };
            tokio::select! {
                _ = sleep(delay) => {}
                _ = stop.recv() => return Ok(false),
            }
            offset += self.step_px;
        }
        Ok(true)
    }

    /// Run until the stop channel fires. Re-snapshots the line buffer
    /// only between passes, so mid-scroll text never mutates; a driver
    /// failure logs, backs off, and retries with a fresh pass.
    pub async fn run(mut self, mut stop: mpsc::Receiver<()>) {
        info!("Renderer starting");
        loop {
            let snap = self.lines.snapshot().await;
            match self.render_pass(&snap, &mut stop).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    error!("Render pass failed: {e}");
                    tokio::select! {
                        _ = sleep(Duration::from_secs(1)) => {}
                        _ = stop.recv() => break,
                    }
                }
            }
        }

        // Blank the panel on the way out.
        let _ = DrawTarget::clear(&mut self.driver, BinaryColor::Off);
        if let Err(e) = self.driver.flush() {
            warn!("Failed to clear display on shutdown: {e}");
        }
        info!("Renderer stopped");
    }
}

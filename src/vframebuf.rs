/*
 *  vframebuf.rs
 *
 *  moled - moOde OLED now-playing monitor
 *
 *  Runtime-sized off-screen canvas for the scrolling renderer.
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

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::PixelColor;
use embedded_graphics::prelude::*;

/// A runtime-sized framebuffer for embedded-graphics. The renderer draws
/// both display lines into one wide canvas and then slides a
/// display-sized viewport across it.
#[derive(Debug, Clone)]
pub struct VarFrameBuf<C: PixelColor> {
    buf: Vec<C>,
    w: usize,
    h: usize,
}

impl<C: PixelColor> VarFrameBuf<C> {
    pub fn new(width: u32, height: u32, fill: C) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![fill; w * h], w, h }
    }

    pub fn width(&self) -> u32 {
        self.w as u32
    }

    pub fn height(&self) -> u32 {
        self.h as u32
    }

    /// Immutable raw access
    pub fn as_slice(&self) -> &[C] {
        &self.buf
    }

    /// Pixel at (x, y); None when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<C> {
        if (x as usize) < self.w && (y as usize) < self.h {
            self.buf.get(y as usize * self.w + x as usize).copied()
        } else {
            None
        }
    }

    /// Map (x,y) to linear index; returns None if out of bounds
    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }

    /// Copy a `width` x `height` viewport of this canvas, starting at
    /// horizontal `offset`, into `target` at the origin. Source pixels
    /// beyond the canvas edge are skipped, so clear the target first.
    pub fn blit_window<D>(
        &self,
        offset: i32,
        width: u32,
        height: u32,
        target: &mut D,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = C>,
    {
        let pixels = (0..height.min(self.h as u32)).flat_map(move |y| {
            (0..width).filter_map(move |x| {
                let src = Point::new(offset + x as i32, y as i32);
                self.idx(src)
                    .map(|i| Pixel(Point::new(x as i32, y as i32), self.buf[i]))
            })
        });
        target.draw_iter(pixels)
    }
}

impl<C: PixelColor> OriginDimensions for VarFrameBuf<C> {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl<C: PixelColor> DrawTarget for VarFrameBuf<C> {
    type Color = C;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.buf.fill(color);
        Ok(())
    }
}

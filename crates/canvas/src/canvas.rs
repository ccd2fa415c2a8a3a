// Copyright (c) 2025 Zensical and contributors

// SPDX-License-Identifier: MIT
// Third-party contributions licensed under DCO

// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to
// deal in the Software without restriction, including without limitation the
// rights to use, copy, modify, merge, publish, distribute, sublicense, and/or
// sell copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:

// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NON-INFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS
// IN THE SOFTWARE.

// ----------------------------------------------------------------------------

//! Canvas.

use canvas_serve::universe::Universe;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::SystemTime;

mod error;
mod pixel;

pub use error::{Error, Result};
pub use pixel::{Color, Pixel};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Title of the board document.
pub const REPLY_ENTIRE_BOARD: &str = "REPLY_ENTIRE_BOARD";

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Canvas.
///
/// The canvas is a grid of pixels in row-major order, together with the size
/// clients should use to draw a single pixel. Every successful update bumps
/// the generation, which tells whether the canvas changed since some earlier
/// point in time, e.g., the last snapshot.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use canvas::canvas::{Canvas, Color, Pixel};
///
/// // Create canvas and update pixel
/// let mut canvas = Canvas::new(2, 2, 4);
/// let mut pixel = Pixel::new(3);
/// pixel.change_color(Color::new(255, 255, 255));
/// canvas.update_pixel(pixel)?;
/// assert_eq!(canvas.generation(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Canvas {
    /// Width in pixels.
    width: usize,
    /// Height in pixels.
    height: usize,
    /// Size of a pixel when drawn by clients.
    pixel_size: usize,
    /// Pixels in row-major order.
    pixels: Vec<Pixel>,
    /// Number of successful updates.
    generation: u64,
    /// Time of the last change.
    modified: SystemTime,
}

/// Board document, as read from snapshots.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Board {
    /// Width in pixels.
    width: usize,
    /// Height in pixels.
    height: usize,
    /// Size of a pixel when drawn by clients.
    pixel_size: usize,
    /// Pixels in any order.
    pixels: Vec<Pixel>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Canvas {
    /// Creates a canvas of black pixels.
    #[must_use]
    pub fn new(width: usize, height: usize, pixel_size: usize) -> Self {
        Self {
            width,
            height,
            pixel_size,
            pixels: (0..width * height).map(Pixel::new).collect(),
            generation: 0,
            modified: SystemTime::now(),
        }
    }

    /// Creates a canvas from a board document.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Json`] if the document doesn't have the
    /// shape of a board, and [`Error::Board`] if dimensions are zero, or the
    /// pixels don't cover every identifier exactly once.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use canvas::canvas::Canvas;
    ///
    /// // Create canvas from board
    /// let board = Canvas::new(2, 1, 8).to_json();
    /// let canvas = Canvas::from_board(&board)?;
    /// assert_eq!(canvas.len(), 2);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_board(value: &Value) -> Result<Self> {
        let Board { width, height, pixel_size, mut pixels } =
            Board::deserialize(value)?;
        if width == 0 || height == 0 || pixel_size == 0 {
            return Err(Error::Board("dimensions must be non-zero".into()));
        }

        // Ensure the pixels cover the entire canvas
        let len = width.checked_mul(height).unwrap_or(usize::MAX);
        if pixels.len() != len {
            return Err(Error::Board(format!(
                "expected {len} pixels, found {}",
                pixels.len()
            )));
        }

        // Ensure there's exactly one pixel per identifier
        pixels.sort_unstable_by_key(|pixel| pixel.id);
        let mut ids = pixels.iter().map(|pixel| pixel.id);
        if let Some(n) = (0..len).find(|&n| ids.next() != Some(n)) {
            return Err(Error::Board(format!("missing or duplicate pixel {n}")));
        }

        // Create canvas
        Ok(Self {
            width,
            height,
            pixel_size,
            pixels,
            generation: 0,
            modified: SystemTime::now(),
        })
    }

    /// Replaces the pixel with the same identifier.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::OutOfBounds`] if the identifier is not
    /// part of the canvas, in which case the canvas is left unchanged.
    pub fn update_pixel(&mut self, pixel: Pixel) -> Result {
        let len = self.pixels.len();
        let Some(slot) = self.pixels.get_mut(pixel.id) else {
            tracing::warn!("Pixel id out of bounds: {} >= {len}", pixel.id);
            return Err(Error::OutOfBounds { id: pixel.id, len });
        };

        // Replace pixel and record change
        *slot = pixel;
        self.generation += 1;
        self.modified = SystemTime::now();
        Ok(())
    }

    /// Returns the board document.
    ///
    /// Keys are emitted in the order clients expect them, i.e., title, width,
    /// height, pixel size, and pixels.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let pixels: Vec<_> = self.pixels.iter().map(Pixel::to_json).collect();
        json!({
            "title": REPLY_ENTIRE_BOARD,
            "width": self.width,
            "height": self.height,
            "pixelSize": self.pixel_size,
            "pixels": pixels
        })
    }

    /// Returns the board document as a JSON string.
    #[must_use]
    pub fn stringify(&self) -> String {
        self.to_json().to_string()
    }
}

#[allow(clippy::must_use_candidate)]
impl Canvas {
    /// Returns the pixel with the given identifier.
    #[inline]
    pub fn pixel(&self, id: usize) -> Option<&Pixel> {
        self.pixels.get(id)
    }

    /// Returns the width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the size of a pixel when drawn by clients.
    #[inline]
    pub fn pixel_size(&self) -> usize {
        self.pixel_size
    }

    /// Returns the number of pixels.
    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Returns whether there are any pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Returns the number of successful updates.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the time of the last change.
    #[inline]
    pub fn modified(&self) -> SystemTime {
        self.modified
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Universe for Canvas {
    type Atom = Pixel;
    type Error = Error;

    #[inline]
    fn update_atom(&mut self, pixel: Pixel) -> Result {
        self.update_pixel(pixel)
    }

    #[inline]
    fn as_json(&self) -> Value {
        self.to_json()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn black(id: usize) -> Value {
        json!({ "id": id, "color": { "r": 0, "g": 0, "b": 0 } })
    }

    #[test]
    fn test_stringify() {
        let expected = json!({
            "title": REPLY_ENTIRE_BOARD,
            "width": 2,
            "height": 2,
            "pixelSize": 4,
            "pixels": [black(0), black(1), black(2), black(3)]
        });
        let canvas = Canvas::new(2, 2, 4);
        assert_eq!(canvas.stringify(), expected.to_string());
        assert!(canvas.stringify().starts_with(
            r#"{"title":"REPLY_ENTIRE_BOARD","width":2,"height":2,"pixelSize":4,"#
        ));
    }

    #[test]
    fn test_update_pixel() {
        let mut canvas = Canvas::new(3, 2, 1);
        let mut pixel = Pixel::new(4);
        pixel.change_color(Color::new(1, 2, 3));
        canvas.update_pixel(pixel.clone()).unwrap();
        assert_eq!(canvas.pixel(4), Some(&pixel));
        assert_eq!(canvas.generation(), 1);
    }

    #[test]
    fn test_update_pixel_out_of_bounds() {
        let mut canvas = Canvas::new(2, 2, 1);
        let before = canvas.stringify();
        let res = canvas.update_pixel(Pixel::new(4));
        assert!(matches!(res, Err(Error::OutOfBounds { id: 4, len: 4 })));
        assert_eq!(canvas.stringify(), before);
        assert_eq!(canvas.generation(), 0);
    }

    #[test]
    fn test_from_board_restores_pixels() {
        let mut canvas = Canvas::new(2, 2, 6);
        let mut pixel = Pixel::new(2);
        pixel.change_color(Color::new(9, 8, 7));
        canvas.update_pixel(pixel).unwrap();

        // Shuffled pixels are put back in order
        let mut board = canvas.to_json();
        if let Some(pixels) = board["pixels"].as_array_mut() {
            pixels.reverse();
        }
        let restored = Canvas::from_board(&board).unwrap();
        assert_eq!(restored.stringify(), canvas.stringify());
        assert_eq!(restored.pixel_size(), 6);
    }

    #[test]
    fn test_from_board_rejects_wrong_count() {
        let mut board = Canvas::new(2, 2, 1).to_json();
        board["width"] = json!(3);
        let res = Canvas::from_board(&board);
        assert!(matches!(res, Err(Error::Board(_))));
    }

    #[test]
    fn test_from_board_rejects_duplicate_ids() {
        let mut board = Canvas::new(2, 1, 1).to_json();
        board["pixels"] = json!([black(0), black(0)]);
        let res = Canvas::from_board(&board);
        assert!(matches!(res, Err(Error::Board(_))));
    }

    #[test]
    fn test_from_board_rejects_malformed() {
        let res = Canvas::from_board(&json!({ "width": "wide" }));
        assert!(matches!(res, Err(Error::Json(_))));
    }
}

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

//! Pixel and color.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// RGB color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

/// Pixel.
///
/// A pixel is a single square on the canvas, identified by its position in
/// row-major order, which is also what clients use to address it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Pixel {
    /// Pixel identifier.
    pub id: usize,
    /// Pixel color.
    pub color: Color,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Color {
    /// Creates a color.
    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Pixel {
    /// Creates a black pixel.
    ///
    /// # Examples
    ///
    /// ```
    /// use canvas::canvas::{Color, Pixel};
    ///
    /// // Create pixel
    /// let pixel = Pixel::new(7);
    /// assert_eq!(pixel.color, Color::default());
    /// ```
    #[inline]
    #[must_use]
    pub fn new(id: usize) -> Self {
        Self { id, color: Color::default() }
    }

    /// Changes the color of the pixel.
    #[inline]
    pub fn change_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Reads a pixel from JSON.
    ///
    /// The identifier must be a non-negative integer, and each channel of the
    /// color an integer between 0 and 255. Additional keys are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use canvas::canvas::{Color, Pixel};
    /// use serde_json::json;
    ///
    /// // Read pixel from JSON
    /// let value = json!({ "id": 3, "color": { "r": 255, "g": 0, "b": 0 } });
    /// let pixel = Pixel::from_json(&value).unwrap();
    /// assert_eq!(pixel.color, Color::new(255, 0, 0));
    ///
    /// // Channels must fit into a byte
    /// let value = json!({ "id": 3, "color": { "r": 256, "g": 0, "b": 0 } });
    /// assert!(Pixel::from_json(&value).is_none());
    /// ```
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        let id = value["id"].as_u64()?;
        let color = &value["color"];
        let channel = |key: &str| {
            color[key].as_u64().and_then(|value| u8::try_from(value).ok())
        };
        Some(Self {
            id: usize::try_from(id).ok()?,
            color: Color::new(channel("r")?, channel("g")?, channel("b")?),
        })
    }

    /// Returns the pixel as JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let Color { r, g, b } = self.color;
        serde_json::json!({
            "id": self.id,
            "color": { "r": r, "g": g, "b": b }
        })
    }

    /// Returns the pixel as a JSON string.
    #[must_use]
    pub fn stringify(&self) -> String {
        self.to_string()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl From<Pixel> for Value {
    #[inline]
    fn from(pixel: Pixel) -> Self {
        pixel.to_json()
    }
}

impl fmt::Display for Pixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_json().fmt(f)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_change_color() {
        let mut pixel = Pixel::new(5);
        pixel.change_color(Color::new(5, 6, 7));
        assert_eq!(pixel.id, 5);
        assert_eq!(pixel.color, Color::new(5, 6, 7));
    }

    #[test]
    fn test_stringify_black() {
        let pixel = Pixel::new(1);
        let expected = r#"{"id":1,"color":{"r":0,"g":0,"b":0}}"#;
        assert_eq!(pixel.stringify(), expected);
    }

    #[test]
    fn test_stringify_matches_json() {
        let mut pixel = Pixel::new(5);
        pixel.change_color(Color::new(5, 6, 7));
        let expected = r#"{"id":5,"color":{"r":5,"g":6,"b":7}}"#;
        assert_eq!(pixel.stringify(), expected);
        assert_eq!(pixel.to_json().to_string(), expected);
    }

    #[test]
    fn test_from_json_reads_stringified() {
        let mut pixel = Pixel::new(5);
        pixel.change_color(Color::new(5, 6, 7));
        let value: Value = serde_json::from_str(&pixel.stringify()).unwrap();
        assert_eq!(Pixel::from_json(&value), Some(pixel));
    }

    #[test]
    fn test_from_json_ignores_extra_keys() {
        let value = json!({
            "id": 0,
            "color": { "r": 1, "g": 2, "b": 3, "a": 4 },
            "author": "anonymous"
        });
        let pixel = Pixel::from_json(&value).unwrap();
        assert_eq!(pixel.color, Color::new(1, 2, 3));
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        for value in [
            json!({ "rust": "is pretty cool" }),
            json!({ "id": -1, "color": { "r": 0, "g": 0, "b": 0 } }),
            json!({ "id": 1.5, "color": { "r": 0, "g": 0, "b": 0 } }),
            json!({ "id": "1", "color": { "r": 0, "g": 0, "b": 0 } }),
            json!({ "id": 1, "color": { "r": 0, "g": 0 } }),
            json!({ "id": 1, "color": { "r": 0, "g": -1, "b": 0 } }),
            json!({ "id": 1, "color": "red" }),
            json!([1, [0, 0, 0]]),
        ] {
            assert!(Pixel::from_json(&value).is_none(), "{value}");
        }
    }
}

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

//! Responder for canvas clients.

use canvas_serve::responder::{Outcome, Responder};
use canvas_serve::universe::{self, Shared, Universe};
use serde_json::{Value, json};

use super::canvas::{Canvas, Pixel, Result};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Request for the entire board.
pub const RETRIEVE_BOARD: &str = "RETRIEVE_BOARD";

/// Request and notification for a single pixel change.
pub const PIXEL_CHANGED: &str = "PIXEL_CHANGED";

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Responder for canvas clients.
///
/// Clients send JSON objects with a `title` key. `RETRIEVE_BOARD` is answered
/// with the entire board, and `PIXEL_CHANGED` updates the pixel given under
/// the `pixel_changed` key, and notifies all clients. Everything else is
/// ignored.
///
/// # Examples
///
/// ```
/// use canvas::canvas::Canvas;
/// use canvas::responder::CanvasResponder;
/// use canvas_serve::responder::{Outcome, Responder};
/// use canvas_serve::universe;
/// use serde_json::json;
///
/// // Create canvas and request board
/// let shared = universe::share(Canvas::new(1, 1, 10));
/// let outcome = CanvasResponder.respond(
///     json!({ "title": "RETRIEVE_BOARD" }),
///     &shared,
/// );
/// assert!(matches!(outcome, Outcome::Reply(_)));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct CanvasResponder;

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl CanvasResponder {
    /// Applies a pixel change, and returns the notification for all clients.
    ///
    /// This is shared with the HTTP API, so changes made through either way
    /// reach clients in the same shape.
    pub fn change_pixel(
        canvas: &Shared<Canvas>, pixel: Pixel,
    ) -> Result<Value> {
        let message = changed(&pixel);
        universe::write(canvas).update_atom(pixel)?;
        Ok(message)
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Responder for CanvasResponder {
    type Universe = Canvas;

    fn respond(&self, request: Value, universe: &Shared<Canvas>) -> Outcome {
        match request["title"].as_str() {
            Some(RETRIEVE_BOARD) => {
                Outcome::Reply(universe::read(universe).as_json())
            }
            Some(PIXEL_CHANGED) => {
                let Some(pixel) = Pixel::from_json(&request["pixel_changed"])
                else {
                    tracing::debug!("Ignoring invalid pixel change");
                    return Outcome::Ignore;
                };
                match Self::change_pixel(universe, pixel) {
                    Ok(message) => Outcome::Broadcast(message),
                    Err(_) => Outcome::Ignore,
                }
            }
            _ => Outcome::Ignore,
        }
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Returns the notification for a changed pixel.
#[must_use]
pub fn changed(pixel: &Pixel) -> Value {
    json!({ "title": PIXEL_CHANGED, "pixel_changed": pixel.to_json() })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use canvas_serve::universe::share;

    use crate::canvas::Color;

    use super::*;

    fn change(id: usize, r: u8) -> Value {
        json!({
            "title": PIXEL_CHANGED,
            "pixel_changed": { "id": id, "color": { "r": r, "g": 0, "b": 0 } }
        })
    }

    #[test]
    fn test_retrieve_board() {
        let shared = share(Canvas::new(2, 1, 3));
        let request = json!({ "title": RETRIEVE_BOARD });
        let outcome = CanvasResponder.respond(request, &shared);
        let Outcome::Reply(board) = outcome else {
            panic!("expected reply, got {outcome:?}");
        };
        assert_eq!(board["title"], "REPLY_ENTIRE_BOARD");
        assert_eq!(board["pixelSize"], 3);
        assert_eq!(board["pixels"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_pixel_changed_broadcasts() {
        let shared = share(Canvas::new(2, 2, 1));
        let outcome = CanvasResponder.respond(change(3, 200), &shared);
        assert_eq!(outcome, Outcome::Broadcast(change(3, 200)));

        // Canvas is updated
        let canvas = universe::read(&shared);
        let color = canvas.pixel(3).map(|pixel| pixel.color);
        assert_eq!(color, Some(Color::new(200, 0, 0)));
    }

    #[test]
    fn test_pixel_changed_normalizes_broadcast() {
        let shared = share(Canvas::new(2, 2, 1));
        let mut request = change(1, 7);
        request["pixel_changed"]["color"]["a"] = json!(255);
        request["sender"] = json!("someone");
        let outcome = CanvasResponder.respond(request, &shared);
        assert_eq!(outcome, Outcome::Broadcast(change(1, 7)));
    }

    #[test]
    fn test_pixel_changed_out_of_bounds() {
        let shared = share(Canvas::new(2, 2, 1));
        let outcome = CanvasResponder.respond(change(4, 1), &shared);
        assert_eq!(outcome, Outcome::Ignore);
        assert_eq!(universe::read(&shared).generation(), 0);
    }

    #[test]
    fn test_ignores_invalid_requests() {
        let shared = share(Canvas::new(1, 1, 1));
        for request in [
            json!({ "title": PIXEL_CHANGED, "pixel_changed": { "id": 0 } }),
            json!({ "title": "CLEAR_BOARD" }),
            json!({ "pixel_changed": { "id": 0 } }),
            json!("RETRIEVE_BOARD"),
            json!(null),
        ] {
            let outcome = CanvasResponder.respond(request, &shared);
            assert_eq!(outcome, Outcome::Ignore);
        }
    }
}

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

//! Middleware for the HTTP API.

use canvas_serve::handler::Handler;
use canvas_serve::http::response::ResponseExt;
use canvas_serve::http::{Header, Method, Request, Response, Status};
use canvas_serve::middleware::Middleware;
use canvas_serve::server::Command;
use canvas_serve::universe::{self, Shared};
use crossbeam::channel::Sender;
use serde_json::Value;

use crate::canvas::{Canvas, Pixel};
use crate::responder::CanvasResponder;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Middleware for the HTTP API.
///
/// - `GET /api/canvas` returns the board, like `RETRIEVE_BOARD` does.
/// - `POST /api/pixel` changes a pixel, like `PIXEL_CHANGED` does, and
///   notifies all WebSocket clients through the command channel.
///
/// Since the middleware runs inside the server's event loop, and commands
/// are processed at the end of every poll, notifications go out without the
/// need to wake the server.
#[derive(Debug)]
pub struct Api {
    /// Canvas shared with WebSocket clients.
    canvas: Shared<Canvas>,
    /// Command sender.
    sender: Sender<Command>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Api {
    /// Creates the API middleware.
    #[must_use]
    pub fn new(canvas: Shared<Canvas>, sender: Sender<Command>) -> Self {
        Self { canvas, sender }
    }

    /// Returns the board.
    fn board(&self) -> Response {
        let canvas = universe::read(&self.canvas);
        let modified = httpdate::fmt_http_date(canvas.modified());
        Response::from_json(&canvas.to_json())
            .header(Header::CacheControl, "no-cache")
            .header(Header::LastModified, modified)
    }

    /// Changes a pixel, and notifies all clients.
    fn pixel(&self, body: &[u8]) -> Response {
        let pixel = serde_json::from_slice::<Value>(body)
            .ok()
            .as_ref()
            .and_then(Pixel::from_json);
        let Some(pixel) = pixel else {
            return Response::from_status(Status::BadRequest);
        };

        // Apply change, and hand notification over to the server
        match CanvasResponder::change_pixel(&self.canvas, pixel) {
            Ok(message) => {
                let command = Command::Broadcast(message.to_string());
                if self.sender.send(command).is_err() {
                    tracing::warn!("Command channel closed");
                }
                Response::from_status(Status::NoContent)
            }
            Err(err) => {
                tracing::debug!("Rejecting pixel change: {err}");
                Response::from_status(Status::UnprocessableEntity)
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Middleware for Api {
    /// Processes the given request.
    fn process(&self, req: Request, next: &dyn Handler) -> Response {
        match (&*req.uri.path, req.method) {
            ("/api/canvas", Method::Get) => self.board(),
            ("/api/pixel", Method::Post) => self.pixel(&req.body),
            ("/api/canvas", _) => not_allowed(Method::Get),
            ("/api/pixel", _) => not_allowed(Method::Post),
            _ => next.handle(req),
        }
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Returns "405 Method Not Allowed" with the allowed method.
fn not_allowed(method: Method) -> Response {
    Response::from_status(Status::MethodNotAllowed)
        .header(Header::Allow, method)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use canvas_serve::handler::NotFound;
    use canvas_serve::universe::share;
    use crossbeam::channel::{Receiver, unbounded};
    use serde_json::json;

    use super::*;

    fn api(width: usize) -> (Api, Receiver<Command>) {
        let (sender, receiver) = unbounded();
        let canvas = share(Canvas::new(width, 1, 1));
        (Api::new(canvas, sender), receiver)
    }

    fn post(body: &'static str) -> Request<'static> {
        Request::new().method(Method::Post).uri("/api/pixel").body(body)
    }

    #[test]
    fn test_get_canvas() {
        let (api, _receiver) = api(2);
        let req = Request::new().uri("/api/canvas");
        let res = api.process(req, &NotFound);
        assert_eq!(res.status, Status::Ok);
        assert!(res.headers.contains(Header::LastModified));

        let board: Value = serde_json::from_slice(&res.body).unwrap();
        assert_eq!(board["title"], "REPLY_ENTIRE_BOARD");
        assert_eq!(board["width"], 2);
    }

    #[test]
    fn test_post_pixel_broadcasts() {
        let (api, receiver) = api(2);
        let req = post(r#"{"id":1,"color":{"r":1,"g":2,"b":3}}"#);
        let res = api.process(req, &NotFound);
        assert_eq!(res.status, Status::NoContent);

        let Ok(Command::Broadcast(text)) = receiver.try_recv() else {
            panic!("expected broadcast");
        };
        let message: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(message["title"], "PIXEL_CHANGED");
        let color = &message["pixel_changed"]["color"];
        assert_eq!(color, &json!({ "r": 1, "g": 2, "b": 3 }));
        assert_eq!(universe::read(&api.canvas).generation(), 1);
    }

    #[test]
    fn test_post_pixel_rejects_invalid() {
        let (api, receiver) = api(2);
        for body in ["", "not json", r#"{"id":0}"#] {
            let res = api.process(post(body), &NotFound);
            assert_eq!(res.status, Status::BadRequest);
        }
        assert!(receiver.is_empty());
    }

    #[test]
    fn test_post_pixel_out_of_bounds() {
        let (api, receiver) = api(2);
        let req = post(r#"{"id":2,"color":{"r":1,"g":2,"b":3}}"#);
        let res = api.process(req, &NotFound);
        assert_eq!(res.status, Status::UnprocessableEntity);
        assert!(receiver.is_empty());
    }

    #[test]
    fn test_method_not_allowed() {
        let (api, _receiver) = api(1);
        let req = Request::new().method(Method::Delete).uri("/api/canvas");
        let res = api.process(req, &NotFound);
        assert_eq!(res.status, Status::MethodNotAllowed);
        assert_eq!(res.headers.get(Header::Allow), Some("GET"));

        let req = Request::new().uri("/api/pixel");
        let res = api.process(req, &NotFound);
        assert_eq!(res.headers.get(Header::Allow), Some("POST"));
    }

    #[test]
    fn test_passes_other_paths() {
        let (api, _receiver) = api(1);
        let req = Request::new().uri("/api/unknown");
        let res = api.process(req, &NotFound);
        assert_eq!(res.status, Status::NotFound);
    }
}

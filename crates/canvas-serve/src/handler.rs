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

//! Handler.

use super::http::response::ResponseExt;
use super::http::{Request, Response, Status};

mod convert;
mod error;
pub mod stack;

pub use convert::TryIntoHandler;
pub use error::{Error, Result};
pub use stack::Stack;

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Handler.
///
/// A handler is the end of a request processing chain: it always answers a
/// [`Request`] with a [`Response`], and has no next handler to defer to. The
/// server holds exactly one handler, which is usually a [`Stack`] of
/// middlewares falling through to [`NotFound`].
pub trait Handler {
    /// Handles the given request.
    ///
    /// This method must be infallible and should not panic. Errors are to be
    /// translated into responses with an appropriate status code.
    ///
    /// # Examples
    ///
    /// ```
    /// use canvas_serve::handler::Handler;
    /// use canvas_serve::http::response::ResponseExt;
    /// use canvas_serve::http::{Request, Response, Status};
    ///
    /// // Define handler
    /// struct Health;
    ///
    /// // Create handler implementation
    /// impl Handler for Health {
    ///     fn handle(&self, req: Request) -> Response {
    ///         if req.uri.path == "/health" {
    ///             Response::from_text("ok")
    ///         } else {
    ///             Response::from_status(Status::NotFound)
    ///         }
    ///     }
    /// }
    ///
    /// // Handle request with handler
    /// let res = Health.handle(Request::new().uri("/health"));
    /// assert_eq!(res.status, Status::Ok);
    /// ```
    fn handle(&self, req: Request) -> Response;
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Fallback handler.
///
/// This handler always returns "404 Not Found", and is what every [`Stack`]
/// falls through to when none of its middlewares answered the request.
pub struct NotFound;

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Handler for NotFound {
    /// Handles the given request.
    ///
    /// # Examples
    ///
    /// ```
    /// use canvas_serve::handler::{Handler, NotFound};
    /// use canvas_serve::http::{Request, Status};
    ///
    /// // Handle request with handler
    /// let res = NotFound.handle(Request::new());
    /// assert_eq!(res.status, Status::NotFound);
    /// ```
    #[inline]
    fn handle(&self, _req: Request) -> Response {
        Response::from_status(Status::NotFound)
    }
}

// ----------------------------------------------------------------------------
// Blanket implementations
// ----------------------------------------------------------------------------

impl<F, R> Handler for F
where
    F: Fn(Request) -> R,
    R: Into<Response>,
{
    #[inline]
    fn handle(&self, req: Request) -> Response {
        self(req).into()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_closure_handler() {
        let handler = |req: Request| -> std::result::Result<Response, io::Error> {
            if req.body.is_empty() {
                Err(io::Error::other("empty body"))
            } else {
                Ok(Response::from_text("stored"))
            }
        };
        let res = handler.handle(Request::new().body("x"));
        assert_eq!(res.status, Status::Ok);
        let res = handler.handle(Request::new());
        assert_eq!(res.status, Status::InternalServerError);
    }
}

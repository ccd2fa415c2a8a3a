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

//! Middleware.

use std::fmt;

use super::handler::Handler;
use super::http::{Request, Response};

mod convert;
mod websocket;

pub use convert::TryIntoMiddleware;
pub use websocket::WebSocketHandshake;

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Middleware.
///
/// Middlewares are the layers of a request processing pipeline. Each one can
/// answer a [`Request`] directly, or pass it on to the next [`Handler`], which
/// is either the next middleware or the end of the pipeline. Besides the types
/// implementing it explicitly, closures matching the signature of
/// [`Middleware::process`] are middlewares as well.
pub trait Middleware: 'static {
    /// Processes the given request.
    ///
    /// Request processing is infallible, so errors must be answered with a
    /// suitable response, e.g., "400 Bad Request".
    ///
    /// # Examples
    ///
    /// ```
    /// use canvas_serve::handler::{Handler, NotFound};
    /// use canvas_serve::http::response::ResponseExt;
    /// use canvas_serve::http::{Method, Request, Response, Status};
    /// use canvas_serve::middleware::Middleware;
    ///
    /// // Define middleware
    /// struct ReadOnly;
    ///
    /// // Create middleware implementation
    /// impl Middleware for ReadOnly {
    ///     fn process(&self, req: Request, next: &dyn Handler) -> Response {
    ///         if req.method == Method::Get {
    ///             next.handle(req)
    ///         } else {
    ///             Response::from_status(Status::MethodNotAllowed)
    ///         }
    ///     }
    /// }
    ///
    /// // Handle request with middleware
    /// let req = Request::new().method(Method::Post);
    /// let res = ReadOnly.process(req, &NotFound);
    /// assert_eq!(res.status, Status::MethodNotAllowed);
    /// ```
    fn process(&self, req: Request, next: &dyn Handler) -> Response;
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl fmt::Debug for Box<dyn Middleware> {
    /// Formats the middleware for debugging.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Box<dyn Middleware>")
    }
}

// ----------------------------------------------------------------------------
// Blanket implementations
// ----------------------------------------------------------------------------

impl<F, R> Middleware for F
where
    F: Fn(Request, &dyn Handler) -> R + 'static,
    R: Into<Response>,
{
    #[inline]
    fn process(&self, req: Request, next: &dyn Handler) -> Response {
        self(req, next).into()
    }
}

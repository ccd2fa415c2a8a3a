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

//! Stack.

use crate::handler::{Handler, NotFound};
use crate::http::{Request, Response};
use crate::middleware::Middleware;

mod builder;

pub use builder::Builder;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Stack.
///
/// A stack passes each request through its middlewares in the order they were
/// added. Every middleware can answer the request itself, or hand it to the
/// next one and inspect or modify the response on the way back. When the last
/// middleware defers, the request ends at the next handler, which is
/// [`NotFound`] when the stack is used as the server's handler.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use canvas_serve::handler::{Handler, Stack, TryIntoHandler};
/// use canvas_serve::http::response::ResponseExt;
/// use canvas_serve::http::{Request, Response, Status};
///
/// // Create stack with middleware
/// let stack = Stack::new()
///     .with(|req: Request, next: &dyn Handler| {
///         if req.uri.path == "/health" {
///             Response::from_text("ok")
///         } else {
///             next.handle(req)
///         }
///     })
///     .try_into_handler()?;
///
/// // Handle requests with stack
/// let res = stack.handle(Request::new().uri("/health"));
/// assert_eq!(res.status, Status::Ok);
/// let res = stack.handle(Request::new().uri("/missing"));
/// assert_eq!(res.status, Status::NotFound);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Stack {
    /// Middlewares.
    middlewares: Vec<Box<dyn Middleware>>,
}

/// Stack handler.
///
/// Remembers which middlewares are still to be invoked, and which handler to
/// fall through to once they are exhausted.
struct StackHandler<'a> {
    /// Remaining middlewares.
    middlewares: &'a [Box<dyn Middleware>],
    /// Next handler.
    next: &'a dyn Handler,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Stack {
    /// Creates a stack builder.
    #[allow(clippy::new_ret_no_self)]
    #[must_use]
    pub fn new() -> Builder {
        Builder::new()
    }

    /// Returns the number of middlewares.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns whether the stack has no middlewares.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Middleware for Stack {
    /// Processes the given request, passing it through all middlewares before
    /// deferring to the given handler.
    fn process(&self, req: Request, next: &dyn Handler) -> Response {
        let handler = StackHandler {
            middlewares: &self.middlewares,
            next,
        };
        handler.handle(req)
    }
}

impl Handler for Stack {
    /// Handles the given request, falling through to [`NotFound`].
    #[inline]
    fn handle(&self, req: Request) -> Response {
        self.process(req, &NotFound)
    }
}

impl Handler for StackHandler<'_> {
    /// Invokes the first remaining middleware with a handler for the rest,
    /// or the next handler if no middleware is left.
    fn handle(&self, req: Request) -> Response {
        match self.middlewares {
            [] => self.next.handle(req),
            [middleware, middlewares @ ..] => {
                let next = StackHandler { middlewares, next: self.next };
                middleware.process(req, &next)
            }
        }
    }
}

impl FromIterator<Box<dyn Middleware>> for Stack {
    /// Creates a stack from an iterator.
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Box<dyn Middleware>>,
    {
        Self { middlewares: Vec::from_iter(iter) }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::handler::TryIntoHandler;
    use crate::http::{Header, Status};

    use super::*;

    #[test]
    fn test_middlewares_run_in_order() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let record = |name: &'static str| {
            let trace = Arc::clone(&trace);
            move |req: Request, next: &dyn Handler| {
                trace.lock().unwrap().push(name);
                next.handle(req)
            }
        };

        // Create stack with three recording middlewares
        let stack = Stack::new()
            .with(record("a"))
            .with(record("b"))
            .with(record("c"))
            .try_into_handler()
            .unwrap();
        assert_eq!(stack.len(), 3);

        // All middlewares defer, so the request ends up as 404
        let res = stack.handle(Request::new());
        assert_eq!(res.status, Status::NotFound);
        assert_eq!(*trace.lock().unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn test_middleware_can_modify_response() {
        let stack = Stack::new()
            .with(|req: Request, next: &dyn Handler| {
                next.handle(req).header(Header::CacheControl, "no-cache")
            })
            .try_into_handler()
            .unwrap();

        // Response from fallback is decorated on the way back
        let res = stack.handle(Request::new());
        assert_eq!(res.headers.get(Header::CacheControl), Some("no-cache"));
    }

    #[test]
    fn test_nested_stacks() {
        let inner = Stack::new().with(|_: Request, _: &dyn Handler| {
            Response::new().status(Status::NoContent)
        });
        let stack = Stack::new().with(inner).try_into_handler().unwrap();
        let res = stack.handle(Request::new());
        assert_eq!(res.status, Status::NoContent);
    }
}

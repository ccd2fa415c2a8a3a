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

//! Stack builder.

use crate::handler::{Result, TryIntoHandler};
use crate::middleware::{Middleware, TryIntoMiddleware};

use super::Stack;

// ----------------------------------------------------------------------------
// Type aliases
// ----------------------------------------------------------------------------

/// Deferred middleware conversion.
type Factory = Box<dyn FnOnce() -> Result<Box<dyn Middleware>>>;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Stack builder.
///
/// Middlewares are converted only when the stack is built, so that all
/// fallible conversions surface as a single [`Result`].
pub struct Builder {
    /// Middleware factories.
    middlewares: Vec<Factory>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Builder {
    /// Creates a stack builder.
    ///
    /// Note that the canonical way to create a [`Stack`] is [`Stack::new`].
    #[allow(clippy::new_without_default)]
    #[must_use]
    pub fn new() -> Self {
        Self { middlewares: Vec::new() }
    }

    /// Extends the stack with the given middleware.
    #[inline]
    #[must_use]
    pub fn with<T>(mut self, middleware: T) -> Self
    where
        T: TryIntoMiddleware,
    {
        self.add(middleware);
        self
    }

    /// Adds a middleware to the stack.
    pub fn add<T>(&mut self, middleware: T)
    where
        T: TryIntoMiddleware,
    {
        self.middlewares.push(Box::new(|| {
            middleware
                .try_into_middleware()
                .map(|middleware| Box::new(middleware) as Box<dyn Middleware>)
        }));
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl TryIntoMiddleware for Builder {
    type Output = Stack;

    /// Attempts to convert all middlewares, and creates the stack.
    ///
    /// # Errors
    ///
    /// The first error of any middleware conversion is returned.
    fn try_into_middleware(self) -> Result<Self::Output> {
        let iter = self.middlewares.into_iter().map(|factory| factory());
        iter.collect()
    }
}

impl TryIntoHandler for Builder {
    type Output = Stack;

    /// Attempts to convert the stack into a handler.
    ///
    /// # Errors
    ///
    /// The first error of any middleware conversion is returned.
    #[inline]
    fn try_into_handler(self) -> Result<Self::Output> {
        self.try_into_middleware()
    }
}

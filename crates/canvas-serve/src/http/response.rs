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

//! HTTP response.

use std::error::Error as StdError;
use std::fmt;

use super::component::{Header, Headers, Status};

mod error;
mod ext;

pub use error::{Error, Result};
pub use ext::ResponseExt;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP response.
///
/// Responses are built by chaining [`Response::status`], [`Response::header`]
/// and [`Response::body`], or with one of the constructors of [`ResponseExt`],
/// which also set `Content-Type` and `Content-Length`.
///
/// # Examples
///
/// ```
/// use canvas_serve::http::{Header, Response, Status};
///
/// // Create response
/// let res = Response::new()
///     .status(Status::NoContent)
///     .header(Header::CacheControl, "no-cache");
/// assert!(res.body.is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct Response {
    /// Status, `200 OK` unless set.
    pub status: Status,
    /// Headers, in the order they are sent.
    pub headers: Headers<'static>,
    /// Body.
    pub body: Vec<u8>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Response {
    /// Creates an empty `200 OK` response.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status.
    #[inline]
    #[must_use]
    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Sets a header, replacing any previous value.
    #[allow(clippy::needless_pass_by_value)]
    #[inline]
    #[must_use]
    pub fn header<V>(mut self, header: Header, value: V) -> Self
    where
        V: ToString,
    {
        self.headers.insert(header, value.to_string());
        self
    }

    /// Sets the body, leaving `Content-Length` untouched.
    #[inline]
    #[must_use]
    pub fn body<B>(mut self, body: B) -> Self
    where
        B: Into<Vec<u8>>,
    {
        self.body = body.into();
        self
    }

    /// Serializes the response into the bytes sent over the wire.
    ///
    /// # Examples
    ///
    /// ```
    /// use canvas_serve::http::response::ResponseExt;
    /// use canvas_serve::http::{Response, Status};
    ///
    /// // Serialize response
    /// let bytes = Response::from_status(Status::NotFound).into_bytes();
    /// assert!(bytes.starts_with(b"HTTP/1.1 404 Not Found\r\n"));
    /// assert!(bytes.ends_with(b"\r\n\r\nNot Found"));
    /// ```
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        let head = format!("HTTP/1.1 {}\r\n{}\r\n", self.status, self.headers);
        let mut bytes = head.into_bytes();
        bytes.reserve_exact(self.body.len());
        bytes.extend(self.body);
        bytes
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<E> From<std::result::Result<Response, E>> for Response
where
    E: StdError,
{
    /// Unwraps a handler result, answering errors with "500 Internal Server
    /// Error" after logging them.
    ///
    /// # Examples
    ///
    /// ```
    /// use canvas_serve::http::{Response, Status};
    /// use std::io;
    ///
    /// // Create response from error
    /// let err = io::Error::other("snapshot directory vanished");
    /// let res = Response::from(Err(err));
    /// assert_eq!(res.status, Status::InternalServerError);
    /// ```
    fn from(result: std::result::Result<Response, E>) -> Self {
        result.unwrap_or_else(|err| {
            tracing::error!("Handler failed: {err}");
            Response::from_status(Status::InternalServerError)
        })
    }
}

impl Default for Response {
    #[inline]
    fn default() -> Self {
        Self {
            status: Status::Ok,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }
}

impl fmt::Display for Response {
    /// Formats the head of the response, and the size of the body.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "HTTP/1.1 {}\r\n{}", self.status, self.headers)?;
        write!(f, "\r\n[{} bytes]", self.body.len())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_bytes_keeps_header_order() {
        let res = Response::new()
            .header(Header::ContentType, "text/plain")
            .header(Header::ContentLength, 2)
            .body("OK");
        assert_eq!(
            res.into_bytes(),
            b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\
              Content-Length: 2\r\n\r\nOK"
        );
    }

    #[test]
    fn test_empty_response() {
        let bytes = Response::new().into_bytes();
        assert_eq!(bytes, b"HTTP/1.1 200 OK\r\n\r\n");
    }
}

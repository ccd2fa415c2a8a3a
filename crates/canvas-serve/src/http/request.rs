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

//! HTTP request.

use std::borrow::Cow;
use std::fmt;
use std::path::{Component, Path};
use std::str::{self, FromStr};

use super::component::{Header, Headers, Method, Status};

mod error;
mod uri;

pub use error::{Error, Result};
pub use uri::Uri;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Maximum size of a request, including head and body.
pub const MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

/// Maximum length of the request target.
const MAX_PATH_LENGTH: usize = 2 * 1024;

/// Maximum length of a single header value.
const MAX_HEADER_VALUE_LENGTH: usize = 4 * 1024;

/// Maximum number of headers.
const MAX_HEADERS: usize = 64;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP request.
///
/// Requests are usually obtained through [`Request::from_bytes`], and borrow
/// from the connection's read buffer. The builder methods exist for tests and
/// for middlewares that need to rewrite a request before passing it on.
///
/// # Examples
///
/// ```
/// use canvas_serve::http::{Method, Request};
///
/// // Create request
/// let req = Request::new()
///     .method(Method::Post)
///     .uri("/api/pixel")
///     .body(r#"{"id":0,"color":{"r":255,"g":0,"b":0}}"#);
/// ```
#[derive(Clone, Debug)]
pub struct Request<'a> {
    /// Request method.
    pub method: Method,
    /// Request URI.
    pub uri: Uri<'a>,
    /// Request headers.
    pub headers: Headers<'a>,
    /// Request body.
    pub body: Cow<'a, [u8]>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<'a> Request<'a> {
    /// Creates a request.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a request from the given bytes.
    ///
    /// The head is parsed with [`httparse`]. If the head announces a body with
    /// `Content-Length`, the request is only considered complete once all of
    /// the body has arrived, and the body is cut to exactly that length. Size
    /// limits and path traversal checks are applied before handing the request
    /// to any handler.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Incomplete`] if more data is needed,
    /// [`Error::Parser`] for malformed input, [`Error::Component`] for unknown
    /// methods, and [`Error::Validation`] with the status to answer with when
    /// a limit is exceeded.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use canvas_serve::http::{Method, Request};
    ///
    /// // Create request from bytes
    /// let req = Request::from_bytes(b"GET /api/canvas HTTP/1.1\r\n\r\n")?;
    /// assert_eq!(req.method, Method::Get);
    /// assert_eq!(req.uri.path, "/api/canvas");
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self> {
        Self::parse(bytes).map(|(req, _)| req)
    }

    /// Creates a request from the given bytes, and returns it together with
    /// the number of bytes it occupies.
    ///
    /// Bytes after the request belong to whatever the client sent next, i.e.,
    /// a pipelined request, or WebSocket frames following an upgrade.
    ///
    /// # Errors
    ///
    /// This method returns the same errors as [`Request::from_bytes`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use canvas_serve::http::Request;
    ///
    /// // Create request from pipelined bytes
    /// let bytes = b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n";
    /// let (req, n) = Request::parse(bytes)?;
    /// assert_eq!(req.uri.path, "/a");
    /// assert_eq!(&bytes[n..], b"GET /b HTTP/1.1\r\n\r\n");
    /// # Ok(())
    /// # }
    /// ```
    pub fn parse(bytes: &'a [u8]) -> Result<(Self, usize)> {
        if bytes.len() > MAX_REQUEST_SIZE {
            return Err(Error::Validation(Status::PayloadTooLarge));
        }

        // Parse request head into a fixed number of header slots
        let mut slots = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut slots);
        let httparse::Status::Complete(n) = req.parse(bytes)? else {
            return Err(Error::Incomplete);
        };

        // A complete parse always yields method and path
        let (Some(method), Some(path)) = (req.method, req.path) else {
            return Err(Error::Validation(Status::BadRequest));
        };
        let method = Method::from_str(method)?;
        if path.len() > MAX_PATH_LENGTH {
            return Err(Error::Validation(Status::UriTooLong));
        }

        // Proxy requests are not supported, and neither are paths that try to
        // escape the root via parent directory components
        let uri = Uri::from(path);
        if !uri.path.starts_with('/') {
            return Err(Error::Validation(Status::BadRequest));
        }
        if uri.path.contains("..") {
            let mut iter = Path::new(uri.path.as_ref()).components();
            if iter.any(|component| component == Component::ParentDir) {
                return Err(Error::Validation(Status::BadRequest));
            }
        }

        // Collect known headers, skipping unknown ones and values that aren't
        // valid UTF-8, but rejecting oversized values
        let mut headers = Headers::new();
        for header in req.headers.iter() {
            if header.value.len() > MAX_HEADER_VALUE_LENGTH {
                let status = Status::RequestHeaderFieldsTooLarge;
                return Err(Error::Validation(status));
            }
            let Ok(name) = Header::from_str(header.name) else {
                continue;
            };
            if let Ok(value) = str::from_utf8(header.value) {
                headers.insert(name, value);
            }
        }

        // Reject announced bodies that can never fit, or wait for the rest
        let len = match headers.get(Header::ContentLength) {
            None => 0,
            Some(value) => {
                let Ok(len) = value.trim().parse::<usize>() else {
                    return Err(Error::Validation(Status::BadRequest));
                };
                len
            }
        };
        if len > MAX_REQUEST_SIZE - n {
            return Err(Error::Validation(Status::PayloadTooLarge));
        }
        if bytes.len() < n + len {
            return Err(Error::Incomplete);
        }

        // Return request and the number of bytes it occupies
        let req = Request {
            method,
            uri,
            headers,
            body: Cow::Borrowed(&bytes[n..n + len]),
        };
        Ok((req, n + len))
    }

    /// Returns whether the client asked to close the connection after the
    /// response was sent.
    #[must_use]
    pub fn wants_close(&self) -> bool {
        self.headers.has_token(Header::Connection, "close")
    }
}

impl<'a> Request<'a> {
    /// Sets the method of the request.
    #[inline]
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the URI of the request.
    #[inline]
    #[must_use]
    pub fn uri<U>(mut self, uri: U) -> Self
    where
        U: Into<Uri<'a>>,
    {
        self.uri = uri.into();
        self
    }

    /// Adds a header to the request.
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

    /// Sets the body of the request.
    #[inline]
    #[must_use]
    pub fn body<B>(mut self, body: B) -> Self
    where
        B: Into<Vec<u8>>,
    {
        self.body = Cow::Owned(body.into());
        self
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Default for Request<'_> {
    /// Creates a default request, i.e., `GET /`.
    #[inline]
    fn default() -> Self {
        Self {
            method: Method::Get,
            uri: Uri::from("/"),
            headers: Headers::default(),
            body: Cow::Borrowed(&[]),
        }
    }
}

impl fmt::Display for Request<'_> {
    /// Formats the request for display.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} HTTP/1.1\r\n", self.method, self.uri)?;
        write!(f, "{}\r\n", self.headers)?;
        write!(f, "[Body: {} bytes]\r\n", self.body.len())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(bytes: &[u8]) -> Option<Status> {
        match Request::from_bytes(bytes) {
            Err(Error::Validation(status)) => Some(status),
            _ => None,
        }
    }

    #[test]
    fn test_partial_head_is_incomplete() {
        let res = Request::from_bytes(b"GET / HTTP/1.1\r\nHost: local");
        assert!(matches!(res, Err(Error::Incomplete)));
    }

    #[test]
    fn test_body_waits_for_content_length() {
        let bytes = b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\n12345";
        assert!(matches!(Request::from_bytes(bytes), Err(Error::Incomplete)));

        let bytes = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\n12345xyz";
        let req = Request::from_bytes(bytes).unwrap();
        assert_eq!(req.body.as_ref(), b"12345");
    }

    #[test]
    fn test_rejects_oversized_content_length() {
        let bytes = format!(
            "POST / HTTP/1.1\r\nContent-Length: {}\r\n\r\n{{}}",
            MAX_REQUEST_SIZE
        );
        let status = status_of(bytes.as_bytes());
        assert_eq!(status, Some(Status::PayloadTooLarge));

        let bytes = b"POST / HTTP/1.1\r\nContent-Length: 100000000\r\n\r\n";
        assert_eq!(status_of(bytes), Some(Status::PayloadTooLarge));
    }

    #[test]
    fn test_parse_leaves_pipelined_bytes() {
        let bytes = b"POST /a HTTP/1.1\r\nContent-Length: 2\r\n\r\n{}GET /b";
        let (req, n) = Request::parse(bytes).unwrap();
        assert_eq!(req.body.as_ref(), b"{}");
        assert_eq!(&bytes[n..], b"GET /b");

        let bytes = b"GET / HTTP/1.1\r\n\r\n";
        let (_, n) = Request::parse(bytes).unwrap();
        assert_eq!(n, bytes.len());
    }

    #[test]
    fn test_invalid_content_length() {
        let bytes = b"POST / HTTP/1.1\r\nContent-Length: many\r\n\r\n";
        assert_eq!(status_of(bytes), Some(Status::BadRequest));
    }

    #[test]
    fn test_rejects_traversal() {
        let bytes = b"GET /a/../../etc/passwd HTTP/1.1\r\n\r\n";
        assert_eq!(status_of(bytes), Some(Status::BadRequest));
        let bytes = b"GET /a/%2e%2e/b HTTP/1.1\r\n\r\n";
        assert_eq!(status_of(bytes), Some(Status::BadRequest));
    }

    #[test]
    fn test_rejects_absolute_form() {
        let bytes = b"GET http://example.com/ HTTP/1.1\r\n\r\n";
        assert_eq!(status_of(bytes), Some(Status::BadRequest));
    }

    #[test]
    fn test_rejects_long_path() {
        let path = "/".repeat(MAX_PATH_LENGTH + 1);
        let bytes = format!("GET {path} HTTP/1.1\r\n\r\n");
        assert_eq!(status_of(bytes.as_bytes()), Some(Status::UriTooLong));
    }

    #[test]
    fn test_rejects_long_header_value() {
        let value = "a".repeat(MAX_HEADER_VALUE_LENGTH + 1);
        let bytes = format!("GET / HTTP/1.1\r\nUser-Agent: {value}\r\n\r\n");
        assert_eq!(
            status_of(bytes.as_bytes()),
            Some(Status::RequestHeaderFieldsTooLarge)
        );
    }

    #[test]
    fn test_skips_unknown_headers() {
        let bytes = b"GET / HTTP/1.1\r\nX-Custom: 1\r\nHost: canvas\r\n\r\n";
        let req = Request::from_bytes(bytes).unwrap();
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.headers.get(Header::Host), Some("canvas"));
    }

    #[test]
    fn test_unknown_method() {
        let res = Request::from_bytes(b"BREW /pot HTTP/1.1\r\n\r\n");
        assert!(matches!(res, Err(Error::Component(_))));
    }

    #[test]
    fn test_wants_close() {
        let bytes = b"GET / HTTP/1.1\r\nConnection: Close\r\n\r\n";
        assert!(Request::from_bytes(bytes).unwrap().wants_close());
        let bytes = b"GET / HTTP/1.1\r\n\r\n";
        assert!(!Request::from_bytes(bytes).unwrap().wants_close());
    }
}

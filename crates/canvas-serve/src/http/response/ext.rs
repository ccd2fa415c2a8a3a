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

//! HTTP response extensions.

use serde::Serialize;

use crate::http::{Header, Status};

use super::{Response, Result};

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Extension trait for [`Response`] providing convenient constructors.
pub trait ResponseExt: Sized {
    /// Creates a response from a status code, with the reason phrase as a
    /// plain text body. Status codes that must not carry a body, like
    /// "204 No Content" and "101 Switching Protocols", are sent without one.
    ///
    /// # Examples
    ///
    /// ```
    /// use canvas_serve::http::response::ResponseExt;
    /// use canvas_serve::http::{Header, Response, Status};
    ///
    /// // Create response from status
    /// let res = Response::from_status(Status::BadRequest);
    /// assert_eq!(res.body, b"Bad Request");
    ///
    /// // Create response without body
    /// let res = Response::from_status(Status::NoContent);
    /// assert!(res.body.is_empty());
    /// assert_eq!(res.headers.get(Header::ContentLength), None);
    /// ```
    #[must_use]
    fn from_status(status: Status) -> Response {
        let res = Response::new().status(status);
        if status.allows_body() {
            res.text(status.name())
        } else {
            res
        }
    }

    /// Creates a response from plain text.
    fn from_text<S>(content: S) -> Response
    where
        S: Into<String>,
    {
        Response::new().status(Status::Ok).text(content)
    }

    /// Creates a response from an HTML document.
    fn from_html<S>(content: S) -> Response
    where
        S: Into<String>,
    {
        let content = content.into();
        Response::new()
            .status(Status::Ok)
            .header(Header::ContentType, "text/html; charset=utf-8")
            .header(Header::ContentLength, content.len())
            .body(content)
    }

    /// Creates a response from a serializable value.
    ///
    /// Serialization failures are answered with "500 Internal Server Error",
    /// as they can only originate from a broken [`Serialize`] implementation.
    ///
    /// # Examples
    ///
    /// ```
    /// use canvas_serve::http::response::ResponseExt;
    /// use canvas_serve::http::{Header, Response, Status};
    /// use serde_json::json;
    ///
    /// // Create response from JSON value
    /// let res = Response::from_json(&json!({ "width": 2, "height": 2 }));
    /// assert_eq!(res.status, Status::Ok);
    /// assert_eq!(res.body, br#"{"width":2,"height":2}"#);
    /// assert_eq!(
    ///     res.headers.get(Header::ContentType),
    ///     Some("application/json")
    /// );
    /// ```
    fn from_json<T>(value: &T) -> Response
    where
        T: Serialize + ?Sized,
    {
        let res: Result<Response> =
            serde_json::to_vec(value).map_err(Into::into).map(|body| {
                Response::new()
                    .status(Status::Ok)
                    .header(Header::ContentType, "application/json")
                    .header(Header::ContentLength, body.len())
                    .body(body)
            });
        res.into()
    }

    /// Sets the given text as the body of the response.
    #[must_use]
    fn text<S>(self, content: S) -> Response
    where
        S: Into<String>;
}

// ----------------------------------------------------------------------------
// Blanket implementations
// ----------------------------------------------------------------------------

impl ResponseExt for Response {
    fn text<S>(self, content: S) -> Response
    where
        S: Into<String>,
    {
        let content = content.into();
        self.header(Header::ContentType, "text/plain; charset=utf-8")
            .header(Header::ContentLength, content.len())
            .body(content)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Serialize)]
    struct Size {
        width: u32,
        height: u32,
    }

    #[test]
    fn test_from_json_sets_length() {
        let res = Response::from_json(&Size { width: 3, height: 1 });
        assert_eq!(res.body, br#"{"width":3,"height":1}"#);
        assert_eq!(res.headers.get(Header::ContentLength), Some("22"));
    }

    #[test]
    fn test_from_json_falls_back_to_500() {
        let mut map = BTreeMap::new();
        map.insert((1, 2), "tuple keys are not valid JSON keys");
        let res = Response::from_json(&map);
        assert_eq!(res.status, Status::InternalServerError);
    }

    #[test]
    fn test_from_status_sets_reason_as_body() {
        let res = Response::from_status(Status::MethodNotAllowed);
        assert_eq!(res.body, b"Method Not Allowed");
        assert_eq!(res.headers.get(Header::ContentLength), Some("18"));
    }
}

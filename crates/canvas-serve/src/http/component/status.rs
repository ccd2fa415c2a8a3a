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

//! HTTP status.

use std::fmt;

// ----------------------------------------------------------------------------
// Macros
// ----------------------------------------------------------------------------

/// Defines the status codes the server answers with, and their reasons.
macro_rules! define_status {
    (
        $(
            $(#[$comment:meta])*
            $name:ident = $code:literal, $reason:literal
        ),+
        $(,)?
    ) => {
        /// HTTP status.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum Status {
            $(
                $(#[$comment])*
                $name = $code,
            )+
        }

        impl Status {
            /// Returns the reason phrase.
            ///
            /// # Examples
            ///
            /// ```
            /// use canvas_serve::http::Status;
            ///
            /// // Obtain reason phrase
            /// assert_eq!(Status::NoContent.name(), "No Content");
            /// ```
            #[must_use]
            pub const fn name(&self) -> &'static str {
                match self {
                    $(
                        Status::$name => $reason,
                    )+
                }
            }
        }
    };
}

define_status! {
    /// Handshake accepted, the connection becomes a WebSocket
    SwitchingProtocols = 101, "Switching Protocols",
    /// Request answered with a body
    Ok = 200, "OK",
    /// Request applied, nothing to return
    NoContent = 204, "No Content",
    /// Malformed request or payload
    BadRequest = 400, "Bad Request",
    /// No middleware answered the request
    NotFound = 404, "Not Found",
    /// Path exists, but not for this method
    MethodNotAllowed = 405, "Method Not Allowed",
    /// Request exceeds the buffer limit
    PayloadTooLarge = 413, "Payload Too Large",
    /// Request target exceeds the length limit
    UriTooLong = 414, "URI Too Long",
    /// Well-formed payload that doesn't fit the canvas
    UnprocessableEntity = 422, "Unprocessable Entity",
    /// WebSocket version other than 13
    UpgradeRequired = 426, "Upgrade Required",
    /// Header value exceeds the length limit
    RequestHeaderFieldsTooLarge = 431, "Request Header Fields Too Large",
    /// Handler failed
    InternalServerError = 500, "Internal Server Error",
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Status {
    /// Returns the numeric status code.
    ///
    /// # Examples
    ///
    /// ```
    /// use canvas_serve::http::Status;
    ///
    /// // Obtain status code
    /// assert_eq!(Status::UpgradeRequired.code(), 426);
    /// ```
    #[must_use]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Returns whether a response with this status may carry a body.
    ///
    /// Informational responses and "204 No Content" must not have one, see
    /// RFC 9110, sections 15.2 and 15.3.5.
    #[must_use]
    pub const fn allows_body(&self) -> bool {
        !matches!(self, Status::SwitchingProtocols | Status::NoContent)
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl fmt::Display for Status {
    /// Formats the status as it appears in the status line.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.name())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        assert_eq!(Status::Ok.to_string(), "200 OK");
        assert_eq!(
            Status::UnprocessableEntity.to_string(),
            "422 Unprocessable Entity"
        );
    }

    #[test]
    fn test_allows_body() {
        assert!(!Status::SwitchingProtocols.allows_body());
        assert!(!Status::NoContent.allows_body());
        assert!(Status::NotFound.allows_body());
    }
}

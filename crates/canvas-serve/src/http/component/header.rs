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

//! HTTP header.

use std::fmt;
use std::str::FromStr;

use super::error::{Error, Result};

// ----------------------------------------------------------------------------
// Macros
// ----------------------------------------------------------------------------

/// Defines the set of known HTTP headers.
macro_rules! define_headers {
    (
        $(
            $(#[$comment:meta])*
            $name:ident = $value:literal
        ),+
        $(,)?
    ) => {
        /// HTTP header.
        ///
        /// Only headers that the server or one of its middlewares looks at are
        /// known. Requests are parsed leniently, so any other header is dropped
        /// while parsing, which keeps the header maps small and type-safe.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Header {
            $(
                $(#[$comment])*
                $name,
            )+
        }

        /// Header names in canonical spelling.
        const NAMES: &[(Header, &str)] = &[
            $(
                (Header::$name, $value),
            )+
        ];

        impl Header {
            /// Returns the canonical header name.
            ///
            /// # Examples
            ///
            /// ```
            /// use canvas_serve::http::Header;
            ///
            /// // Obtain header name
            /// assert_eq!(Header::ContentType.name(), "Content-Type");
            /// ```
            #[must_use]
            pub const fn name(&self) -> &'static str {
                match self {
                    $(
                        Header::$name => $value,
                    )+
                }
            }
        }
    };
}

define_headers! {
    /// Methods allowed on a path, sent with "405 Method Not Allowed"
    Allow = "Allow",
    /// Caching policy, set to `no-cache` for the page and the board
    CacheControl = "Cache-Control",
    /// Connection options, carrying `close` or `Upgrade`
    Connection = "Connection",
    /// Length of the body, required for requests with a body
    ContentLength = "Content-Length",
    /// Media type of the body
    ContentType = "Content-Type",
    /// Host the request is addressed to
    Host = "Host",
    /// Time the board was last changed
    LastModified = "Last-Modified",
    /// Origin of a page, logged on WebSocket handshakes
    Origin = "Origin",
    /// Protocol to switch to, which must be `websocket`
    Upgrade = "Upgrade",
    /// Client software, logged on WebSocket handshakes
    UserAgent = "User-Agent",
    /// Handshake proof, derived from the client's key
    SecWebSocketAccept = "Sec-WebSocket-Accept",
    /// Handshake key chosen by the client
    SecWebSocketKey = "Sec-WebSocket-Key",
    /// WebSocket protocol version, which must be 13
    SecWebSocketVersion = "Sec-WebSocket-Version",
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl FromStr for Header {
    type Err = Error;

    /// Attempts to create a header from a string, ignoring case.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Header`] for unknown headers.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use canvas_serve::http::Header;
    ///
    /// // Create header from string
    /// let header: Header = "sec-websocket-key".parse()?;
    /// assert_eq!(header, Header::SecWebSocketKey);
    /// # Ok(())
    /// # }
    /// ```
    fn from_str(value: &str) -> Result<Self> {
        for &(header, name) in NAMES {
            if name.eq_ignore_ascii_case(value) {
                return Ok(header);
            }
        }
        Err(Error::Header(value.to_string()))
    }
}

impl fmt::Display for Header {
    /// Formats the header for display.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ignores_case() {
        for value in ["sec-websocket-key", "SEC-WEBSOCKET-KEY"] {
            let header: Header = value.parse().unwrap();
            assert_eq!(header, Header::SecWebSocketKey, "Failed for: {value}");
        }
    }

    #[test]
    fn test_parse_unknown() {
        let err = "Cookie".parse::<Header>().unwrap_err();
        assert!(matches!(err, Error::Header(name) if name == "Cookie"));
    }

    #[test]
    fn test_names_round_trip() {
        for &(header, name) in NAMES {
            assert_eq!(header.name(), name);
            assert_eq!(name.parse::<Header>().unwrap(), header);
        }
    }
}

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

//! Middleware for WebSocket handshakes.

use base64::prelude::*;
use sha1_smol::Sha1;

use crate::handler::Handler;
use crate::http::response::ResponseExt;
use crate::http::{Header, Method, Request, Response, Status};

use super::Middleware;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// GUID appended to the client key, see RFC 6455, section 1.3.
const GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Middleware for WebSocket handshakes.
///
/// Requests that don't ask for a WebSocket upgrade are passed on untouched.
/// Upgrade requests are validated as required by RFC 6455, section 4.2, and
/// answered with "101 Switching Protocols", which tells the server to hand
/// the connection over to its WebSocket clients once the response is sent.
///
/// # Examples
///
/// ```
/// use canvas_serve::handler::{Handler, NotFound};
/// use canvas_serve::http::{Header, Method, Request, Status};
/// use canvas_serve::middleware::{Middleware, WebSocketHandshake};
///
/// // Create request
/// let req = Request::new()
///     .method(Method::Get)
///     .header(Header::Connection, "Upgrade")
///     .header(Header::Upgrade, "websocket")
///     .header(Header::SecWebSocketKey, "dGhlIHNhbXBsZSBub25jZQ==")
///     .header(Header::SecWebSocketVersion, "13");
///
/// // Handle request with middleware
/// let res = WebSocketHandshake.process(req, &NotFound);
/// assert_eq!(res.status, Status::SwitchingProtocols);
/// assert_eq!(
///     res.headers.get(Header::SecWebSocketAccept),
///     Some("s3pPLMBiTxaQ9kYGzzhZRbK+xOo=")
/// );
/// ```
#[derive(Debug, Default)]
pub struct WebSocketHandshake;

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Middleware for WebSocketHandshake {
    /// Processes the given request.
    fn process(&self, req: Request, next: &dyn Handler) -> Response {
        let is_upgrade = req
            .headers
            .get(Header::Upgrade)
            .is_some_and(|value| value.eq_ignore_ascii_case("websocket"));

        // Forward everything that isn't a WebSocket upgrade
        if !is_upgrade {
            return next.handle(req);
        }

        // 1. Upgrades are only allowed for GET
        if req.method != Method::Get {
            return Response::from_status(Status::MethodNotAllowed)
                .header(Header::Allow, Method::Get);
        }

        // 2. Connection header must contain the upgrade token
        if !req.headers.has_token(Header::Connection, "upgrade") {
            return Response::from_status(Status::BadRequest);
        }

        // 3. Only version 13 exists in the wild
        if req.headers.get(Header::SecWebSocketVersion) != Some("13") {
            return Response::from_status(Status::UpgradeRequired)
                .header(Header::Upgrade, "websocket")
                .header(Header::SecWebSocketVersion, 13);
        }

        // 4. Client key is mandatory
        let Some(key) = req.headers.get(Header::SecWebSocketKey) else {
            return Response::from_status(Status::BadRequest);
        };

        // Accept handshake
        tracing::debug!(
            "Accepting WebSocket upgrade on {} from {} ({})",
            req.uri,
            req.headers.get(Header::Origin).unwrap_or("unknown origin"),
            req.headers.get(Header::UserAgent).unwrap_or("unknown agent"),
        );
        Response::from_status(Status::SwitchingProtocols)
            .header(Header::Upgrade, "websocket")
            .header(Header::Connection, "Upgrade")
            .header(Header::SecWebSocketAccept, accept_key(key.trim()))
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Computes the accept key for the given client key, which is the Base64
/// encoded SHA-1 digest of the key followed by the protocol GUID.
fn accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(GUID);
    BASE64_STANDARD.encode(hasher.digest().bytes())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::handler::NotFound;

    use super::*;

    fn upgrade() -> Request<'static> {
        Request::new()
            .header(Header::Connection, "keep-alive, Upgrade")
            .header(Header::Upgrade, "WebSocket")
            .header(Header::SecWebSocketKey, "dGhlIHNhbXBsZSBub25jZQ==")
            .header(Header::SecWebSocketVersion, "13")
    }

    #[test]
    fn test_accept_key() {
        let key = accept_key("dGhlIHNhbXBsZSBub25jZQ==");
        assert_eq!(key, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn test_passes_plain_requests() {
        let res = WebSocketHandshake.process(Request::new(), &NotFound);
        assert_eq!(res.status, Status::NotFound);
    }

    #[test]
    fn test_accepts_upgrade() {
        let res = WebSocketHandshake.process(upgrade(), &NotFound);
        assert_eq!(res.status, Status::SwitchingProtocols);
        assert!(res.body.is_empty());
        assert_eq!(res.headers.get(Header::Upgrade), Some("websocket"));
    }

    #[test]
    fn test_rejects_wrong_method() {
        let req = upgrade().method(Method::Post);
        let res = WebSocketHandshake.process(req, &NotFound);
        assert_eq!(res.status, Status::MethodNotAllowed);
        assert_eq!(res.headers.get(Header::Allow), Some("GET"));
    }

    #[test]
    fn test_rejects_missing_connection_token() {
        let req = upgrade().header(Header::Connection, "keep-alive");
        let res = WebSocketHandshake.process(req, &NotFound);
        assert_eq!(res.status, Status::BadRequest);
    }

    #[test]
    fn test_rejects_wrong_version() {
        let req = upgrade().header(Header::SecWebSocketVersion, "8");
        let res = WebSocketHandshake.process(req, &NotFound);
        assert_eq!(res.status, Status::UpgradeRequired);
        assert_eq!(res.headers.get(Header::SecWebSocketVersion), Some("13"));
    }

    #[test]
    fn test_rejects_missing_key() {
        let mut req = upgrade();
        req.headers.remove(Header::SecWebSocketKey);
        let res = WebSocketHandshake.process(req, &NotFound);
        assert_eq!(res.status, Status::BadRequest);
    }
}

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

//! Middleware for the browser client.

use canvas_serve::handler::{self, Handler};
use canvas_serve::http::response::ResponseExt;
use canvas_serve::http::{Header, Method, Request, Response, Status};
use canvas_serve::middleware::{Middleware, TryIntoMiddleware};
use std::fs;
use std::path::PathBuf;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Bundled browser client.
///
/// The client connects back to the server over WebSocket, requests the board,
/// draws it onto an HTML canvas, and sends a pixel change for every click. It
/// reconnects after a second when the connection is lost.
static CLIENT: &str = include_str!("page/index.html");

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Middleware for the browser client.
///
/// Serves the page on `/` and `/index.html`, and passes everything else on.
///
/// # Examples
///
/// ```
/// use canvas::server::Page;
/// use canvas_serve::handler::NotFound;
/// use canvas_serve::http::{Request, Status};
/// use canvas_serve::middleware::Middleware;
///
/// // Request page
/// let res = Page::default().process(Request::new(), &NotFound);
/// assert_eq!(res.status, Status::Ok);
/// ```
#[derive(Debug)]
pub struct Page {
    /// HTML document.
    html: String,
}

/// Page loaded from a file.
///
/// The file is read when the middleware is created, so a missing file fails
/// at startup, and not on the first request.
#[derive(Debug)]
pub struct PageFile {
    /// Path to HTML document.
    path: PathBuf,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Page {
    /// Creates a page serving the given HTML document.
    #[must_use]
    pub fn new<S>(html: S) -> Self
    where
        S: Into<String>,
    {
        Self { html: html.into() }
    }

    /// Creates a page from the HTML document at the given path.
    #[must_use]
    pub fn file<P>(path: P) -> PageFile
    where
        P: Into<PathBuf>,
    {
        PageFile { path: path.into() }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Default for Page {
    fn default() -> Self {
        Self::new(CLIENT)
    }
}

impl Middleware for Page {
    /// Processes the given request.
    fn process(&self, req: Request, next: &dyn Handler) -> Response {
        if !matches!(&*req.uri.path, "/" | "/index.html") {
            return next.handle(req);
        }

        // Only reading the page is allowed
        if req.method != Method::Get {
            return Response::from_status(Status::MethodNotAllowed)
                .header(Header::Allow, Method::Get);
        }
        Response::from_html(self.html.as_str())
            .header(Header::CacheControl, "no-cache")
    }
}

impl TryIntoMiddleware for PageFile {
    type Output = Page;

    fn try_into_middleware(self) -> handler::Result<Page> {
        let html = fs::read_to_string(&self.path)?;
        tracing::info!("Serving page from {}", self.path.display());
        Ok(Page::new(html))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use canvas_serve::handler::NotFound;
    use std::io::Write;
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_serves_bundled_client() {
        let req = Request::new().uri("/index.html");
        let res = Page::default().process(req, &NotFound);
        assert_eq!(res.status, Status::Ok);
        assert_eq!(res.headers.get(Header::CacheControl), Some("no-cache"));
        assert!(String::from_utf8_lossy(&res.body).contains("RETRIEVE_BOARD"));
    }

    #[test]
    fn test_passes_other_paths() {
        let req = Request::new().uri("/favicon.ico");
        let res = Page::default().process(req, &NotFound);
        assert_eq!(res.status, Status::NotFound);
    }

    #[test]
    fn test_rejects_other_methods() {
        let req = Request::new().method(Method::Post);
        let res = Page::default().process(req, &NotFound);
        assert_eq!(res.status, Status::MethodNotAllowed);
    }

    #[test]
    fn test_loads_page_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "<h1>Custom</h1>").unwrap();

        let page = Page::file(file.path()).try_into_middleware().unwrap();
        let res = page.process(Request::new(), &NotFound);
        assert_eq!(res.body, b"<h1>Custom</h1>");
    }

    #[test]
    fn test_missing_page_file() {
        let res = Page::file("/nonexistent/page.html").try_into_middleware();
        assert!(res.is_err());
    }
}

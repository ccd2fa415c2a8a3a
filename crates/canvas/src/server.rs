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

//! Canvas server.

use canvas_serve::handler::Stack;
use canvas_serve::middleware::WebSocketHandshake;
use canvas_serve::server::{Command, Result, Server};
use canvas_serve::universe::Shared;
use crossbeam::channel::Sender;

use super::canvas::Canvas;
use super::config::Config;
use super::responder::CanvasResponder;

mod api;
mod page;

pub use api::Api;
pub use page::{Page, PageFile};

// ----------------------------------------------------------------------------
// Type aliases
// ----------------------------------------------------------------------------

/// Server sharing a canvas between clients.
pub type CanvasServer = Server<Stack, CanvasResponder>;

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Creates a server for the given canvas.
///
/// Requests pass through the WebSocket handshake, the browser client and the
/// HTTP API, in that order, and anything left over is answered with "404 Not
/// Found". Pixel changes made through the HTTP API are broadcast by sending
/// them to the given command sender, so its receiver must be passed to
/// [`Server::poll`].
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use canvas::canvas::Canvas;
/// use canvas::config::Config;
/// use canvas::server::create_server;
/// use canvas_serve::universe;
/// use crossbeam::channel::unbounded;
///
/// // Create configuration, binding to a free port
/// let mut config = Config::default();
/// config.server.addr = String::from("127.0.0.1:0");
///
/// // Create server
/// let (sender, receiver) = unbounded();
/// let canvas = universe::share(Canvas::new(8, 8, 10));
/// let server = create_server(&config, canvas, sender)?;
/// assert_eq!(server.local_addrs().len(), 1);
/// # Ok(())
/// # }
/// ```
pub fn create_server(
    config: &Config, canvas: Shared<Canvas>, sender: Sender<Command>,
) -> Result<CanvasServer> {
    let mut stack = Stack::new().with(WebSocketHandshake);
    match &config.server.page {
        Some(path) => stack.add(Page::file(path)),
        None => stack.add(Page::default()),
    }
    stack.add(Api::new(canvas.clone(), sender));

    // Bind server to configured address
    Server::builder(stack, CanvasResponder, canvas)?
        .bind(config.server.addr.as_str())?
        .listen()
}

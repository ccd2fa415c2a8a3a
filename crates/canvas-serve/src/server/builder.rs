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

//! Server builder.

use mio::net::TcpListener;
use mio::{Interest, Token};
use slab::Slab;
use std::net::{SocketAddr, ToSocketAddrs};

use crate::handler::{Handler, TryIntoHandler};
use crate::responder::Responder;
use crate::universe::Shared;

use super::poller::Poller;
use super::{Error, Result, Server};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Number of events processed per poll.
const EVENT_CAPACITY: usize = 1024;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Server builder.
pub struct Builder<H, R>
where
    R: Responder,
{
    /// Handler for HTTP requests.
    handler: H,
    /// Responder for WebSocket messages.
    responder: R,
    /// Universe shared by all clients.
    universe: Shared<R::Universe>,
    /// Socket addresses to bind to.
    addrs: Vec<SocketAddr>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<H, R> Builder<H, R>
where
    H: Handler,
    R: Responder,
{
    /// Creates a server builder.
    ///
    /// Note that the canonical way to create a [`Server`] is to invoke the
    /// [`Server::builder`] method, which creates an instance of [`Builder`].
    /// However, if only a single address needs to be bound, it can be done
    /// directly using the [`Server::new`] method.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use canvas_serve::handler::NotFound;
    /// use canvas_serve::responder::{Outcome, Responder};
    /// use canvas_serve::server::Builder;
    /// use canvas_serve::universe::{self, Shared, Universe};
    /// use serde_json::Value;
    /// use std::convert::Infallible;
    ///
    /// struct Void;
    ///
    /// impl Universe for Void {
    ///     type Atom = ();
    ///     type Error = Infallible;
    ///
    ///     fn update_atom(&mut self, _: ()) -> Result<(), Infallible> {
    ///         Ok(())
    ///     }
    ///
    ///     fn as_json(&self) -> Value {
    ///         Value::Null
    ///     }
    /// }
    ///
    /// struct Echo;
    ///
    /// impl Responder for Echo {
    ///     type Universe = Void;
    ///
    ///     fn respond(&self, request: Value, _: &Shared<Void>) -> Outcome {
    ///         Outcome::Reply(request)
    ///     }
    /// }
    ///
    /// // Create server builder
    /// let builder = Builder::new(NotFound, Echo, universe::share(Void))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new<T>(
        handler: T, responder: R, universe: Shared<R::Universe>,
    ) -> Result<Self>
    where
        T: TryIntoHandler<Output = H>,
    {
        handler.try_into_handler().map_err(Into::into).map(|handler| Self {
            handler,
            responder,
            universe,
            addrs: Vec::new(),
        })
    }

    /// Adds a socket address to bind to.
    #[inline]
    pub fn bind<A>(mut self, addr: A) -> Result<Self>
    where
        A: ToSocketAddrs,
    {
        // Name resolution might yield the same address more than once
        for addr in addr.to_socket_addrs()? {
            if !self.addrs.contains(&addr) {
                self.addrs.push(addr);
            }
        }
        Ok(self)
    }

    /// Creates the server and binds to the configured addresses.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::NoAddress`] if no address was added, and
    /// [`Error::Io`] if binding or registering a listener fails.
    pub fn listen(self) -> Result<Server<H, R>> {
        if self.addrs.is_empty() {
            return Err(Error::NoAddress);
        }

        // Bind listeners to all addresses, and register them with the poller,
        // using their position as token
        let poller = Poller::new(EVENT_CAPACITY)?;
        let acceptors = self
            .addrs
            .into_iter()
            .enumerate()
            .map(|(n, addr)| -> Result<TcpListener> {
                let mut listener = TcpListener::bind(addr)?;
                poller.register(&mut listener, Token(n), Interest::READABLE)?;
                if let Ok(addr) = listener.local_addr() {
                    tracing::info!("Listening on {addr}");
                }
                Ok(listener)
            })
            .collect::<Result<Vec<_>>>()?;

        // Create server
        Ok(Server {
            handler: self.handler,
            responder: self.responder,
            universe: self.universe,
            events: poller,
            acceptors,
            connections: Slab::new(),
            clients: Slab::new(),
        })
    }
}

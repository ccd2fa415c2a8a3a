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

//! HTTP and WebSocket server.

use crossbeam::channel::{Receiver, TryRecvError};
use mio::net::TcpListener;
use mio::{Interest, Token, Waker};
use serde_json::Value;
use slab::Slab;
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tungstenite::Message;

use super::handler::{Handler, TryIntoHandler};
use super::responder::{Outcome, Responder};
use super::universe::Shared;

mod builder;
mod client;
mod connection;
mod error;
mod poller;

pub use builder::Builder;
use client::ClientHandler;
use connection::{Connection, Signal};
pub use error::{Error, Result};
use poller::{Poller, WAKER};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Offset of WebSocket client tokens.
///
/// Tokens below the offset belong to listeners and HTTP connections, tokens
/// from the offset up to the waker token belong to WebSocket clients.
const CLIENT_OFFSET: usize = 1 << (usize::BITS - 2);

/// Maximum time a single poll blocks, so idle connections are reaped.
const POLL_TIMEOUT: Duration = Duration::from_secs(10);

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Command sent to the server from other threads.
///
/// After sending a command, the server must be woken up through its waker,
/// or the command is only picked up after the next event or poll timeout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Send the given text message to all WebSocket clients.
    Broadcast(String),
    /// Close all WebSocket clients and stop polling.
    Shutdown,
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP and WebSocket server.
///
/// The server runs a single-threaded event loop. HTTP requests are passed to
/// the handler. Once the handler answers with "101 Switching Protocols", the
/// connection becomes a WebSocket client, and every text message it sends is
/// parsed as JSON and passed to the responder, together with the universe.
pub struct Server<H, R>
where
    H: Handler,
    R: Responder,
{
    /// Handler for HTTP requests.
    handler: H,
    /// Responder for WebSocket messages.
    responder: R,
    /// Universe shared by all clients.
    universe: Shared<R::Universe>,
    /// Poller for I/O events.
    events: Poller,
    /// Acceptors for incoming connections.
    acceptors: Vec<TcpListener>,
    /// HTTP connections.
    connections: Slab<Connection>,
    /// WebSocket clients.
    clients: Slab<ClientHandler>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<H, R> Server<H, R>
where
    H: Handler,
    R: Responder,
{
    /// Creates a server bound to the given address.
    #[inline]
    pub fn new<T, A>(
        handler: T, responder: R, universe: Shared<R::Universe>, addr: A,
    ) -> Result<Self>
    where
        T: TryIntoHandler<Output = H>,
        A: ToSocketAddrs,
    {
        Self::builder(handler, responder, universe)?.bind(addr)?.listen()
    }

    /// Creates a server builder.
    #[inline]
    pub fn builder<T>(
        handler: T, responder: R, universe: Shared<R::Universe>,
    ) -> Result<Builder<H, R>>
    where
        T: TryIntoHandler<Output = H>,
    {
        Builder::new(handler, responder, universe)
    }

    /// Polls the server for events, and processes them.
    ///
    /// Commands from the receiver are processed after all events, as well as
    /// whenever the waker fired. Returns `false` once a shutdown command was
    /// received, which means the caller should stop polling.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Io`] if polling or (de)registering fails,
    /// and [`Error::Disconnected`] if all senders of the receiver are gone.
    pub fn poll(
        &mut self, receiver: Option<&Receiver<Command>>,
    ) -> Result<bool> {
        self.events.poll(Some(POLL_TIMEOUT))?;
        self.close_idle(Instant::now())?;

        // Collect readiness first, as handling events needs the whole server
        let ready: Vec<_> = self
            .events
            .iter()
            .map(|event| {
                (event.token(), event.is_readable(), event.is_writable())
            })
            .collect();

        // Dispatch events by token range
        let start = self.acceptors.len();
        for (token, readable, writable) in ready {
            let Token(n) = token;
            if token == WAKER {
                continue;
            } else if n < start {
                self.accept(n)?;
            } else if n < CLIENT_OFFSET {
                self.drive_connection(n - start, readable, writable)?;
            } else {
                self.drive_client(n - CLIENT_OFFSET)?;
            }
        }

        // Process commands sent from other threads
        match receiver {
            Some(receiver) => self.process_commands(receiver),
            None => Ok(true),
        }
    }

    /// Returns the waker for interrupting a poll from other threads.
    #[inline]
    #[must_use]
    pub fn waker(&self) -> Arc<Waker> {
        self.events.waker()
    }

    /// Returns the addresses the server is listening on.
    ///
    /// This is useful when binding to port 0, which lets the operating system
    /// pick a free port.
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.acceptors
            .iter()
            .filter_map(|acceptor| acceptor.local_addr().ok())
            .collect()
    }

    /// Returns the number of connected WebSocket clients.
    #[inline]
    #[must_use]
    pub fn clients(&self) -> usize {
        self.clients.len()
    }

    /// Returns the universe shared by all clients.
    #[inline]
    #[must_use]
    pub fn universe(&self) -> &Shared<R::Universe> {
        &self.universe
    }

    /// Accepts all pending connections on the given listener.
    fn accept(&mut self, n: usize) -> Result {
        let start = self.acceptors.len();
        loop {
            match self.acceptors[n].accept() {
                Ok((socket, addr)) => {
                    tracing::trace!("Accepted connection from {addr}");
                    let slot = self.connections.insert(Connection::new(socket));
                    self.events.register(
                        self.connections[slot].socket(),
                        Token(start + slot),
                        Interest::READABLE,
                    )?;
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => {
                    tracing::warn!("Accept error: {err}");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Reads from or writes to an HTTP connection.
    fn drive_connection(
        &mut self, slot: usize, readable: bool, writable: bool,
    ) -> Result {
        if readable {
            let Some(conn) = self.connections.get_mut(slot) else {
                return Ok(());
            };
            let signal = conn.read(&self.handler);
            self.apply(slot, signal)?;
        }
        if writable {
            let Some(conn) = self.connections.get_mut(slot) else {
                return Ok(());
            };
            let signal = conn.write(&self.handler);
            self.apply(slot, signal)?;
        }
        Ok(())
    }

    /// Applies the signal returned by an HTTP connection.
    fn apply(&mut self, slot: usize, signal: Signal) -> Result {
        let token = Token(self.acceptors.len() + slot);
        match signal {
            // Change of interest, but keep writing if not done
            Signal::Interest(mut interest) => {
                let conn = &mut self.connections[slot];
                if conn.is_writing() {
                    interest |= Interest::WRITABLE;
                }
                self.events.reregister(conn.socket(), token, interest)?;
            }

            // Close connection and deregister from poller
            Signal::Close => {
                let mut socket = self.connections.remove(slot).into_socket();
                self.events.deregister(&mut socket)?;
            }

            // Move connection over to WebSocket clients, which only needs a
            // new token, as the socket stays registered
            Signal::Upgrade(config, rest) => {
                let socket = self.connections.remove(slot).into_socket();
                let early = !rest.is_empty();
                let entry = self.clients.vacant_entry();
                let id = entry.key();
                let client =
                    entry.insert(ClientHandler::new(socket, config, rest));
                self.events.reregister(
                    client.socket(),
                    Token(CLIENT_OFFSET + id),
                    Interest::READABLE,
                )?;
                if let Some(addr) = client.addr() {
                    tracing::info!("Client {id} connected from {addr}");
                } else {
                    tracing::info!("Client {id} connected");
                }

                // Frames sent along with the handshake won't be reported by
                // the socket again, so they're handled right away
                if early {
                    self.drive_client(id)?;
                }
            }

            // Continue without changes
            Signal::Continue => {}
        }
        Ok(())
    }

    /// Reads messages from a WebSocket client, and carries out the outcomes
    /// the responder decides on.
    ///
    /// Clients are always read and flushed, regardless of the readiness that
    /// was reported, since flushing queued frames can hold up reading.
    fn drive_client(&mut self, id: usize) -> Result {
        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        let received = client.read();

        // Dispatch messages in order of arrival
        for text in received.messages {
            let outcome = match serde_json::from_str::<Value>(&text) {
                Ok(request) => self.responder.respond(request, &self.universe),
                Err(err) => {
                    tracing::debug!("Ignoring message from client {id}: {err}");
                    Outcome::Ignore
                }
            };
            match outcome {
                Outcome::Reply(value) => {
                    let message = Message::Text(value.to_string().into());
                    let sent = self
                        .clients
                        .get_mut(id)
                        .is_some_and(|client| client.send(message));
                    if !sent {
                        return self.remove_client(id);
                    }
                }
                Outcome::Broadcast(value) => {
                    self.broadcast(value.to_string())?;
                }
                Outcome::Ignore => {}
            }
        }

        // Remove closed client, or update interest for pending frames
        if received.open {
            self.update_client(id)
        } else {
            self.remove_client(id)
        }
    }

    /// Sends the given text to all WebSocket clients, removing those that
    /// are gone.
    fn broadcast(&mut self, text: String) -> Result {
        let message = Message::Text(text.into());
        let gone: Vec<_> = self
            .clients
            .iter_mut()
            .filter_map(|(id, client)| {
                (!client.send(message.clone())).then_some(id)
            })
            .collect();

        // Remove clients that are gone, and update interest of the others,
        // as frames might be pending now
        for id in gone {
            self.remove_client(id)?;
        }
        let ids: Vec<_> = self.clients.iter().map(|(id, _)| id).collect();
        for id in ids {
            self.update_client(id)?;
        }
        Ok(())
    }

    /// Reregisters a client if its interest changed.
    fn update_client(&mut self, id: usize) -> Result {
        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        if let Some(interest) = client.update_interest() {
            let token = Token(CLIENT_OFFSET + id);
            self.events.reregister(client.socket(), token, interest)?;
        }
        Ok(())
    }

    /// Removes a client and deregisters it from the poller.
    fn remove_client(&mut self, id: usize) -> Result {
        if let Some(mut client) = self.clients.try_remove(id) {
            self.events.deregister(client.socket())?;
            tracing::info!("Client {id} disconnected");
        }
        Ok(())
    }

    /// Processes all commands that are waiting in the receiver.
    fn process_commands(
        &mut self, receiver: &Receiver<Command>,
    ) -> Result<bool> {
        loop {
            match receiver.try_recv() {
                Ok(Command::Broadcast(text)) => self.broadcast(text)?,
                Ok(Command::Shutdown) => {
                    self.shutdown()?;
                    return Ok(false);
                }
                Err(TryRecvError::Empty) => return Ok(true),
                Err(TryRecvError::Disconnected) => {
                    return Err(Error::Disconnected);
                }
            }
        }
    }

    /// Starts the closing handshake with all clients, and drops them.
    ///
    /// Closing is best effort: close frames are flushed once, and if a
    /// client's socket would block, it's dropped without its close frame.
    fn shutdown(&mut self) -> Result {
        let count = self.clients.len();
        tracing::info!("Shutting down, closing {count} client(s)");
        for (_, client) in &mut self.clients {
            client.close();
        }
        let ids: Vec<_> = self.clients.iter().map(|(id, _)| id).collect();
        for id in ids {
            self.remove_client(id)?;
        }
        Ok(())
    }

    /// Closes HTTP connections that have been idle for too long.
    fn close_idle(&mut self, now: Instant) -> Result {
        let idle: Vec<_> = self
            .connections
            .iter()
            .filter_map(|(slot, conn)| conn.is_timed_out(now).then_some(slot))
            .collect();
        for slot in idle {
            let mut socket = self.connections.remove(slot).into_socket();
            self.events.deregister(&mut socket)?;
        }
        Ok(())
    }
}

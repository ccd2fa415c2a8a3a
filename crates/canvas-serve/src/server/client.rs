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

//! WebSocket client.

use mio::Interest;
use mio::net::TcpStream;
use std::io::ErrorKind;
use std::net::SocketAddr;
use tungstenite::protocol::{Role, WebSocketConfig};
use tungstenite::{Error, Message, WebSocket};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// WebSocket client.
///
/// Wraps the upgraded socket of a client, and keeps track of whether frames
/// are still waiting to be flushed, in which case the client must be polled
/// for writability as well.
#[derive(Debug)]
pub struct ClientHandler {
    /// WebSocket.
    socket: WebSocket<TcpStream>,
    /// Peer address, if known.
    addr: Option<SocketAddr>,
    /// Interest the client is registered with.
    interest: Interest,
    /// Whether frames are waiting to be flushed.
    pending: bool,
}

/// Messages received from a client.
#[derive(Debug, Default)]
pub struct Received {
    /// Text messages in order of arrival.
    pub messages: Vec<String>,
    /// Whether the client is still open.
    pub open: bool,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl ClientHandler {
    /// Creates a client from an upgraded socket, and the bytes that were
    /// already read from it after the handshake.
    pub fn new(
        socket: TcpStream, config: WebSocketConfig, part: Vec<u8>,
    ) -> Self {
        let addr = socket.peer_addr().ok();
        Self {
            socket: WebSocket::from_partially_read(
                socket,
                part,
                Role::Server,
                Some(config),
            ),
            addr,
            interest: Interest::READABLE,
            pending: false,
        }
    }

    /// Returns a mutable reference to the underlying socket.
    pub fn socket(&mut self) -> &mut TcpStream {
        self.socket.get_mut()
    }

    /// Returns the peer address, if known.
    pub fn addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    /// Reads all frames that are available without blocking.
    ///
    /// Control frames are answered by the protocol implementation, binary
    /// messages are dropped, and text messages are returned for dispatching.
    pub fn read(&mut self) -> Received {
        let mut received = Received { messages: Vec::new(), open: true };
        loop {
            match self.socket.read() {
                Ok(Message::Text(text)) => {
                    received.messages.push(text.as_str().to_owned());
                }
                Ok(Message::Binary(data)) => {
                    tracing::debug!(
                        "Ignoring binary message of {} bytes",
                        data.len()
                    );
                }
                Ok(_) => {}

                // Nothing more to read, but pongs or close replies might have
                // been queued, so we must check whether they're sent
                Err(Error::Io(err)) if err.kind() == ErrorKind::WouldBlock => {
                    received.open = self.flush();
                    return received;
                }
                Err(Error::ConnectionClosed | Error::AlreadyClosed) => {
                    received.open = false;
                    return received;
                }
                Err(err) => {
                    tracing::debug!("Dropping client: {err}");
                    received.open = false;
                    return received;
                }
            }
        }
    }

    /// Queues the given message and tries to send it right away.
    ///
    /// Returns `false` if the client is gone, and must be removed.
    pub fn send(&mut self, message: Message) -> bool {
        match self.socket.write(message) {
            Ok(()) => self.flush(),
            Err(Error::Io(err)) if err.kind() == ErrorKind::WouldBlock => {
                self.pending = true;
                true
            }
            Err(err) => {
                tracing::debug!("Dropping client: {err}");
                false
            }
        }
    }

    /// Flushes queued frames.
    ///
    /// Returns `false` if the client is gone, and must be removed.
    pub fn flush(&mut self) -> bool {
        match self.socket.flush() {
            Ok(()) => {
                self.pending = false;
                true
            }
            Err(Error::Io(err)) if err.kind() == ErrorKind::WouldBlock => {
                self.pending = true;
                true
            }
            Err(Error::ConnectionClosed | Error::AlreadyClosed) => false,
            Err(err) => {
                tracing::debug!("Dropping client: {err}");
                false
            }
        }
    }

    /// Starts the closing handshake.
    pub fn close(&mut self) {
        if self.socket.close(None).is_ok() {
            self.flush();
        }
    }

    /// Returns the interest the client should be registered with, if it
    /// differs from the current one, and remembers it.
    pub fn update_interest(&mut self) -> Option<Interest> {
        let interest = if self.pending {
            Interest::READABLE | Interest::WRITABLE
        } else {
            Interest::READABLE
        };
        (interest != self.interest).then(|| {
            self.interest = interest;
            interest
        })
    }
}

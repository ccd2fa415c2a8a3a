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

//! HTTP connection.

use mio::Interest;
use mio::net::TcpStream;
use std::io::{self, Cursor, ErrorKind, Read, Write};
use std::mem;
use std::time::{Duration, Instant};
use tungstenite::protocol::WebSocketConfig;

use crate::handler::Handler;
use crate::http::request::{Error, MAX_REQUEST_SIZE};
use crate::http::response::ResponseExt;
use crate::http::{Request, Response, Status};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Idle time after which a connection is closed.
const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Size of the chunks read from the socket.
const CHUNK_SIZE: usize = 4096;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Connection action after handling an event.
#[derive(Debug)]
pub enum Signal {
    /// Continue with the given interest.
    Interest(Interest),
    /// Continue without changing the current interest.
    Continue,
    /// Hand the socket over to the WebSocket clients, together with the bytes
    /// that were read past the handshake.
    Upgrade(WebSocketConfig, Vec<u8>),
    /// Close the connection.
    Close,
}

// ----------------------------------------------------------------------------

/// What happens once the response is written.
#[derive(Debug)]
enum Next {
    /// Read the next request.
    Read,
    /// Close the connection.
    Close,
    /// Switch to the WebSocket protocol.
    Upgrade(WebSocketConfig),
}

/// Internal buffer state.
#[derive(Debug)]
enum Buffer {
    /// Currently reading a request.
    Reading(Vec<u8>),
    /// Currently writing a response, keeping the bytes that follow the
    /// request it answers.
    Writing(Cursor<Vec<u8>>, Next, Vec<u8>),
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP connection.
#[derive(Debug)]
pub struct Connection {
    /// TCP socket.
    socket: TcpStream,
    /// Read/write buffer.
    buffer: Buffer,
    /// Last activity time.
    time: Instant,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Connection {
    /// Creates a connection.
    pub fn new(socket: TcpStream) -> Self {
        Connection {
            socket,
            buffer: Buffer::Reading(Vec::new()),
            time: Instant::now(),
        }
    }

    /// Consumes the connection and returns the underlying socket.
    pub fn into_socket(self) -> TcpStream {
        self.socket
    }

    /// Returns a mutable reference to the underlying socket.
    pub fn socket(&mut self) -> &mut TcpStream {
        &mut self.socket
    }

    /// Reads from the socket and handles the request once it's complete.
    ///
    /// Events are edge-triggered, so we must drain the socket until it would
    /// block, or we'd never be notified about the data that is left.
    pub fn read<H>(&mut self, handler: &H) -> Signal
    where
        H: Handler,
    {
        let Buffer::Reading(buffer) = &mut self.buffer else {
            return Signal::Continue;
        };
        self.time = Instant::now();

        // Drain socket, but stop once the buffer exceeds the request limit,
        // as the request is rejected by the parser anyway
        let mut chunk = [0u8; CHUNK_SIZE];
        while buffer.len() <= MAX_REQUEST_SIZE {
            match self.socket.read(&mut chunk) {
                Ok(0) => return Signal::Close,
                Ok(bytes) => buffer.extend_from_slice(&chunk[..bytes]),
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => {
                    report(&err);
                    return Signal::Close;
                }
            }
        }

        self.dispatch(handler)
    }

    /// Handles the buffered request, if it's complete.
    ///
    /// Returns [`Signal::Continue`] if more data is needed, and switches to
    /// writing the response otherwise.
    fn dispatch<H>(&mut self, handler: &H) -> Signal
    where
        H: Handler,
    {
        let Buffer::Reading(buffer) = &mut self.buffer else {
            return Signal::Continue;
        };

        // Parse and handle request, or keep reading if it's incomplete
        let (res, next, used) = match Request::parse(buffer) {
            Ok((req, used)) => {
                let close = req.wants_close();
                let line = format!("{} {}", req.method, req.uri);
                let res = handler.handle(req);
                tracing::debug!("{line} -> {}", res.status);

                // Determine what to do after the response is written
                let next = if res.status == Status::SwitchingProtocols {
                    Next::Upgrade(WebSocketConfig::default())
                } else if close {
                    Next::Close
                } else {
                    Next::Read
                };
                (res, next, used)
            }

            // Request is incomplete, wait for more data
            Err(Error::Incomplete) => return Signal::Continue,

            // Request is invalid, so we answer and close the connection
            Err(Error::Validation(status)) => {
                tracing::debug!("Rejecting request: {status}");
                let res = Response::from_status(status);
                (res, Next::Close, buffer.len())
            }
            Err(err) => {
                tracing::debug!("Rejecting malformed request: {err}");
                let res = Response::from_status(Status::BadRequest);
                (res, Next::Close, buffer.len())
            }
        };

        // Switch to writing the response, keeping what follows the request
        let rest = buffer.split_off(used);
        let bytes = res.into_bytes();
        self.buffer = Buffer::Writing(Cursor::new(bytes), next, rest);
        Signal::Interest(Interest::WRITABLE)
    }

    /// Writes the pending response to the socket.
    ///
    /// Once the response is written, a request that already arrived behind
    /// it is handled right away, as the socket won't report it again.
    #[allow(clippy::cast_possible_truncation)]
    pub fn write<H>(&mut self, handler: &H) -> Signal
    where
        H: Handler,
    {
        let Buffer::Writing(cursor, ..) = &mut self.buffer else {
            return Signal::Continue;
        };
        self.time = Instant::now();

        // Write until done, or until the socket would block
        loop {
            let pos = cursor.position() as usize;
            let data = cursor.get_ref();
            if pos >= data.len() {
                break;
            }
            match self.socket.write(&data[pos..]) {
                Ok(0) => return Signal::Close,
                Ok(bytes) => cursor.set_position((pos + bytes) as u64),
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    return Signal::Continue;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => {
                    report(&err);
                    return Signal::Close;
                }
            }
        }

        // Response is written, so continue as requested
        let buffer =
            mem::replace(&mut self.buffer, Buffer::Reading(Vec::new()));
        match buffer {
            Buffer::Writing(_, Next::Upgrade(config), rest) => {
                Signal::Upgrade(config, rest)
            }
            Buffer::Writing(_, Next::Read, rest) if !rest.is_empty() => {
                self.buffer = Buffer::Reading(rest);
                match self.dispatch(handler) {
                    Signal::Continue => Signal::Interest(Interest::READABLE),
                    signal => signal,
                }
            }
            Buffer::Writing(_, Next::Close, _) => Signal::Close,
            _ => Signal::Interest(Interest::READABLE),
        }
    }

    /// Returns whether the connection is currently writing a response.
    pub fn is_writing(&self) -> bool {
        matches!(self.buffer, Buffer::Writing(..))
    }

    /// Returns whether the connection has been idle for too long.
    pub fn is_timed_out(&self, now: Instant) -> bool {
        now.duration_since(self.time) > IDLE_TIMEOUT
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Logs the given I/O error, unless it's a peer going away.
pub fn report(err: &io::Error) {
    match err.kind() {
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe
        | ErrorKind::UnexpectedEof => {}
        _ => tracing::warn!("Connection error: {err}"),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::net;
    use std::thread;

    use super::*;

    /// Returns a connection and the client end of its socket.
    fn connect() -> (Connection, net::TcpStream) {
        let listener = net::TcpListener::bind("127.0.0.1:0").unwrap();
        let client = net::TcpStream::connect(listener.local_addr().unwrap());
        let (socket, _) = listener.accept().unwrap();
        socket.set_nonblocking(true).unwrap();
        (Connection::new(TcpStream::from_std(socket)), client.unwrap())
    }

    /// Reads until the connection has a complete request.
    fn read<H>(conn: &mut Connection, handler: &H) -> Signal
    where
        H: Handler,
    {
        for _ in 0..100 {
            match conn.read(handler) {
                Signal::Continue => thread::sleep(Duration::from_millis(10)),
                signal => return signal,
            }
        }
        panic!("request never completed");
    }

    fn echo(req: Request) -> Response {
        Response::from_text(req.uri.path.to_string())
    }

    #[test]
    fn test_pipelined_requests() {
        let (mut conn, mut client) = connect();
        client
            .write_all(
                b"GET /a HTTP/1.1\r\n\r\n\
                  GET /b HTTP/1.1\r\nConnection: close\r\n\r\n",
            )
            .unwrap();

        let signal = read(&mut conn, &echo);
        assert!(matches!(signal, Signal::Interest(i) if i.is_writable()));
        let signal = conn.write(&echo);
        assert!(matches!(signal, Signal::Interest(i) if i.is_writable()));
        assert!(matches!(conn.write(&echo), Signal::Close));
        drop(conn);

        let mut res = String::new();
        client.read_to_string(&mut res).unwrap();
        assert_eq!(res.matches("HTTP/1.1 200 OK").count(), 2);
        let first = res.find("\r\n\r\n/a").unwrap();
        assert!(res[first..].contains("\r\n\r\n/b"));
    }

    #[test]
    fn test_keep_alive_waits_for_next_request() {
        let (mut conn, mut client) = connect();
        client.write_all(b"GET /a HTTP/1.1\r\n\r\n").unwrap();

        read(&mut conn, &echo);
        let signal = conn.write(&echo);
        assert!(matches!(signal, Signal::Interest(i) if i.is_readable()));
        assert!(!conn.is_writing());
    }

    #[test]
    fn test_upgrade_keeps_early_frames() {
        let (mut conn, mut client) = connect();
        let upgrade =
            |_: Request| Response::from_status(Status::SwitchingProtocols);
        client.write_all(b"GET / HTTP/1.1\r\n\r\n\x81\x00").unwrap();

        read(&mut conn, &upgrade);
        let Signal::Upgrade(_, rest) = conn.write(&upgrade) else {
            panic!("connection was not upgraded");
        };
        assert_eq!(rest, b"\x81\x00");
    }

    #[test]
    fn test_oversized_body_is_answered() {
        let (mut conn, mut client) = connect();
        let bytes = b"POST / HTTP/1.1\r\nContent-Length: 100000000\r\n\r\n{}";
        client.write_all(bytes).unwrap();

        read(&mut conn, &echo);
        assert!(matches!(conn.write(&echo), Signal::Close));
        drop(conn);

        let mut res = String::new();
        client.read_to_string(&mut res).unwrap();
        assert!(res.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
    }

    #[test]
    fn test_is_timed_out() {
        let (conn, _client) = connect();
        assert!(!conn.is_timed_out(conn.time));
        assert!(!conn.is_timed_out(conn.time + IDLE_TIMEOUT));
        let later = Instant::now() + IDLE_TIMEOUT + Duration::from_secs(1);
        assert!(conn.is_timed_out(later));
    }
}

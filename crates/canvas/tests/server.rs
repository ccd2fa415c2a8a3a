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

//! Integration tests for the canvas server.

use canvas::canvas::Canvas;
use canvas::config::Config;
use canvas::server::create_server;
use canvas_serve::server::Command;
use canvas_serve::universe;
use crossbeam::channel::{Sender, unbounded};
use mio::Waker;
use serde_json::{Value, json};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tungstenite::protocol::Role;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Time to wait for the server before failing.
const TIMEOUT: Duration = Duration::from_secs(5);

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Server running in a background thread.
struct Harness {
    /// Address the server listens on.
    addr: SocketAddr,
    /// Command sender.
    sender: Sender<Command>,
    /// Waker to interrupt polling.
    waker: Arc<Waker>,
    /// Server thread.
    thread: Option<JoinHandle<()>>,
}

type Client = WebSocket<MaybeTlsStream<TcpStream>>;

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Harness {
    /// Starts a server for a canvas of the given size on a free port.
    fn start(width: usize, height: usize) -> Self {
        let (sender, receiver) = unbounded();
        let (ready, started) = unbounded();

        // The server isn't sendable, so it's created inside its thread
        let commands = sender.clone();
        let thread = thread::spawn(move || {
            let mut config = Config::default();
            config.server.addr = String::from("127.0.0.1:0");
            let canvas = universe::share(Canvas::new(width, height, 10));
            let mut server = create_server(&config, canvas, commands).unwrap();
            ready.send((server.local_addrs()[0], server.waker())).unwrap();
            while server.poll(Some(&receiver)).unwrap() {}
        });

        let (addr, waker) = started.recv_timeout(TIMEOUT).unwrap();
        Self { addr, sender, waker, thread: Some(thread) }
    }

    /// Connects a WebSocket client.
    fn connect(&self) -> Client {
        let url = format!("ws://{}/", self.addr);
        let (socket, res) = tungstenite::connect(url.as_str()).unwrap();
        assert_eq!(res.status(), 101);
        if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
            stream.set_read_timeout(Some(TIMEOUT)).unwrap();
        }
        socket
    }

    /// Opens a raw TCP stream to the server.
    fn stream(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).unwrap();
        stream.set_read_timeout(Some(TIMEOUT)).unwrap();
        stream
    }

    /// Sends a raw HTTP request, and returns the raw response.
    fn http(&self, method: &str, path: &str, body: &str) -> String {
        let mut stream = self.stream();
        write!(
            stream,
            "{method} {path} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\
             Content-Length: {}\r\n\r\n{body}",
            self.addr,
            body.len()
        )
        .unwrap();

        let mut res = String::new();
        stream.read_to_string(&mut res).unwrap();
        res
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
        let _ = self.waker.wake();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Sends a JSON message.
fn send(client: &mut Client, value: &Value) {
    client.send(Message::text(value.to_string())).unwrap();
}

/// Receives the next text message as JSON.
fn receive<S>(client: &mut WebSocket<S>) -> Value
where
    S: Read + Write,
{
    loop {
        match client.read().unwrap() {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => {}
            message => panic!("unexpected message: {message:?}"),
        }
    }
}

/// Returns a pixel change message.
fn pixel_changed(id: usize, r: u8, g: u8, b: u8) -> Value {
    json!({
        "title": "PIXEL_CHANGED",
        "pixel_changed": { "id": id, "color": { "r": r, "g": g, "b": b } }
    })
}

/// Returns the body of a raw HTTP response.
fn body(res: &str) -> &str {
    res.split_once("\r\n\r\n").map_or("", |(_, body)| body)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[test]
fn test_retrieve_board() {
    let harness = Harness::start(3, 2);
    let mut client = harness.connect();
    send(&mut client, &json!({ "title": "RETRIEVE_BOARD" }));

    let board = receive(&mut client);
    assert_eq!(board["title"], "REPLY_ENTIRE_BOARD");
    assert_eq!(board["width"], 3);
    assert_eq!(board["height"], 2);
    assert_eq!(board["pixelSize"], 10);
    assert_eq!(board["pixels"].as_array().map(Vec::len), Some(6));
}

#[test]
fn test_pixel_change_reaches_all_clients() {
    let harness = Harness::start(4, 4);
    let mut alice = harness.connect();
    let mut bob = harness.connect();

    // Ensure both clients are registered before changing a pixel
    for client in [&mut alice, &mut bob] {
        send(client, &json!({ "title": "RETRIEVE_BOARD" }));
        assert_eq!(receive(client)["title"], "REPLY_ENTIRE_BOARD");
    }

    let message = pixel_changed(5, 10, 20, 30);
    send(&mut alice, &message);
    assert_eq!(receive(&mut alice), message);
    assert_eq!(receive(&mut bob), message);

    // Later clients see the change on the board
    let mut carol = harness.connect();
    send(&mut carol, &json!({ "title": "RETRIEVE_BOARD" }));
    let board = receive(&mut carol);
    assert_eq!(board["pixels"][5], message["pixel_changed"]);
}

#[test]
fn test_invalid_messages_are_ignored() {
    let harness = Harness::start(2, 2);
    let mut client = harness.connect();
    client.send(Message::text("not json")).unwrap();
    send(&mut client, &json!({ "title": "UNKNOWN" }));
    send(&mut client, &pixel_changed(4, 1, 1, 1));

    // The connection survives, and the next request is answered
    send(&mut client, &json!({ "title": "RETRIEVE_BOARD" }));
    let board = receive(&mut client);
    assert_eq!(board["title"], "REPLY_ENTIRE_BOARD");
    assert_eq!(board["pixels"][3]["color"], json!({ "r": 0, "g": 0, "b": 0 }));
}

#[test]
fn test_http_api() {
    let harness = Harness::start(2, 1);
    let res = harness.http("GET", "/api/canvas", "");
    assert!(res.starts_with("HTTP/1.1 200 OK\r\n"));
    let board: Value = serde_json::from_str(body(&res)).unwrap();
    assert_eq!(board["width"], 2);

    // Changing a pixel over HTTP notifies WebSocket clients
    let mut client = harness.connect();
    send(&mut client, &json!({ "title": "RETRIEVE_BOARD" }));
    receive(&mut client);

    let pixel = r#"{"id":1,"color":{"r":7,"g":8,"b":9}}"#;
    let res = harness.http("POST", "/api/pixel", pixel);
    assert!(res.starts_with("HTTP/1.1 204 No Content\r\n"));
    assert_eq!(receive(&mut client), pixel_changed(1, 7, 8, 9));

    let res = harness.http("POST", "/api/pixel", r#"{"id":9}"#);
    assert!(res.starts_with("HTTP/1.1 400 Bad Request\r\n"));
}

#[test]
fn test_http_page_and_not_found() {
    let harness = Harness::start(1, 1);
    let res = harness.http("GET", "/", "");
    assert!(res.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(body(&res).contains("<canvas"));

    let res = harness.http("GET", "/missing", "");
    assert!(res.starts_with("HTTP/1.1 404 Not Found\r\n"));
}

#[test]
fn test_http_keep_alive_pipelining() {
    let harness = Harness::start(2, 2);
    let mut stream = harness.stream();
    write!(
        stream,
        "GET /api/canvas HTTP/1.1\r\nHost: canvas\r\n\r\n\
         GET /api/canvas HTTP/1.1\r\nHost: canvas\r\nConnection: close\r\n\r\n"
    )
    .unwrap();

    // Both requests are answered in order on the same connection
    let mut res = String::new();
    stream.read_to_string(&mut res).unwrap();
    assert_eq!(res.matches("HTTP/1.1 200 OK\r\n").count(), 2);
    assert_eq!(res.matches(r#""width":2"#).count(), 2);
}

#[test]
fn test_frame_sent_with_handshake() {
    let harness = Harness::start(1, 1);
    let mut stream = harness.stream();

    // Masked text frame, with a zero key, so the payload stays readable
    let payload = json!({ "title": "RETRIEVE_BOARD" }).to_string();
    let mut bytes = b"GET / HTTP/1.1\r\nHost: canvas\r\nUpgrade: websocket\r\n\
        Connection: Upgrade\r\nSec-WebSocket-Version: 13\r\n\
        Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n"
        .to_vec();
    let len = u8::try_from(payload.len()).unwrap();
    bytes.extend_from_slice(&[0x81, 0x80 | len, 0, 0, 0, 0]);
    bytes.extend_from_slice(payload.as_bytes());
    stream.write_all(&bytes).unwrap();

    // Read the handshake response byte by byte, leaving frames alone
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        stream.read_exact(&mut byte).unwrap();
        head.push(byte[0]);
    }
    assert!(head.starts_with(b"HTTP/1.1 101 Switching Protocols\r\n"));

    // The frame was handled without the client sending anything else
    let mut client =
        WebSocket::from_partially_read(stream, Vec::new(), Role::Client, None);
    let board = receive(&mut client);
    assert_eq!(board["title"], "REPLY_ENTIRE_BOARD");
}

#[test]
fn test_shutdown_closes_clients() {
    let harness = Harness::start(1, 1);
    let mut client = harness.connect();
    send(&mut client, &json!({ "title": "RETRIEVE_BOARD" }));
    receive(&mut client);
    drop(harness);

    // The server is gone, so reading ends with a close or an error
    loop {
        match client.read() {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }
}

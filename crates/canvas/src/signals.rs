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

//! Signal handling.

use canvas_serve::server::Command;
use crossbeam::channel::Sender;
use mio::Waker;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Thread turning termination signals into server shutdowns.
#[derive(Debug)]
pub struct Terminator {
    /// Handle to close the signal iterator.
    handle: Handle,
    /// Thread handle.
    thread: JoinHandle<()>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Terminator {
    /// Spawns the signal thread.
    ///
    /// Every signal sends [`Command::Shutdown`] and wakes the server, since
    /// the server only drains commands when it returns from polling.
    pub fn spawn(
        sender: Sender<Command>, waker: Arc<Waker>,
    ) -> io::Result<Self> {
        let mut signals = Signals::new([SIGHUP, SIGTERM, SIGINT])?;
        let handle = signals.handle();
        let thread = thread::Builder::new()
            .name(String::from("signals"))
            .spawn(move || {
                for signal in signals.forever() {
                    tracing::info!("Received signal {signal}, shutting down");
                    if sender.send(Command::Shutdown).is_err() {
                        break;
                    }
                    if let Err(err) = waker.wake() {
                        tracing::error!("Waking server failed: {err}");
                    }
                }
            })?;

        // Return terminator
        Ok(Self { handle, thread })
    }

    /// Stops listening for signals, and joins the thread.
    pub fn close(self) {
        self.handle.close();
        if self.thread.join().is_err() {
            tracing::error!("Signal thread panicked");
        }
    }
}

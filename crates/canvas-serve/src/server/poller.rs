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

//! Poller for I/O events.

use mio::event::{Event, Iter, Source};
use mio::{Events, Interest, Poll, Token, Waker};
use std::sync::Arc;
use std::time::Duration;

use super::error::Result;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Token reserved for the waker.
///
/// Using the largest possible token keeps the lower ranges free, so listener,
/// connection and client tokens map to their indices with simple offsets.
pub const WAKER: Token = Token(usize::MAX);

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Poller for I/O events.
pub struct Poller {
    /// Poll instance.
    poll: Poll,
    /// Event queue.
    events: Events,
    /// Waker for interrupting a blocking poll from other threads.
    waker: Arc<Waker>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Poller {
    /// Creates a poller with room for the given number of events per poll.
    pub fn new(capacity: usize) -> Result<Self> {
        let poll = Poll::new()?;
        let waker = Waker::new(poll.registry(), WAKER)?;
        Ok(Self {
            poll,
            events: Events::with_capacity(capacity),
            waker: Arc::new(waker),
        })
    }

    /// Registers a source for the given interest.
    #[inline]
    pub fn register<S>(
        &self, source: &mut S, token: Token, interest: Interest,
    ) -> Result
    where
        S: Source + ?Sized,
    {
        let registry = self.poll.registry();
        registry.register(source, token, interest).map_err(Into::into)
    }

    /// Changes token or interest of a registered source.
    #[inline]
    pub fn reregister<S>(
        &self, source: &mut S, token: Token, interest: Interest,
    ) -> Result
    where
        S: Source + ?Sized,
    {
        let registry = self.poll.registry();
        registry.reregister(source, token, interest).map_err(Into::into)
    }

    /// Deregisters a source.
    #[inline]
    pub fn deregister<S>(&self, source: &mut S) -> Result
    where
        S: Source + ?Sized,
    {
        self.poll.registry().deregister(source).map_err(Into::into)
    }

    /// Waits for readiness events, or until the timeout elapsed.
    ///
    /// Interrupted system calls, e.g., due to a signal arriving, are treated
    /// like a timeout, leaving the event queue empty.
    pub fn poll(&mut self, timeout: Option<Duration>) -> Result {
        match self.poll.poll(&mut self.events, timeout) {
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {
                self.events.clear();
                Ok(())
            }
            res => res.map_err(Into::into),
        }
    }

    /// Returns the waker.
    #[inline]
    #[must_use]
    pub fn waker(&self) -> Arc<Waker> {
        Arc::clone(&self.waker)
    }

    /// Returns an iterator over the events of the last poll.
    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        self.events.iter()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<'a> IntoIterator for &'a Poller {
    type Item = &'a Event;
    type IntoIter = Iter<'a>;

    #[inline]
    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

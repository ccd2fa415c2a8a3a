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

//! Responder for WebSocket client requests.

use serde_json::Value;

use super::universe::{Shared, Universe};

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Outcome of a client request.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Send the message to the requesting client only.
    Reply(Value),
    /// Send the message to all connected clients, including the requester.
    Broadcast(Value),
    /// Do nothing.
    Ignore,
}

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Responder.
///
/// The server calls the responder once for every JSON message a WebSocket
/// client sends, and carries out the returned [`Outcome`]. The responder gets
/// access to the shared universe, and decides which locks it needs.
///
/// # Examples
///
/// ```
/// use canvas_serve::responder::{Outcome, Responder};
/// use canvas_serve::universe::{self, Shared, Universe};
/// use serde_json::{json, Value};
/// use std::convert::Infallible;
///
/// // Define universe
/// struct Tally(u64);
///
/// impl Universe for Tally {
///     type Atom = u64;
///     type Error = Infallible;
///
///     fn update_atom(&mut self, atom: u64) -> Result<(), Infallible> {
///         self.0 += atom;
///         Ok(())
///     }
///
///     fn as_json(&self) -> Value {
///         json!({ "tally": self.0 })
///     }
/// }
///
/// // Define responder, which adds numbers to the tally
/// struct Adder;
///
/// impl Responder for Adder {
///     type Universe = Tally;
///
///     fn respond(&self, request: Value, universe: &Shared<Tally>) -> Outcome {
///         let Some(n) = request["add"].as_u64() else {
///             return Outcome::Ignore;
///         };
///         let mut tally = universe::write(universe);
///         match tally.update_atom(n) {
///             Ok(()) => Outcome::Broadcast(tally.as_json()),
///             Err(_) => Outcome::Ignore,
///         }
///     }
/// }
///
/// // Respond to request
/// let shared = universe::share(Tally(1));
/// let outcome = Adder.respond(json!({ "add": 2 }), &shared);
/// assert_eq!(outcome, Outcome::Broadcast(json!({ "tally": 3 })));
/// ```
pub trait Responder: 'static {
    /// Universe the responder operates on.
    type Universe: Universe;

    /// Responds to a client request.
    fn respond(
        &self, request: Value, universe: &Shared<Self::Universe>,
    ) -> Outcome;
}

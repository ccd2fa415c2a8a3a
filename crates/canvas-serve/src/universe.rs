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

//! Shared state for WebSocket clients.

use serde_json::Value;
use std::error::Error;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Universe.
///
/// A universe is the state that all connected clients share and operate on.
/// It's made of atoms, the smallest units of change a client can request, and
/// can be rendered as JSON in its entirety, which is what clients receive when
/// they (re)connect and need to catch up.
///
/// # Examples
///
/// ```
/// use canvas_serve::universe::{self, Universe};
/// use serde_json::{json, Value};
/// use std::convert::Infallible;
///
/// // Define universe
/// #[derive(Default)]
/// struct Tally(u64);
///
/// // Create universe implementation
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
/// // Share universe and update it
/// let shared = universe::share(Tally::default());
/// universe::write(&shared).update_atom(3).unwrap();
/// assert_eq!(universe::read(&shared).as_json(), json!({ "tally": 3 }));
/// ```
pub trait Universe: 'static {
    /// Smallest unit of change.
    type Atom;
    /// Error returned when an atom cannot be applied.
    type Error: Error;

    /// Applies the given atom to the universe.
    ///
    /// # Errors
    ///
    /// In case the atom doesn't fit into the universe, an error is returned,
    /// and the universe must be left unchanged.
    fn update_atom(&mut self, atom: Self::Atom) -> Result<(), Self::Error>;

    /// Returns the entire universe as JSON.
    fn as_json(&self) -> Value;
}

// ----------------------------------------------------------------------------
// Type aliases
// ----------------------------------------------------------------------------

/// Universe shared between the server and other threads.
pub type Shared<U> = Arc<RwLock<U>>;

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Wraps the given universe for sharing.
pub fn share<U>(universe: U) -> Shared<U>
where
    U: Universe,
{
    Arc::new(RwLock::new(universe))
}

/// Acquires a read lock on the given universe.
///
/// Atoms are applied all or nothing, so a universe behind a poisoned lock is
/// still consistent, and the guard is recovered.
pub fn read<U>(shared: &Shared<U>) -> RwLockReadGuard<'_, U> {
    shared.read().unwrap_or_else(|err| {
        tracing::warn!("Recovering universe from poisoned lock");
        err.into_inner()
    })
}

/// Acquires a write lock on the given universe.
///
/// See [`read`] for how poisoned locks are treated.
pub fn write<U>(shared: &Shared<U>) -> RwLockWriteGuard<'_, U> {
    shared.write().unwrap_or_else(|err| {
        tracing::warn!("Recovering universe from poisoned lock");
        err.into_inner()
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::{fmt, thread};

    use super::*;

    #[derive(Debug)]
    struct Overflow;

    impl fmt::Display for Overflow {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("overflow")
        }
    }

    impl Error for Overflow {}

    struct Bucket(u8);

    impl Universe for Bucket {
        type Atom = u8;
        type Error = Overflow;

        fn update_atom(&mut self, atom: u8) -> Result<(), Overflow> {
            self.0 = self.0.checked_add(atom).ok_or(Overflow)?;
            Ok(())
        }

        fn as_json(&self) -> Value {
            json!(self.0)
        }
    }

    fn poison(shared: &Shared<Bucket>) {
        let _guard = shared.write().unwrap();
        panic!("poisoning lock");
    }

    #[test]
    fn test_failed_update_leaves_universe_unchanged() {
        let shared = share(Bucket(250));
        assert!(write(&shared).update_atom(10).is_err());
        assert_eq!(read(&shared).as_json(), json!(250));
    }

    #[test]
    fn test_recovers_from_poisoned_lock() {
        let shared = share(Bucket(1));
        let clone = Arc::clone(&shared);
        let res = thread::spawn(move || poison(&clone)).join();
        assert!(res.is_err());
        assert!(shared.is_poisoned());

        // Lock is poisoned, but state is still accessible
        write(&shared).update_atom(1).unwrap();
        assert_eq!(read(&shared).as_json(), json!(2));
    }
}

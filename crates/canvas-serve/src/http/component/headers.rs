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

//! HTTP headers.

use std::borrow::Cow;
use std::fmt;
use std::slice::Iter;

use super::header::Header;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP headers, shared by requests and responses.
///
/// Headers keep the order in which they were first inserted, and every header
/// appears at most once. Values parsed from a request borrow from the read
/// buffer, while responses own their values, which is why responses carry
/// `Headers<'static>`.
///
/// # Examples
///
/// ```
/// use canvas_serve::http::{Header, Headers};
///
/// // Create headers, and replace a value
/// let mut headers = Headers::new();
/// headers.insert(Header::CacheControl, "no-store");
/// headers.insert(Header::CacheControl, "no-cache");
/// assert_eq!(headers.get(Header::CacheControl), Some("no-cache"));
/// assert_eq!(headers.len(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers<'a> {
    /// Header entries in insertion order.
    entries: Vec<(Header, Cow<'a, str>)>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<'a> Headers<'a> {
    /// Creates an empty set of headers.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Returns the value of the given header.
    #[must_use]
    pub fn get(&self, header: Header) -> Option<&str> {
        self.position(header).map(|n| self.entries[n].1.as_ref())
    }

    /// Returns whether the given header is set.
    #[inline]
    #[must_use]
    pub fn contains(&self, header: Header) -> bool {
        self.position(header).is_some()
    }

    /// Returns whether the comma-separated value of the given header contains
    /// the token, ignoring case, e.g., `upgrade` in `keep-alive, Upgrade`.
    ///
    /// # Examples
    ///
    /// ```
    /// use canvas_serve::http::{Header, Headers};
    ///
    /// // Check for tokens
    /// let mut headers = Headers::new();
    /// headers.insert(Header::Connection, "keep-alive, Upgrade");
    /// assert!(headers.has_token(Header::Connection, "upgrade"));
    /// assert!(!headers.has_token(Header::Connection, "close"));
    /// ```
    #[must_use]
    pub fn has_token(&self, header: Header, token: &str) -> bool {
        self.get(header).is_some_and(|value| {
            value
                .split(',')
                .any(|part| part.trim().eq_ignore_ascii_case(token))
        })
    }

    /// Sets the given header, replacing any previous value in place.
    pub fn insert<V>(&mut self, header: Header, value: V)
    where
        V: Into<Cow<'a, str>>,
    {
        let value = value.into();
        match self.position(header) {
            Some(n) => self.entries[n].1 = value,
            None => self.entries.push((header, value)),
        }
    }

    /// Removes the given header, returning its value.
    pub fn remove(&mut self, header: Header) -> Option<Cow<'a, str>> {
        self.position(header)
            .map(|n| self.entries.remove(n))
            .map(|(_, value)| value)
    }

    /// Returns an iterator over the headers.
    #[inline]
    pub fn iter(&self) -> Iter<'_, (Header, Cow<'a, str>)> {
        self.entries.iter()
    }

    /// Returns the index of the given header.
    fn position(&self, header: Header) -> Option<usize> {
        self.entries.iter().position(|(name, _)| *name == header)
    }
}

#[allow(clippy::must_use_candidate)]
impl Headers<'_> {
    /// Returns the number of headers.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether there are any headers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<'a, 'b> IntoIterator for &'b Headers<'a> {
    type Item = &'b (Header, Cow<'a, str>);
    type IntoIter = Iter<'b, (Header, Cow<'a, str>)>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, V> FromIterator<(Header, V)> for Headers<'a>
where
    V: Into<Cow<'a, str>>,
{
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (Header, V)>,
    {
        let mut headers = Headers::new();
        for (header, value) in iter {
            headers.insert(header, value);
        }
        headers
    }
}

impl fmt::Display for Headers<'_> {
    /// Formats the headers as they appear on the wire.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.entries
            .iter()
            .try_for_each(|(header, value)| write!(f, "{header}: {value}\r\n"))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_insertion_order() {
        let headers: Headers = [
            (Header::Upgrade, "websocket"),
            (Header::Connection, "Upgrade"),
            (Header::Upgrade, "WebSocket"),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            headers.to_string(),
            "Upgrade: WebSocket\r\nConnection: Upgrade\r\n"
        );
    }

    #[test]
    fn test_remove() {
        let mut headers = Headers::new();
        headers.insert(Header::Host, "canvas");
        assert_eq!(headers.remove(Header::Host).as_deref(), Some("canvas"));
        assert_eq!(headers.remove(Header::Host), None);
        assert!(headers.is_empty());
    }

    #[test]
    fn test_has_token_ignores_whitespace_and_case() {
        let mut headers = Headers::new();
        headers.insert(Header::Connection, "keep-alive ,  CLOSE");
        assert!(headers.has_token(Header::Connection, "close"));
        assert!(!headers.has_token(Header::Upgrade, "close"));
    }
}

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

//! Configuration.

use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod error;

pub use error::{Error, Result};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Configuration file used when none is given.
pub const DEFAULT_PATH: &str = "canvas.toml";

/// Maximum number of pixels on a canvas.
pub const MAX_PIXELS: usize = 1 << 20;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Configuration.
///
/// All sections and settings are optional, so an empty file, or no file at
/// all, yields the defaults. Command line flags are applied on top.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use canvas::config::Config;
///
/// // Parse configuration
/// let config = Config::parse("[canvas]\nwidth = 32\n")?;
/// assert_eq!(config.canvas.width, 32);
/// assert_eq!(config.canvas.height, 64);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Canvas settings.
    pub canvas: CanvasConfig,
    /// Snapshot settings.
    pub snapshot: SnapshotConfig,
}

/// Server settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to listen on.
    pub addr: String,
    /// HTML page served instead of the bundled one.
    pub page: Option<PathBuf>,
}

/// Canvas settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasConfig {
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Size of a pixel when drawn by clients.
    pub pixel_size: usize,
}

/// Snapshot settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SnapshotConfig {
    /// Snapshot file, if the canvas should be persisted.
    pub path: Option<PathBuf>,
    /// Seconds between snapshots.
    pub interval: u64,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Config {
    /// Loads the configuration from the given file, or the default file.
    ///
    /// A missing default file yields the default configuration, but a missing
    /// file that was explicitly given is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_PATH), false),
        };
        match fs::read_to_string(path) {
            Ok(content) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::parse(&content)
            }
            Err(err) if err.kind() == ErrorKind::NotFound && !explicit => {
                Ok(Self::default())
            }
            Err(err) => Err(Error::Io { path: path.to_path_buf(), err }),
        }
    }

    /// Parses the configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Into::into)
    }

    /// Ensures all settings are within bounds.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Invalid`] if any dimension or the snapshot
    /// interval is zero, or the canvas has too many pixels.
    pub fn validate(&self) -> Result {
        let CanvasConfig { width, height, pixel_size } = self.canvas;
        if width == 0 || height == 0 {
            return Err(Error::Invalid("canvas must not be empty".into()));
        }
        if pixel_size == 0 {
            return Err(Error::Invalid("pixel size must be non-zero".into()));
        }
        if width.checked_mul(height).is_none_or(|len| len > MAX_PIXELS) {
            return Err(Error::Invalid(format!(
                "canvas of {width}x{height} exceeds {MAX_PIXELS} pixels"
            )));
        }
        if self.snapshot.interval == 0 {
            return Err(Error::Invalid("interval must be non-zero".into()));
        }
        Ok(())
    }
}

impl SnapshotConfig {
    /// Returns the time between snapshots.
    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: String::from("127.0.0.1:8080"),
            page: None,
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self { width: 64, height: 64, pixel_size: 10 }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self { path: None, interval: 30 }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.addr, "127.0.0.1:8080");
        assert_eq!(config.snapshot.interval(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[server]\naddr = \"0.0.0.0:9000\"").unwrap();
        writeln!(file, "[snapshot]\npath = \"board.json\"\ninterval = 5")
            .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.server.addr, "0.0.0.0:9000");
        assert_eq!(config.snapshot.path, Some(PathBuf::from("board.json")));
        assert_eq!(config.snapshot.interval, 5);
        assert_eq!(config.canvas, CanvasConfig::default());
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let res = Config::load(Some(&dir.path().join("missing.toml")));
        assert!(matches!(res, Err(Error::Io { .. })));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let res = Config::parse("[canvas]\ndepth = 3\n");
        assert!(matches!(res, Err(Error::Toml(_))));
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        config.canvas.width = 0;
        assert!(matches!(config.validate(), Err(Error::Invalid(_))));

        // Largest canvas is fine, one more row isn't
        config.canvas.width = 1024;
        config.canvas.height = 1024;
        assert!(config.validate().is_ok());
        config.canvas.height = 1025;
        assert!(matches!(config.validate(), Err(Error::Invalid(_))));

        // Overflowing dimensions are rejected as well
        config.canvas.width = usize::MAX;
        config.canvas.height = 2;
        assert!(matches!(config.validate(), Err(Error::Invalid(_))));

        config.canvas = CanvasConfig::default();
        config.snapshot.interval = 0;
        assert!(matches!(config.validate(), Err(Error::Invalid(_))));
    }
}

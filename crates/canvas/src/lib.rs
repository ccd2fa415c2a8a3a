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

//! Collaborative pixel canvas.
//!
//! A single canvas of pixels is shared between all browsers connected to the
//! server. Every browser loads the board over WebSocket, and every pixel one
//! of them changes is broadcast to all others. The canvas can be persisted to
//! a snapshot file, so it survives restarts.

#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]

use canvas_serve::universe;
use crossbeam::channel::unbounded;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

pub mod canvas;
pub mod config;
mod error;
pub mod responder;
pub mod server;
#[cfg(unix)]
mod signals;
pub mod snapshot;

use canvas::Canvas;
use config::Config;
pub use error::{Error, Result};
use server::create_server;
use snapshot::Autosave;

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Sets up logging to standard error.
///
/// The `RUST_LOG` environment variable takes precedence. Otherwise, quiet
/// logs warnings, and every verbosity level adds more detail to the default
/// of informational messages.
pub fn setup_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::WARN,
        (false, 0) => LevelFilter::INFO,
        (false, 1) => LevelFilter::DEBUG,
        (false, _) => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    // Ignore repeated setup, e.g., in tests
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Runs the server until it's shut down.
///
/// The canvas is restored from the snapshot file, if one is configured and
/// exists, and saved periodically while the server runs. On Unix, the server
/// shuts down on SIGINT, SIGTERM and SIGHUP, after which a final snapshot is
/// written.
pub fn run(config: &Config) -> Result {
    config.validate()?;
    let canvas = universe::share(restore(config)?);

    // Create channel for commands, and server
    let (sender, receiver) = unbounded();
    let mut server = create_server(config, canvas.clone(), sender.clone())?;
    for addr in server.local_addrs() {
        tracing::info!("Serving canvas on http://{addr}");
    }

    // Start saving the canvas, if a snapshot file is configured
    let autosave = match &config.snapshot.path {
        Some(path) => Some(Autosave::spawn(
            path.clone(),
            canvas.clone(),
            config.snapshot.interval(),
        )?),
        None => None,
    };

    // Translate termination signals into commands
    #[cfg(unix)]
    let terminator = signals::Terminator::spawn(sender, server.waker())?;

    // Poll until the server is shut down or fails, and then stop the helper
    // threads, so the final snapshot is written in either case
    let res = loop {
        match server.poll(Some(&receiver)) {
            Ok(true) => {}
            Ok(false) => break Ok(()),
            Err(err) => break Err(err.into()),
        }
    };
    #[cfg(unix)]
    terminator.close();
    if let Some(autosave) = autosave {
        autosave.stop();
    }
    tracing::info!("Server stopped");
    res
}

/// Restores the canvas from the snapshot file, or creates a fresh one.
fn restore(config: &Config) -> Result<Canvas> {
    let (width, height, pixel_size) = (
        config.canvas.width,
        config.canvas.height,
        config.canvas.pixel_size,
    );
    let fresh = Canvas::new(width, height, pixel_size);
    let Some(path) = &config.snapshot.path else {
        return Ok(fresh);
    };

    // A snapshot that doesn't fit the configuration is ignored, since it's
    // kept on disk until the first change is saved
    match snapshot::load(path)? {
        None => Ok(fresh),
        Some(canvas)
            if (canvas.width(), canvas.height(), canvas.pixel_size())
                == (width, height, pixel_size) =>
        {
            tracing::info!("Restored canvas from {}", path.display());
            Ok(canvas)
        }
        Some(canvas) => {
            tracing::warn!(
                "Ignoring snapshot of {}x{} pixels of size {}, expected \
                 {width}x{height} pixels of size {pixel_size}",
                canvas.width(),
                canvas.height(),
                canvas.pixel_size()
            );
            Ok(fresh)
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use canvas_serve::universe::Universe;

    use super::canvas::{Color, Pixel};
    use super::*;

    fn config(path: &std::path::Path, width: usize) -> Config {
        let mut config = Config::default();
        config.canvas.width = width;
        config.canvas.height = 2;
        config.snapshot.path = Some(path.to_path_buf());
        config
    }

    #[test]
    fn test_restore_without_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir.path().join("canvas.json"), 3);
        let canvas = restore(&config).unwrap();
        assert_eq!(canvas.len(), 6);
        assert_eq!(canvas.generation(), 0);
    }

    #[test]
    fn test_restore_from_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir.path().join("canvas.json"), 3);

        let mut canvas = restore(&config).unwrap();
        let mut pixel = Pixel::new(5);
        pixel.change_color(Color::new(0, 0, 255));
        canvas.update_atom(pixel.clone()).unwrap();
        snapshot::save(dir.path().join("canvas.json"), &canvas).unwrap();

        let restored = restore(&config).unwrap();
        assert_eq!(restored.pixel(5), Some(&pixel));
    }

    #[test]
    fn test_restore_ignores_mismatched_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canvas.json");
        snapshot::save(&path, &Canvas::new(4, 2, 10)).unwrap();

        let canvas = restore(&config(&path, 3)).unwrap();
        assert_eq!(canvas.width(), 3);
    }

    #[test]
    fn test_restore_fails_on_corrupt_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canvas.json");
        std::fs::write(&path, "[]").unwrap();

        let res = restore(&config(&path, 3));
        assert!(matches!(res, Err(Error::Snapshot(_))));
    }

    #[test]
    fn test_run_rejects_invalid_config() {
        let mut config = Config::default();
        config.canvas.pixel_size = 0;
        assert!(matches!(run(&config), Err(Error::Config(_))));
    }
}

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

//! Command line interface.

use canvas::config::Config;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Collaborative pixel canvas server.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file [default: canvas.toml, if present]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long)]
    addr: Option<String>,

    /// Width of the canvas in pixels
    #[arg(long)]
    width: Option<usize>,

    /// Height of the canvas in pixels
    #[arg(long)]
    height: Option<usize>,

    /// Size of a pixel when drawn by clients
    #[arg(long)]
    pixel_size: Option<usize>,

    /// Snapshot file to restore from and save to
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Seconds between snapshots
    #[arg(long)]
    interval: Option<u64>,

    /// Increase verbosity, can be repeated
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Args {
    /// Applies the flags given on top of the configuration.
    fn apply(self, config: &mut Config) {
        if let Some(addr) = self.addr {
            config.server.addr = addr;
        }
        if let Some(width) = self.width {
            config.canvas.width = width;
        }
        if let Some(height) = self.height {
            config.canvas.height = height;
        }
        if let Some(pixel_size) = self.pixel_size {
            config.canvas.pixel_size = pixel_size;
        }
        if let Some(path) = self.snapshot {
            config.snapshot.path = Some(path);
        }
        if let Some(interval) = self.interval {
            config.snapshot.interval = interval;
        }
    }
}

// ----------------------------------------------------------------------------
// Program
// ----------------------------------------------------------------------------

fn main() -> ExitCode {
    let args = Args::parse();
    canvas::setup_tracing(args.verbose, args.quiet);

    // Load configuration, and run server until it's shut down
    let res = Config::load(args.config.as_deref())
        .map_err(canvas::Error::from)
        .and_then(|mut config| {
            args.apply(&mut config);
            canvas::run(&config)
        });
    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

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

//! Snapshots of the canvas.

use canvas_serve::universe::{self, Shared};
use crossbeam::channel::{self, RecvTimeoutError, Sender};
use serde_json::Value;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tempfile::NamedTempFile;

use super::canvas::Canvas;

mod error;

pub use error::{Error, Result};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Background thread saving the canvas periodically.
///
/// Snapshots are only written when the canvas changed since the last one, so
/// an idle server doesn't touch the disk. Stopping the thread writes a final
/// snapshot, so no change is lost on an orderly shutdown.
#[derive(Debug)]
pub struct Autosave {
    /// Sender to signal the thread to stop.
    sender: Sender<()>,
    /// Thread handle.
    handle: JoinHandle<()>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Autosave {
    /// Spawns the autosave thread.
    pub fn spawn(
        path: PathBuf, canvas: Shared<Canvas>, interval: Duration,
    ) -> Result<Self> {
        let (sender, receiver) = channel::bounded(1);

        // Only save once the canvas moved past the state it was loaded with
        let mut saved = universe::read(&canvas).generation();
        let handle = thread::Builder::new()
            .name(String::from("autosave"))
            .spawn(move || {
                loop {
                    let stop = !matches!(
                        receiver.recv_timeout(interval),
                        Err(RecvTimeoutError::Timeout)
                    );

                    // Copy the board under the read lock, and write it after
                    // releasing the lock, so clients aren't held up by I/O
                    let (generation, board) = {
                        let canvas = universe::read(&canvas);
                        (canvas.generation(), canvas.to_json())
                    };
                    if generation != saved {
                        match write(&path, &board) {
                            Ok(()) => {
                                tracing::debug!(
                                    "Saved snapshot to {}",
                                    path.display()
                                );
                                saved = generation;
                            }
                            Err(err) => {
                                tracing::error!("Snapshot failed: {err}");
                            }
                        }
                    }
                    if stop {
                        break;
                    }
                }
            })?;

        // Return autosave
        Ok(Self { sender, handle })
    }

    /// Stops the thread after writing a final snapshot.
    pub fn stop(self) {
        let _ = self.sender.send(());
        if self.handle.join().is_err() {
            tracing::error!("Autosave thread panicked");
        }
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Loads a canvas from the given snapshot file.
///
/// A missing file is not an error, but means there's nothing to restore.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use canvas::snapshot;
///
/// // Load snapshot from missing file
/// let dir = tempfile::tempdir()?;
/// let canvas = snapshot::load(dir.path().join("canvas.json"))?;
/// assert!(canvas.is_none());
/// # Ok(())
/// # }
/// ```
pub fn load<P>(path: P) -> Result<Option<Canvas>>
where
    P: AsRef<Path>,
{
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let board: Value = serde_json::from_str(&content)?;
    Canvas::from_board(&board).map(Some).map_err(Into::into)
}

/// Saves the canvas to the given snapshot file.
///
/// The board is written to a temporary file next to the target, which is
/// then renamed over the target, so readers never see a partial snapshot.
pub fn save<P>(path: P, canvas: &Canvas) -> Result
where
    P: AsRef<Path>,
{
    write(path.as_ref(), &canvas.to_json())
}

/// Writes the board atomically to the given path.
fn write(path: &Path, board: &Value) -> Result {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(&mut file);
        serde_json::to_writer(&mut writer, board)?;
        writer.flush()?;
    }
    file.as_file_mut().sync_all()?;
    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use canvas_serve::universe::{Universe, share};
    use std::sync::Arc;

    use crate::canvas::{Color, Pixel};

    use super::*;

    fn red(id: usize) -> Pixel {
        let mut pixel = Pixel::new(id);
        pixel.change_color(Color::new(255, 0, 0));
        pixel
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canvas.json");

        let mut canvas = Canvas::new(3, 2, 5);
        canvas.update_pixel(red(4)).unwrap();
        save(&path, &canvas).unwrap();

        let restored = load(&path).unwrap().unwrap();
        assert_eq!(restored.stringify(), canvas.stringify());
    }

    #[test]
    fn test_load_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canvas.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load(&path), Err(Error::Json(_))));

        fs::write(&path, r#"{"width":1,"height":1,"pixelSize":1,"pixels":[]}"#)
            .unwrap();
        assert!(matches!(load(&path), Err(Error::Canvas(_))));
    }

    #[test]
    fn test_save_leaves_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canvas.json");
        save(&path, &Canvas::new(1, 1, 1)).unwrap();
        save(&path, &Canvas::new(2, 1, 1)).unwrap();

        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
        assert_eq!(load(&path).unwrap().map(|canvas| canvas.len()), Some(2));
    }

    #[test]
    fn test_autosave_saves_on_stop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canvas.json");
        let shared = share(Canvas::new(2, 2, 1));
        let autosave = Autosave::spawn(
            path.clone(),
            Arc::clone(&shared),
            Duration::from_secs(3600),
        )
        .unwrap();

        universe::write(&shared).update_atom(red(1)).unwrap();
        autosave.stop();

        let restored = load(&path).unwrap().unwrap();
        assert_eq!(restored.pixel(1), Some(&red(1)));
    }

    #[test]
    fn test_autosave_skips_unchanged_canvas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canvas.json");
        let shared = share(Canvas::new(2, 2, 1));
        let autosave =
            Autosave::spawn(path.clone(), shared, Duration::from_millis(10))
                .unwrap();

        thread::sleep(Duration::from_millis(50));
        autosave.stop();
        assert!(!path.exists());
    }
}

//! Frame acquisition.
//!
//! The camera itself is an external collaborator; the recognition loop only
//! sees the [`CaptureSource`] seam. The file-backed source below serves
//! saved photos in order, which is how the CLI drives the pipeline.

use anyhow::Result;
use log::debug;
use std::fs;
use std::path::PathBuf;

/// Supplies one frame per recognition attempt.
///
/// `Ok(None)` means no frame was available this attempt (camera busy, file
/// unreadable); the loop treats it like any other transient failure and
/// retries on the next tick.
pub trait CaptureSource {
    fn capture(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Serves photo files in order, one per capture attempt.
///
/// Unreadable files are skipped with a log line rather than failing the
/// attempt chain; an exhausted source keeps returning `Ok(None)`.
pub struct FileCaptureSource {
    paths: Vec<PathBuf>,
    next: usize,
}

impl FileCaptureSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths, next: 0 }
    }
}

impl CaptureSource for FileCaptureSource {
    fn capture(&mut self) -> Result<Option<Vec<u8>>> {
        while self.next < self.paths.len() {
            let path = &self.paths[self.next];
            self.next += 1;
            match fs::read(path) {
                Ok(bytes) => {
                    debug!("Captured {} ({} bytes)", path.display(), bytes.len());
                    return Ok(Some(bytes));
                }
                Err(e) => {
                    debug!("Skipping unreadable {}: {}", path.display(), e);
                }
            }
        }
        Ok(None)
    }
}

//! OCR adapter layer.
//!
//! The recognizer is a black box to the rest of the system: image bytes in,
//! recognized text out. The bundled implementation shells out to a locally
//! installed Tesseract; anything implementing [`TextRecognizer`] plugs in.

pub mod engine;
pub mod setup;

pub use engine::TesseractEngine;
pub use setup::{find_tessdata_dir, find_tesseract_executable};

use anyhow::Result;

/// One-shot text recognition over raw image bytes.
///
/// Errors are transient (engine unavailable, unreadable frame); callers
/// retry rather than propagate. An empty string is a valid result meaning
/// no text was found.
pub trait TextRecognizer {
    fn recognize(&self, image: &[u8]) -> Result<String>;
}

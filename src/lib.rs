//! Sign interpretation core for parking signs.
//!
//! Given a photographed parking-regulation sign and the current date/time,
//! decides whether a driver may legally park at that spot, and if so for how
//! long. The pipeline: a throttled capture/recognize loop feeds frames to an
//! OCR adapter, the recognized text is parsed into restriction rules, and a
//! decision engine turns the rules into a single verdict.

pub mod capture;
pub mod config;
pub mod ocr;
pub mod recognition;
pub mod sign;

//! Runtime configuration.
//!
//! Loads settings from config.json at startup. Provides the recognition
//! retry interval, the parser's time-format locale, and OCR tuning.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How clock times are written on local signs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    /// "8AM-6PM" style.
    TwelveHour,
    /// "08:00-18:00" style.
    TwentyFourHour,
}

/// Complete recognition configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// Delay between recognition attempts (milliseconds)
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    /// Time-format locale assumed when parsing sign text
    #[serde(default = "default_time_format")]
    pub time_format: TimeFormat,
    /// OCR words below this confidence are discarded (0-100)
    #[serde(default = "default_min_word_confidence")]
    pub min_word_confidence: f32,
    /// Tesseract language code
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,
    /// Stop after this many attempts without a verdict (None = keep trying)
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

fn default_retry_interval_ms() -> u64 {
    1000
}

fn default_time_format() -> TimeFormat {
    TimeFormat::TwelveHour
}

fn default_min_word_confidence() -> f32 {
    60.0
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: default_retry_interval_ms(),
            time_format: default_time_format(),
            min_word_confidence: default_min_word_confidence(),
            ocr_language: default_ocr_language(),
            max_attempts: None,
        }
    }
}

/// Loads configuration from the given path, or from config.json next to the
/// executable when no path is given. Missing or malformed files fall back to
/// defaults rather than failing startup.
pub fn load_config(path: Option<&Path>) -> RecognitionConfig {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|p| p.join("config.json")))
            .unwrap_or_else(|| PathBuf::from("config.json")),
    };

    if config_path.exists() {
        match fs::read_to_string(&config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    info!("Config loaded from {}", config_path.display());
                    return config;
                }
                Err(e) => {
                    warn!(
                        "Failed to parse {}: {}. Using defaults.",
                        config_path.display(),
                        e
                    );
                }
            },
            Err(e) => {
                warn!(
                    "Failed to read {}: {}. Using defaults.",
                    config_path.display(),
                    e
                );
            }
        }
    } else {
        info!("{} not found. Using default config.", config_path.display());
    }

    RecognitionConfig::default()
}

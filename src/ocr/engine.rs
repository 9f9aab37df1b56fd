use anyhow::{anyhow, Result};
use log::debug;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::{find_tessdata_dir, find_tesseract_executable};
use super::TextRecognizer;
use crate::config::RecognitionConfig;

/// Text recognizer backed by a locally installed Tesseract executable.
///
/// Frames are decoded, flattened to grayscale, and handed to Tesseract as a
/// temporary PNG. TSV output is used so low-confidence words can be dropped
/// before the text reaches the parser.
pub struct TesseractEngine {
    executable: PathBuf,
    tessdata: Option<PathBuf>,
    language: String,
    min_word_confidence: f32,
}

impl TesseractEngine {
    pub fn new(config: &RecognitionConfig) -> Result<Self> {
        let executable = find_tesseract_executable()?;
        let tessdata = find_tessdata_dir(&config.ocr_language);
        debug!(
            "Tesseract at {} (tessdata: {:?})",
            executable.display(),
            tessdata
        );
        Ok(Self {
            executable,
            tessdata,
            language: config.ocr_language.clone(),
            min_word_confidence: config.min_word_confidence,
        })
    }

    fn run_tesseract(&self, input: &std::path::Path) -> Result<String> {
        // Tesseract appends .tsv to the output base name.
        let temp_output = NamedTempFile::new()?;
        let output_base = temp_output.path().to_string_lossy().to_string();

        let mut cmd = Command::new(&self.executable);
        cmd.arg(input).arg(&output_base);
        if let Some(tessdata) = &self.tessdata {
            cmd.arg("--tessdata-dir").arg(tessdata);
        }
        let output = cmd
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg("6") // Assume single uniform block of text
            .arg("tsv")
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr));
        }

        let tsv_path = format!("{}.tsv", output_base);
        let tsv_content = std::fs::read_to_string(&tsv_path)
            .map_err(|e| anyhow!("Failed to read Tesseract output: {}", e))?;
        let _ = std::fs::remove_file(&tsv_path);

        Ok(tsv_content)
    }
}

impl TextRecognizer for TesseractEngine {
    fn recognize(&self, image: &[u8]) -> Result<String> {
        let img = image::load_from_memory(image)
            .map_err(|e| anyhow!("Failed to decode captured frame: {}", e))?
            .to_luma8();

        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())?;

        let tsv = self.run_tesseract(temp_input.path())?;
        Ok(text_from_tsv(&tsv, self.min_word_confidence))
    }
}

/// Reassembles line-structured text from Tesseract TSV output, dropping
/// words below the confidence floor.
///
/// TSV fields: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text. Level 5 rows are words.
fn text_from_tsv(tsv: &str, min_word_confidence: f32) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current_line: Option<(u32, u32, u32)> = None;
    let mut current_words: Vec<&str> = Vec::new();

    for row in tsv.lines().skip(1) {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }
        let text = fields[11].trim();
        if text.is_empty() {
            continue;
        }
        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        if conf < min_word_confidence {
            continue;
        }

        let line_id = (
            fields[2].parse().unwrap_or(0),
            fields[3].parse().unwrap_or(0),
            fields[4].parse().unwrap_or(0),
        );
        if current_line != Some(line_id) {
            if !current_words.is_empty() {
                lines.push(current_words.join(" "));
                current_words.clear();
            }
            current_line = Some(line_id);
        }
        current_words.push(text);
    }

    if !current_words.is_empty() {
        lines.push(current_words.join(" "));
    }

    lines.join("\n")
}

//! parksign
//!
//! Decides, from a photographed parking-regulation sign and the current
//! date/time, whether a driver may legally park at that spot, and if so for
//! how long. Photos are run through OCR and the recognized text is parsed
//! into restriction rules; a decision engine turns those into a verdict.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use clap::Parser;
use std::path::PathBuf;

use parksign::capture::FileCaptureSource;
use parksign::config::{self, RecognitionConfig};
use parksign::ocr::TesseractEngine;
use parksign::recognition::{run_recognition_loop, LoopHandle};
use parksign::sign::{decide, parse, ParseOptions};

/// parksign - parking sign interpreter
#[derive(Parser, Debug)]
#[command(name = "parksign")]
#[command(about = "Reads a photographed parking sign and decides whether you may park right now")]
struct Args {
    /// Photo files of the sign, tried in order until a verdict is reached
    images: Vec<PathBuf>,

    /// Interpret sign text directly instead of running OCR on photos
    #[arg(long)]
    text: Option<String>,

    /// Reference timestamp "YYYY-MM-DD HH:MM" for --text mode
    /// (defaults to now)
    #[arg(long)]
    at: Option<String>,

    /// Path to config.json (defaults to next to the executable)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = config::load_config(args.config.as_deref());

    if let Some(text) = &args.text {
        let now = match &args.at {
            Some(at) => parse_reference_time(at)?,
            None => Local::now(),
        };
        return interpret_text(text, now, &config);
    }

    if args.images.is_empty() {
        return Err(anyhow!(
            "Nothing to do: pass photo files, or --text to interpret sign text directly"
        ));
    }

    let engine = TesseractEngine::new(&config)?;
    let attempt_budget = config
        .max_attempts
        .unwrap_or(args.images.len() as u32)
        .max(1);
    let source = FileCaptureSource::new(args.images.clone());
    let handle = LoopHandle::new();

    let run_config = RecognitionConfig {
        max_attempts: Some(attempt_budget),
        ..config
    };

    let verdict = run_recognition_loop(source, engine, &run_config, &handle, |verdict| {
        println!("{}", verdict);
    })?;

    if verdict.is_none() {
        println!("No confident verdict; try another photo of the sign.");
    }

    Ok(())
}

/// Parses and decides directly from sign text, printing the rules and the
/// verdict. Useful for checking a sign you can read but not photograph.
fn interpret_text(text: &str, now: DateTime<Local>, config: &RecognitionConfig) -> Result<()> {
    let opts = ParseOptions {
        time_format: config.time_format,
    };
    let rules = parse(text, &opts);

    if rules.is_empty() {
        println!("No text could be interpreted.");
    } else {
        println!("Rules found:");
        for rule in &rules {
            println!("  - {}", rule);
        }
    }

    let verdict = decide(&rules, now);
    println!("{}", verdict);
    Ok(())
}

fn parse_reference_time(at: &str) -> Result<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(at, "%Y-%m-%d %H:%M")
        .map_err(|e| anyhow!("Invalid --at timestamp '{}': {} (expected YYYY-MM-DD HH:MM)", at, e))?;
    Local
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| anyhow!("--at timestamp '{}' is ambiguous in the local timezone", at))
}

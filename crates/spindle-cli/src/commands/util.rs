use anyhow::{Result, anyhow};
use std::io::{self, Read, Write};
use std::path::Path;

use spindle::{Engine, GenerationConfig};

/// Resolve input from: direct text, file path, or stdin
///
/// Rules:
/// - If input is None, read from stdin
/// - If input looks like a file path and exists, read the file
/// - Otherwise, treat input as literal text
pub fn resolve_input(input: Option<&str>) -> Result<String> {
    match input {
        Some(text) => {
            let path = Path::new(text);
            if path.is_file() {
                std::fs::read_to_string(path)
                    .map_err(|e| anyhow!("Failed to read file '{}': {}", text, e))
            } else {
                Ok(text.to_string())
            }
        }
        None => {
            let mut buffer = String::new();
            io::stdin().lock().read_to_string(&mut buffer)?;

            if buffer.is_empty() {
                return Err(anyhow!(
                    "No prompt provided. Pass text with -p, a file path, or pipe via stdin."
                ));
            }

            Ok(buffer)
        }
    }
}

/// Runs one generation and writes the text to stdout.
///
/// Status lines go to stderr so the output can be piped.
pub fn print_generation(
    engine: &Engine,
    prompt: &str,
    config: &GenerationConfig,
    stream: bool,
    quiet: bool,
) -> Result<()> {
    let (tokens, stop_reason) = if stream {
        let mut stdout = io::stdout();
        let mut fragments = engine.generate_stream(prompt, config)?;
        let mut count = 0;
        for fragment in fragments.by_ref() {
            print!("{}", fragment?);
            stdout.flush()?;
            count += 1;
        }
        println!();
        (count, fragments.stop_reason())
    } else {
        let output = engine.decode(prompt, config)?;
        println!("{}", output.text);
        (output.tokens_generated, Some(output.stop_reason))
    };

    if !quiet {
        eprintln!();
        eprintln!(
            "{} tokens, stopped: {}",
            tokens,
            stop_reason.map_or_else(|| "unknown".to_string(), |r| r.to_string())
        );
    }
    Ok(())
}

pub fn format_bytes(bytes: u64) -> String {
    const GB: u64 = 1024 * 1024 * 1024;
    const MB: u64 = 1024 * 1024;
    const KB: u64 = 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    }
}

pub fn dir_size(path: &Path) -> Result<u64> {
    let mut size = 0;
    for entry in walkdir::WalkDir::new(path) {
        let entry = entry?;
        if entry.file_type().is_file() {
            size += entry.metadata()?.len();
        }
    }
    Ok(size)
}

//! Image OCR via an external recognizer CLI.

use std::ffi::OsStr;
use std::path::Path;

use crate::config::ToolsConfig;
use crate::runner;

/// Runs the OCR tool on an image and returns the recognized plain text.
///
/// The recognizer prints one detection per line as bounding box, confidence,
/// and text separated by tabs; only the text column is kept.
pub fn image_to_text(tools: &ToolsConfig, path: &Path) -> String {
    let outcome = runner::capture(
        tools.ocr.as_str(),
        &[OsStr::new("-i"), path.as_os_str()],
    );
    if !outcome.exit_observed {
        return format!("[failed to launch OCR tool '{}']", tools.ocr);
    }
    strip_detection_columns(&outcome.text)
}

/// Keeps only the text after the last tab of each line, dropping bounding box
/// and confidence columns. Lines without tabs pass through as-is.
fn strip_detection_columns(raw: &str) -> String {
    let mut joined = String::new();
    for line in raw.lines() {
        let line = line.trim();
        let text = match line.rfind('\t') {
            Some(tab) => line[tab + 1..].trim(),
            None => line,
        };
        if text.is_empty() {
            continue;
        }
        joined.push_str(text);
        joined.push('\n');
    }
    joined
}

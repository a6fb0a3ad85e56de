//! PDF/DOCX to plain text via external converters.

use std::ffi::OsStr;
use std::path::Path;

use crate::config::ToolsConfig;
use crate::runner;
use crate::tools::extension_lower;

/// Converts a document to plain text by running the matching external tool
/// and capturing its stdout. Failures come back as bracketed notice text, not
/// errors; the caller always has something to show the user.
pub fn document_to_text(tools: &ToolsConfig, path: &Path) -> String {
    let (program, args): (&str, Vec<&OsStr>) = match extension_lower(path).as_deref() {
        Some("pdf") => (
            tools.pdftotext.as_str(),
            vec![
                OsStr::new("-layout"),
                OsStr::new("-enc"),
                OsStr::new("UTF-8"),
                path.as_os_str(),
                OsStr::new("-"),
            ],
        ),
        Some("docx") => (
            tools.pandoc.as_str(),
            vec![OsStr::new("-t"), OsStr::new("plain"), path.as_os_str()],
        ),
        other => {
            return format!("[unsupported file type: {}]", other.unwrap_or(""));
        }
    };

    let outcome = runner::capture(program, &args);
    if !outcome.exit_observed {
        return format!("[failed to launch converter '{}']", program);
    }
    outcome.text
}

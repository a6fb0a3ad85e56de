//! Retrieval knowledge base: index building and query-time prompt rewriting,
//! both through external Python-based tools.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::ToolsConfig;
use crate::runner;
use crate::tools::{convert, is_document};

/// UTF-8 console switches for the Python-based retrieval tools, scoped to the
/// child process.
const PY_UTF8_ENV: &[(&str, &str)] = &[("PYTHONUTF8", "1"), ("PYTHONIOENCODING", "utf-8")];

/// Imports one file into the knowledge base and returns the index builder's
/// log for display. PDF/DOCX inputs are converted to a temporary UTF-8 text
/// file first; plain text is indexed in place.
pub fn import_document(tools: &ToolsConfig, path: &Path) -> String {
    if let Err(err) = fs::create_dir_all(&tools.kb_dir) {
        return format!("[failed to create kb dir '{}': {}]", tools.kb_dir.display(), err);
    }

    let converted = if is_document(path) {
        let text = convert::document_to_text(tools, path);
        match write_temp_text(&text) {
            Ok(tmp) => Some(tmp),
            Err(err) => return format!("[failed to stage text for indexing: {}]", err),
        }
    } else {
        None
    };
    let input = converted.as_deref().unwrap_or(path);

    let mut args: Vec<&OsStr> = vec![
        input.as_os_str(),
        OsStr::new("--kb"),
        tools.kb_dir.as_os_str(),
    ];
    // First build of the kb starts from scratch.
    if needs_fresh_index(&tools.kb_dir) {
        args.push(OsStr::new("--fresh"));
    }

    let outcome = runner::capture_with_env(tools.index_docs.as_str(), &args, PY_UTF8_ENV);

    if let Some(tmp) = converted {
        if let Err(err) = fs::remove_file(&tmp) {
            warn!(path = %tmp.display(), error = %err, "failed to remove staged text");
        }
    }

    if !outcome.exit_observed {
        return format!("[failed to launch index builder '{}']", tools.index_docs);
    }
    outcome.text
}

/// Rewrites a user prompt through the retrieval query tool; its captured
/// stdout (the prompt enriched with search results) becomes the final prompt.
/// Falls back to the original prompt when the tool cannot run.
pub fn query(tools: &ToolsConfig, prompt: &str) -> String {
    let args: Vec<&OsStr> = vec![
        OsStr::new(prompt),
        OsStr::new("--kb"),
        tools.kb_dir.as_os_str(),
    ];
    let outcome = runner::capture_with_env(tools.rag_query.as_str(), &args, PY_UTF8_ENV);
    if !outcome.exit_observed {
        warn!(tool = %tools.rag_query, "retrieval query unavailable; passing prompt through");
        return prompt.to_string();
    }
    debug!(bytes = outcome.text.len(), "retrieval query produced prompt");
    outcome.text
}

/// The kb starts fresh until the index file exists.
fn needs_fresh_index(kb_dir: &Path) -> bool {
    !kb_dir.join("faiss.index").exists()
}

/// Stages converted document text as a temporary UTF-8 file for the indexer.
fn write_temp_text(text: &str) -> std::io::Result<PathBuf> {
    let path = std::env::temp_dir().join(format!(
        "llamadesk-import-{}-{}.txt",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    ));
    fs::write(&path, text.as_bytes())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_index_until_index_file_exists() {
        let dir = tempfile::tempdir().unwrap();
        assert!(needs_fresh_index(dir.path()));
        fs::write(dir.path().join("faiss.index"), b"").unwrap();
        assert!(!needs_fresh_index(dir.path()));
    }

    #[test]
    fn temp_text_round_trip() {
        let path = write_temp_text("staged content").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "staged content");
        fs::remove_file(path).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn query_falls_back_to_prompt() {
        let tools = ToolsConfig {
            rag_query: "/nonexistent/llamadesk-rag-query".to_string(),
            ..Default::default()
        };
        assert_eq!(query(&tools, "what is rust"), "what is rust");
    }

    #[cfg(unix)]
    #[test]
    fn import_reports_missing_builder() {
        let dir = tempfile::tempdir().unwrap();
        let tools = ToolsConfig {
            index_docs: "/nonexistent/llamadesk-index-docs".to_string(),
            kb_dir: dir.path().join("kb"),
            ..Default::default()
        };
        let note = import_document(&tools, Path::new("notes.txt"));
        assert!(note.starts_with("[failed to launch index builder"));
        // kb dir is still created so a later attempt can succeed
        assert!(tools.kb_dir.is_dir());
    }
}

//! One-shot external collaborators built on [`crate::runner`].
//!
//! Each of these blocks the calling thread for the duration of the external
//! tool; the console signals a working state around them.

pub mod convert;
pub mod ocr;
pub mod rag;
pub mod speech;

use std::path::Path;

/// Lowercased extension of `path`, if any.
pub fn extension_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Extensions handled by the document converters.
pub fn is_document(path: &Path) -> bool {
    matches!(extension_lower(path).as_deref(), Some("pdf") | Some("docx"))
}

/// Extensions handled by the OCR tool.
pub fn is_image(path: &Path) -> bool {
    matches!(
        extension_lower(path).as_deref(),
        Some("png") | Some("jpg") | Some("jpeg") | Some("bmp") | Some("tif") | Some("tiff")
    )
}

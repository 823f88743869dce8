//! Plain-text export of drafted documents.
//!
//! Writes go to a temp file beside the target and are renamed into place,
//! so an interrupted export never leaves a half-written draft.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use normdraft_shared::{DraftError, GeneratedDocument, Result};

/// Write `document` as UTF-8 plain text: for each section a blank line,
/// `# <title>`, a blank line, then the body. No other framing.
#[instrument(skip_all, fields(path = %path.display(), sections = document.sections.len()))]
pub fn export_document(document: &GeneratedDocument, path: &Path) -> Result<PathBuf> {
    let rendered = document.render();
    write_text(path, &rendered)?;
    info!(
        bytes = rendered.len(),
        failed = document.failed_sections(),
        "document exported"
    );
    Ok(path.to_path_buf())
}

/// Write free text (e.g. a one-shot draft) the same way.
pub fn export_text(text: &str, path: &Path) -> Result<PathBuf> {
    write_text(path, text)?;
    info!(path = %path.display(), bytes = text.len(), "draft exported");
    Ok(path.to_path_buf())
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DraftError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| DraftError::validation(format!("not a file path: {}", path.display())))?;
    let temp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    std::fs::write(&temp, content).map_err(|e| DraftError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| DraftError::io(path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

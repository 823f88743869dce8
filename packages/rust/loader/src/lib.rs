//! Document loading: turn uploaded artifacts into plain text.
//!
//! Plain text is decoded here. PDF and DOCX parsing is delegated to
//! extractors injected by the host through [`PdfTextExtractor`] and
//! [`DocxTextExtractor`]; this crate only owns how their output is joined.
//! A failed source never aborts a batch: [`DocumentLoader::load_all`]
//! substitutes empty text and records the failure.

mod format;

use std::path::Path;

use normdraft_shared::{DraftError, Result, SourceText};
use tracing::{debug, info, instrument, warn};

pub use format::ArtifactFormat;

/// Maximum artifact size we accept (50 MB).
const MAX_ARTIFACT_SIZE: usize = 50 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// A named binary or text upload.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Original file name; its extension selects the decoder.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read an artifact from disk, named after the file's base name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let size = std::fs::metadata(path)
            .map_err(|e| DraftError::load(&name, e.to_string()))?
            .len();
        if size > MAX_ARTIFACT_SIZE as u64 {
            return Err(too_large(&name, size));
        }

        let bytes = std::fs::read(path).map_err(|e| DraftError::load(&name, e.to_string()))?;
        Ok(Self { name, bytes })
    }

    pub fn format(&self) -> ArtifactFormat {
        ArtifactFormat::from_name(&self.name)
    }
}

fn too_large(name: &str, size: u64) -> DraftError {
    DraftError::load(
        name,
        format!("artifact too large ({size} bytes, max {MAX_ARTIFACT_SIZE})"),
    )
}

// ---------------------------------------------------------------------------
// Extractor seams
// ---------------------------------------------------------------------------

/// Extracts the text layer of a portable document, one string per page.
pub trait PdfTextExtractor: Send + Sync {
    fn pages(&self, bytes: &[u8]) -> std::result::Result<Vec<String>, String>;
}

/// Extracts the paragraphs of a word-processing document.
pub trait DocxTextExtractor: Send + Sync {
    fn paragraphs(&self, bytes: &[u8]) -> std::result::Result<Vec<String>, String>;
}

// ---------------------------------------------------------------------------
// Load report
// ---------------------------------------------------------------------------

/// A source that could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub label: String,
    pub message: String,
}

/// Outcome of loading a batch of artifacts.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// One entry per artifact, in input order. Failed ones carry empty text.
    pub sources: Vec<SourceText>,
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn push(&mut self, label: &str, text: Result<String>) {
        let text = match text {
            Ok(text) => text,
            Err(e) => {
                warn!(source = label, error = %e, "source could not be read, using empty text");
                self.failures.push(LoadFailure {
                    label: label.to_string(),
                    message: e.to_string(),
                });
                String::new()
            }
        };
        self.sources.push(SourceText::new(label, text));
    }

    fn log_summary(&self) {
        info!(
            sources = self.sources.len(),
            failures = self.failures.len(),
            "artifacts loaded"
        );
    }
}

// ---------------------------------------------------------------------------
// DocumentLoader
// ---------------------------------------------------------------------------

/// Converts artifacts to plain text according to their format.
#[derive(Default)]
pub struct DocumentLoader {
    pdf: Option<Box<dyn PdfTextExtractor>>,
    docx: Option<Box<dyn DocxTextExtractor>>,
}

impl DocumentLoader {
    /// A loader that handles plain text only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable PDF support with the given extractor.
    pub fn with_pdf(mut self, extractor: impl PdfTextExtractor + 'static) -> Self {
        self.pdf = Some(Box::new(extractor));
        self
    }

    /// Enable DOCX support with the given extractor.
    pub fn with_docx(mut self, extractor: impl DocxTextExtractor + 'static) -> Self {
        self.docx = Some(Box::new(extractor));
        self
    }

    /// Extract plain text from a single artifact.
    #[instrument(skip_all, fields(name = %artifact.name, bytes = artifact.bytes.len()))]
    pub fn load(&self, artifact: &Artifact) -> Result<String> {
        if artifact.bytes.len() > MAX_ARTIFACT_SIZE {
            return Err(too_large(&artifact.name, artifact.bytes.len() as u64));
        }

        let format = artifact.format();
        debug!(format = format.as_str(), "extracting text");

        let text = match format {
            ArtifactFormat::PlainText => decode_plain_text(&artifact.bytes),
            ArtifactFormat::Pdf => {
                let extractor = self.pdf.as_ref().ok_or_else(|| {
                    DraftError::load(&artifact.name, "no PDF extractor configured")
                })?;
                let pages = extractor
                    .pages(&artifact.bytes)
                    .map_err(|e| DraftError::load(&artifact.name, e))?;
                join_pages(&pages)
            }
            ArtifactFormat::Docx => {
                let extractor = self.docx.as_ref().ok_or_else(|| {
                    DraftError::load(&artifact.name, "no DOCX extractor configured")
                })?;
                let paragraphs = extractor
                    .paragraphs(&artifact.bytes)
                    .map_err(|e| DraftError::load(&artifact.name, e))?;
                join_paragraphs(&paragraphs)
            }
            ArtifactFormat::Unsupported(ext) => {
                return Err(DraftError::load(
                    &artifact.name,
                    format!("unsupported file type '.{ext}' (expected pdf, docx or txt)"),
                ));
            }
        };

        Ok(text)
    }

    /// Load every artifact in order. Failures are logged and recorded, and
    /// the source is kept with empty text so processing continues.
    #[instrument(skip_all, fields(count = artifacts.len()))]
    pub fn load_all(&self, artifacts: &[Artifact]) -> LoadReport {
        let mut report = LoadReport::default();
        for artifact in artifacts {
            report.push(&artifact.name, self.load(artifact));
        }
        report.log_summary();
        report
    }

    /// Read the given files from disk and load them in order. Unreadable
    /// files are reported like any other load failure.
    #[instrument(skip_all, fields(count = paths.len()))]
    pub fn load_paths<P: AsRef<Path>>(&self, paths: &[P]) -> LoadReport {
        let mut report = LoadReport::default();
        for path in paths {
            let path = path.as_ref();
            let label = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            let text = Artifact::from_path(path).and_then(|a| self.load(&a));
            report.push(&label, text);
        }
        report.log_summary();
        report
    }
}

/// Decode bytes as UTF-8, substituting U+FFFD for invalid sequences.
pub fn decode_plain_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Concatenate extracted page text with no separator.
fn join_pages(pages: &[String]) -> String {
    pages.concat()
}

/// Concatenate paragraphs, each terminated by a newline.
fn join_paragraphs(paragraphs: &[String]) -> String {
    let mut out = String::new();
    for p in paragraphs {
        out.push_str(p);
        out.push('\n');
    }
    out
}

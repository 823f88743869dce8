//! Artifact format detection.

use std::path::Path;

/// Encodings the loader knows how to turn into plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactFormat {
    /// Portable document; text is extracted per page.
    Pdf,
    /// Word-processing document; text is extracted per paragraph.
    Docx,
    /// Plain text (`.txt`, `.md`), decoded as UTF-8.
    PlainText,
    /// Anything else, carrying the offending extension.
    Unsupported(String),
}

impl ArtifactFormat {
    /// Detect the format from an artifact name's extension (case-insensitive).
    pub fn from_name(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "txt" | "md" => Self::PlainText,
            _ => Self::Unsupported(ext),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::PlainText => "plain_text",
            Self::Unsupported(_) => "unsupported",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_extensions() {
        assert_eq!(ArtifactFormat::from_name("ley.pdf"), ArtifactFormat::Pdf);
        assert_eq!(ArtifactFormat::from_name("Modelo.DOCX"), ArtifactFormat::Docx);
        assert_eq!(ArtifactFormat::from_name("notes.txt"), ArtifactFormat::PlainText);
        assert_eq!(ArtifactFormat::from_name("README.md"), ArtifactFormat::PlainText);
    }

    #[test]
    fn unknown_or_missing_extension_is_unsupported() {
        assert_eq!(
            ArtifactFormat::from_name("sheet.xlsx"),
            ArtifactFormat::Unsupported("xlsx".into())
        );
        assert_eq!(
            ArtifactFormat::from_name("LICENSE"),
            ArtifactFormat::Unsupported(String::new())
        );
    }
}

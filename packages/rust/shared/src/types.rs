//! Core domain types for a drafting session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one interactive drafting session (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a new session identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// ApiKey
// ---------------------------------------------------------------------------

/// Completion-service credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for the `Authorization` header only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

// ---------------------------------------------------------------------------
// Corpora
// ---------------------------------------------------------------------------

/// Plain text extracted from one uploaded artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceText {
    /// Original artifact name (e.g. `ley-29733.pdf`).
    pub label: String,
    /// Extracted text; empty when extraction failed.
    pub text: String,
}

impl SourceText {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// Which upload category a corpus came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorpusKind {
    /// Mandatory regulatory sources.
    Norms,
    /// Optional style-only examples.
    Models,
}

impl CorpusKind {
    /// Label used in the start/end markers.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Norms => "NORM",
            Self::Models => "MODEL",
        }
    }
}

/// An ordered, immutable collection of sources from one upload category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    pub kind: CorpusKind,
    sources: Vec<SourceText>,
}

impl Corpus {
    pub fn new(kind: CorpusKind, sources: Vec<SourceText>) -> Self {
        Self { kind, sources }
    }

    pub fn empty(kind: CorpusKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn sources(&self) -> &[SourceText] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Concatenate all sources in order, each wrapped in start/end markers
    /// carrying its original name.
    pub fn marked(&self) -> String {
        let marker = self.kind.marker();
        self.sources
            .iter()
            .map(|s| {
                format!(
                    "\n--- START {marker}: {label} ---\n{text}\n--- END {marker}: {label} ---\n",
                    label = s.label,
                    text = s.text,
                )
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Curated rows
// ---------------------------------------------------------------------------

/// One atomic obligation, prohibition or principle extracted from the norms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub text: String,
    #[serde(default = "default_included")]
    pub included: bool,
}

impl Requirement {
    /// A freshly extracted requirement, included by default.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            included: true,
        }
    }
}

/// One section of the proposed document outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSpec {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_included")]
    pub included: bool,
}

impl SectionSpec {
    /// A freshly proposed section, included by default.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            included: true,
        }
    }
}

fn default_included() -> bool {
    true
}

// ---------------------------------------------------------------------------
// GeneratedDocument
// ---------------------------------------------------------------------------

/// The drafted body of one curated section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftedSection {
    pub title: String,
    pub body: String,
    /// Set when `body` is an inline error message instead of prose.
    #[serde(default)]
    pub failed: bool,
}

/// The assembled draft, in curated section order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub sections: Vec<DraftedSection>,
    /// Model that produced the prose.
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

impl GeneratedDocument {
    /// Number of sections whose body is an error message.
    pub fn failed_sections(&self) -> usize {
        self.sections.iter().filter(|s| s.failed).count()
    }

    /// Plain-text rendering used for display and export: each section as a
    /// blank line, `# <title>`, a blank line, then its body.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push_str("\n\n# ");
            out.push_str(&section.title);
            out.push_str("\n\n");
            out.push_str(&section.body);
        }
        out
    }
}

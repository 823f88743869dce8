//! Context-window budgeting for marked corpora.

use normdraft_shared::{Corpus, CorpusKind, SourceText};

/// The two corpora of a session, built from uploaded sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpora {
    pub norms: Corpus,
    pub models: Corpus,
}

impl Corpora {
    pub fn new(norms: Vec<SourceText>, models: Vec<SourceText>) -> Self {
        Self {
            norms: Corpus::new(CorpusKind::Norms, norms),
            models: Corpus::new(CorpusKind::Models, models),
        }
    }
}

impl Default for Corpora {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

/// Keep at most `max_chars` characters of `text`.
///
/// Hard cutoff on a char boundary: no summary, no trailer. Applied after
/// marker concatenation, so a cut source shows up as a missing END marker.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Marked corpus text cut to `max_chars`.
pub fn budgeted(corpus: &Corpus, max_chars: usize) -> String {
    let marked = corpus.marked();
    let cut = truncate_chars(&marked, max_chars);
    if cut.len() < marked.len() {
        tracing::debug!(
            kind = corpus.kind.marker(),
            max_chars,
            dropped_bytes = marked.len() - cut.len(),
            "corpus truncated to budget"
        );
    }
    cut.to_string()
}

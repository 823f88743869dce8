//! Requirement Extractor: norms corpus to an ordered list of obligations.

use tracing::{debug, info, instrument, warn};

use normdraft_completion::CompletionService;
use normdraft_shared::{Corpus, DraftSettings, Requirement};

use crate::corpus::budgeted;
use crate::prompts::extraction_request;
use crate::sanitize::parse_bullet_list;

/// What the extractor produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Extracted(Vec<Requirement>),
    Failed { reason: String },
}

impl ExtractionOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Rows for the review table. A failure becomes a single row carrying the
    /// reason, so the reviewer sees it at the next checkpoint.
    pub fn into_rows(self) -> Vec<Requirement> {
        match self {
            Self::Extracted(rows) => rows,
            Self::Failed { reason } => {
                vec![Requirement::new(format!("Error extracting requirements: {reason}"))]
            }
        }
    }
}

/// Extract requirements from the marked norms corpus.
///
/// The corpus is marked, then cut to `limits.extraction_norms_chars`. One
/// completion call; no retries.
#[instrument(skip_all, fields(sources = norms.sources().len()))]
pub async fn extract_requirements(
    service: &dyn CompletionService,
    norms: &Corpus,
    settings: &DraftSettings,
) -> ExtractionOutcome {
    let text = budgeted(norms, settings.limits.extraction_norms_chars);
    let request = extraction_request(&text, settings);
    debug!(prompt_chars = request.user.chars().count(), "requesting requirement extraction");

    let completion = match service.complete(&request).await {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "requirement extraction failed");
            return ExtractionOutcome::Failed {
                reason: e.to_string(),
            };
        }
    };

    let items = parse_bullet_list(&completion.text);
    if items.is_empty() {
        warn!("requirement extraction returned no items");
        return ExtractionOutcome::Failed {
            reason: "the model returned no requirements".into(),
        };
    }

    info!(
        count = items.len(),
        tokens_out = completion.tokens_out,
        "requirements extracted"
    );
    ExtractionOutcome::Extracted(items.into_iter().map(Requirement::new).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedService;
    use normdraft_shared::{CorpusKind, SourceText};

    fn norms(text: &str) -> Corpus {
        Corpus::new(CorpusKind::Norms, vec![SourceText::new("law.txt", text)])
    }

    #[tokio::test]
    async fn bullets_become_included_rows() {
        let service = ScriptedService::replying(
            "- Every document must state a retention period.\n\n* Personal data must not be shared.\n",
        );
        let outcome = extract_requirements(
            &service,
            &norms("Art.1: All documents must state a retention period."),
            &DraftSettings::default(),
        )
        .await;

        let ExtractionOutcome::Extracted(rows) = outcome else {
            panic!("expected extracted rows");
        };
        assert_eq!(rows.len(), 2);
        assert!(rows[0].text.contains("retention period"));
        assert!(rows.iter().all(|r| r.included));
        assert!(rows.iter().all(|r| !r.text.starts_with(['-', '*'])));
        assert!(rows.iter().all(|r| !r.text.trim().is_empty()));
    }

    #[tokio::test]
    async fn request_is_deterministic_and_marked() {
        let service = ScriptedService::replying("- x");
        extract_requirements(&service, &norms("BODY"), &DraftSettings::default()).await;

        let calls = service.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].temperature, 0.0);
        assert!(calls[0].user.contains("--- START NORM: law.txt ---\nBODY\n--- END NORM: law.txt ---"));
    }

    #[tokio::test]
    async fn norms_are_cut_to_exactly_the_budget() {
        let corpus = norms(&"a".repeat(100_000));
        let marked = corpus.marked();
        let service = ScriptedService::replying("- x");
        extract_requirements(&service, &corpus, &DraftSettings::default()).await;

        let user = &service.calls()[0].user;
        let expected: String = marked.chars().take(80_000).collect();
        assert!(user.ends_with(&format!("REFERENCE:\n{expected}")));
        assert!(!user.contains("--- END NORM"));
    }

    #[tokio::test]
    async fn service_fault_is_a_visible_row() {
        let service = ScriptedService::failing("HTTP 429: rate limited");
        let outcome = extract_requirements(&service, &norms("x"), &DraftSettings::default()).await;
        assert!(outcome.is_failed());

        let rows = outcome.into_rows();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].text.contains("rate limited"));
        assert!(rows[0].included);
    }

    #[tokio::test]
    async fn blank_response_is_a_failure() {
        let service = ScriptedService::replying("\n  \n- \n");
        let outcome = extract_requirements(&service, &norms("x"), &DraftSettings::default()).await;
        assert_eq!(
            outcome,
            ExtractionOutcome::Failed {
                reason: "the model returned no requirements".into()
            }
        );
    }
}

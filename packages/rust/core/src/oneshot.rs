//! Whole-document drafting in a single completion call.
//!
//! Skips extraction and outline review entirely. Output is shorter and less
//! specific than the section-by-section path; kept for quick first drafts.

use tracing::{info, instrument, warn};

use normdraft_completion::CompletionService;
use normdraft_shared::{Corpus, DraftSettings};

use crate::corpus::budgeted;
use crate::prompts::oneshot_request;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneShotOutcome {
    Drafted(String),
    Failed { reason: String },
}

impl OneShotOutcome {
    /// Display text: the draft, or an error line in its place.
    pub fn into_text(self) -> String {
        match self {
            Self::Drafted(text) => text,
            Self::Failed { reason } => format!("Error generating document: {reason}"),
        }
    }
}

/// Draft a complete document from `reference` and the user's intent.
///
/// The marked reference text is cut to `limits.oneshot_reference_chars`.
#[instrument(skip_all, fields(sources = reference.sources().len()))]
pub async fn draft_whole_document(
    service: &dyn CompletionService,
    reference: &Corpus,
    intent: &str,
    settings: &DraftSettings,
) -> OneShotOutcome {
    if intent.trim().is_empty() {
        return OneShotOutcome::Failed {
            reason: "describe the document you want drafted".into(),
        };
    }

    let text = budgeted(reference, settings.limits.oneshot_reference_chars);
    let request = oneshot_request(&text, intent.trim(), settings);

    match service.complete(&request).await {
        Ok(c) if !c.text.trim().is_empty() => {
            info!(tokens_out = c.tokens_out, latency_ms = c.latency_ms, "document drafted in one shot");
            OneShotOutcome::Drafted(c.text.trim().to_string())
        }
        Ok(_) => {
            warn!("one-shot draft came back empty");
            OneShotOutcome::Failed {
                reason: "the model returned an empty document".into(),
            }
        }
        Err(e) => {
            warn!(error = %e, "one-shot draft failed");
            OneShotOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

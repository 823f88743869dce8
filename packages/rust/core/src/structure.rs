//! Structure Proposer: curated requirements and intent to a section outline.

use tracing::{debug, info, instrument, warn};

use normdraft_completion::CompletionService;
use normdraft_shared::{Corpus, DraftSettings, Requirement, SectionSpec};

use crate::corpus::budgeted;
use crate::prompts::structure_request;
use crate::sanitize::parse_section_list;

/// Title of the pseudo-section that carries a proposal failure.
pub const ERROR_SECTION_TITLE: &str = "Error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureOutcome {
    Proposed(Vec<SectionSpec>),
    Failed { reason: String },
}

impl StructureOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Rows for the review table; never empty.
    pub fn into_rows(self) -> Vec<SectionSpec> {
        match self {
            Self::Proposed(rows) => rows,
            Self::Failed { reason } => vec![SectionSpec::new(ERROR_SECTION_TITLE, reason)],
        }
    }
}

/// Propose an outline covering `requirements`.
///
/// `requirements` is the curated list; it is rendered verbatim, in order.
/// The models corpus is cut to `limits.structure_models_chars`.
#[instrument(skip_all, fields(requirements = requirements.len(), models = models.sources().len()))]
pub async fn propose_structure(
    service: &dyn CompletionService,
    requirements: &[Requirement],
    intent: &str,
    models: &Corpus,
    settings: &DraftSettings,
) -> StructureOutcome {
    let models_text = budgeted(models, settings.limits.structure_models_chars);
    let request = structure_request(requirements, intent, &models_text, settings);
    debug!(prompt_chars = request.user.chars().count(), "requesting structure proposal");

    let completion = match service.complete(&request).await {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "structure proposal failed");
            return StructureOutcome::Failed {
                reason: e.to_string(),
            };
        }
    };

    match parse_section_list(&completion.text) {
        Ok(sections) => {
            info!(count = sections.len(), "structure proposed");
            StructureOutcome::Proposed(sections)
        }
        Err(e) => {
            warn!(error = %e, "structure proposal was malformed");
            StructureOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

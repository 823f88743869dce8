//! Pipeline State Machine: the four-stage drafting wizard.
//!
//! `Intake(1) → RequirementReview(2) → StructureReview(3) → Drafted(4)`,
//! plus `reset` back to a fresh session from anywhere. Every forward
//! transition is gated; a refused transition returns a [`GateError`] and
//! leaves the state exactly as it was. Generation failures never refuse a
//! transition: they arrive at the next review stage as visible rows or text.

use std::fmt;

use tracing::{info, instrument, warn};

use normdraft_completion::CompletionService;
use normdraft_shared::{
    DraftSettings, GeneratedDocument, Requirement, SectionSpec, SessionId, SourceText,
};

use crate::corpus::Corpora;
use crate::drafter::{DraftProgress, draft_document};
use crate::requirements::{ExtractionOutcome, extract_requirements};
use crate::structure::{StructureOutcome, propose_structure};

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    #[default]
    Intake,
    RequirementReview,
    StructureReview,
    Drafted,
}

impl Stage {
    /// 1-based stage number as shown to the user.
    pub fn number(self) -> u8 {
        match self {
            Self::Intake => 1,
            Self::RequirementReview => 2,
            Self::StructureReview => 3,
            Self::Drafted => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::RequirementReview => "requirement review",
            Self::StructureReview => "structure review",
            Self::Drafted => "drafted",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.label())
    }
}

// ---------------------------------------------------------------------------
// State and gate errors
// ---------------------------------------------------------------------------

/// Everything one session knows. Owned by the [`Wizard`].
///
/// `requirements` holds the review table while at `RequirementReview` and
/// the frozen curated list afterwards; `structure` likewise for sections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineState {
    pub stage: Stage,
    pub corpora: Corpora,
    pub intent: String,
    pub requirements: Vec<Requirement>,
    pub structure: Vec<SectionSpec>,
    pub document: Option<GeneratedDocument>,
}

/// Why a transition or curation action was refused.
///
/// `Display` is the user-visible validation message. Row numbers are shown
/// 1-based, as in the review tables.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("no completion-service credential is configured; set an API key first")]
    MissingCredential,

    #[error("upload at least one norms document")]
    NoNormSources,

    #[error("describe the document you want drafted")]
    EmptyIntent,

    #[error("select at least one requirement before continuing")]
    NoRequirementsSelected,

    #[error("select at least one section before generating")]
    NoSectionsSelected,

    #[error("this action belongs to stage {expected}, but the session is at stage {actual}")]
    WrongStage { expected: Stage, actual: Stage },

    #[error("there is no row {}", .index + 1)]
    NoSuchRow { index: usize },

    #[error("row {} is blank; give it some text", .index + 1)]
    BlankRow { index: usize },

    #[error("already at the first stage")]
    AtFirstStage,
}

/// How a forward transition went. The stage advances either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Clean,
    /// The new stage's content carries error text the reviewer must see.
    Degraded { reason: String },
}

impl Advance {
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }
}

/// Uploads and intent submitted at `Intake`.
#[derive(Debug, Clone, Default)]
pub struct IntakeRequest {
    pub norms: Vec<SourceText>,
    pub models: Vec<SourceText>,
    pub intent: String,
}

// ---------------------------------------------------------------------------
// Wizard
// ---------------------------------------------------------------------------

/// Drives one session through the pipeline.
pub struct Wizard<S> {
    session_id: SessionId,
    service: Option<S>,
    settings: DraftSettings,
    state: PipelineState,
}

impl<S: CompletionService> Wizard<S> {
    /// Start a session. `service` is `None` until a credential is available.
    pub fn new(service: Option<S>, settings: DraftSettings) -> Self {
        let session_id = SessionId::new();
        info!(session = %session_id, has_credential = service.is_some(), "session started");
        Self {
            session_id,
            service,
            settings,
            state: PipelineState::default(),
        }
    }

    pub fn set_service(&mut self, service: S) {
        self.service = Some(service);
    }

    pub fn has_credential(&self) -> bool {
        self.service.is_some()
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn settings(&self) -> &DraftSettings {
        &self.settings
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    pub fn document(&self) -> Option<&GeneratedDocument> {
        self.state.document.as_ref()
    }

    fn expect_stage(&self, expected: Stage) -> Result<(), GateError> {
        if self.state.stage == expected {
            Ok(())
        } else {
            Err(GateError::WrongStage {
                expected,
                actual: self.state.stage,
            })
        }
    }

    fn require_service(&self) -> Result<&S, GateError> {
        self.service.as_ref().ok_or(GateError::MissingCredential)
    }

    // -- forward transitions ------------------------------------------------

    /// `Intake → RequirementReview`: store the corpora and intent, then
    /// extract requirements from the norms.
    #[instrument(skip_all, fields(session = %self.session_id))]
    pub async fn submit_intake(&mut self, intake: IntakeRequest) -> Result<Advance, GateError> {
        self.expect_stage(Stage::Intake)?;
        let service = self.require_service()?;
        if intake.norms.is_empty() {
            return Err(GateError::NoNormSources);
        }
        let intent = intake.intent.trim();
        if intent.is_empty() {
            return Err(GateError::EmptyIntent);
        }

        let corpora = Corpora::new(intake.norms, intake.models);
        let outcome = extract_requirements(service, &corpora.norms, &self.settings).await;
        let advance = match &outcome {
            ExtractionOutcome::Failed { reason } => {
                warn!("extraction failed; the error is shown as a requirement row");
                Advance::Degraded {
                    reason: reason.clone(),
                }
            }
            ExtractionOutcome::Extracted(_) => Advance::Clean,
        };

        self.state.intent = intent.to_string();
        self.state.corpora = corpora;
        self.state.requirements = outcome.into_rows();
        self.state.structure.clear();
        self.state.document = None;
        self.advance(Stage::RequirementReview);
        Ok(advance)
    }

    /// `RequirementReview → StructureReview`: freeze the included rows and
    /// propose an outline from them.
    #[instrument(skip_all, fields(session = %self.session_id))]
    pub async fn approve_requirements(&mut self) -> Result<Advance, GateError> {
        self.expect_stage(Stage::RequirementReview)?;
        let service = self.require_service()?;
        let blank = |r: &Requirement| r.included && r.text.trim().is_empty();
        if let Some(index) = self.state.requirements.iter().position(blank) {
            return Err(GateError::BlankRow { index });
        }
        let curated: Vec<Requirement> = self
            .state
            .requirements
            .iter()
            .filter(|r| r.included)
            .cloned()
            .collect();
        if curated.is_empty() {
            return Err(GateError::NoRequirementsSelected);
        }

        let outcome = propose_structure(
            service,
            &curated,
            &self.state.intent,
            &self.state.corpora.models,
            &self.settings,
        )
        .await;
        let advance = match &outcome {
            StructureOutcome::Failed { reason } => {
                warn!("structure proposal failed; the error is shown as a section row");
                Advance::Degraded {
                    reason: reason.clone(),
                }
            }
            StructureOutcome::Proposed(_) => Advance::Clean,
        };

        self.state.requirements = curated;
        self.state.structure = outcome.into_rows();
        self.state.document = None;
        self.advance(Stage::StructureReview);
        Ok(advance)
    }

    /// `StructureReview → Drafted`: freeze the included sections and draft
    /// each one, in order.
    #[instrument(skip_all, fields(session = %self.session_id))]
    pub async fn generate(&mut self, progress: &dyn DraftProgress) -> Result<Advance, GateError> {
        self.expect_stage(Stage::StructureReview)?;
        let service = self.require_service()?;
        let blank = |s: &SectionSpec| s.included && s.title.trim().is_empty();
        if let Some(index) = self.state.structure.iter().position(blank) {
            return Err(GateError::BlankRow { index });
        }
        let curated: Vec<SectionSpec> = self
            .state
            .structure
            .iter()
            .filter(|s| s.included)
            .cloned()
            .collect();
        if curated.is_empty() {
            return Err(GateError::NoSectionsSelected);
        }

        let document = draft_document(
            service,
            &curated,
            &self.state.requirements,
            &self.state.corpora.norms,
            &self.state.corpora.models,
            &self.settings,
            progress,
        )
        .await;
        let failed = document.failed_sections();
        let advance = if failed == 0 {
            Advance::Clean
        } else {
            Advance::Degraded {
                reason: format!("{failed} of {} sections failed", document.sections.len()),
            }
        };

        self.state.structure = curated;
        self.state.document = Some(document);
        self.advance(Stage::Drafted);
        Ok(advance)
    }

    fn advance(&mut self, to: Stage) {
        let from = self.state.stage;
        self.state.stage = to;
        info!(
            session = %self.session_id,
            from = from.number(),
            to = to.number(),
            requirements = self.state.requirements.len(),
            sections = self.state.structure.len(),
            "stage changed"
        );
    }

    // -- backward transitions -----------------------------------------------

    /// Step back one stage, discarding what that stage produced.
    ///
    /// From `RequirementReview` the requirements go (corpora and intent
    /// stay); from `StructureReview` the outline and any document go; from
    /// `Drafted` only the document goes.
    #[instrument(skip_all, fields(session = %self.session_id))]
    pub fn back(&mut self) -> Result<Stage, GateError> {
        let to = match self.state.stage {
            Stage::Intake => return Err(GateError::AtFirstStage),
            Stage::RequirementReview => {
                self.state.requirements.clear();
                self.state.structure.clear();
                self.state.document = None;
                Stage::Intake
            }
            Stage::StructureReview => {
                self.state.structure.clear();
                self.state.document = None;
                Stage::RequirementReview
            }
            Stage::Drafted => {
                self.state.document = None;
                Stage::StructureReview
            }
        };
        self.advance(to);
        Ok(to)
    }

    /// Discard everything: corpora, intent and all derived artifacts.
    #[instrument(skip_all, fields(session = %self.session_id))]
    pub fn reset(&mut self) {
        let from = self.state.stage;
        self.state = PipelineState::default();
        info!(from = from.number(), "session reset");
    }

    // -- requirement curation -----------------------------------------------

    /// Flip a requirement's inclusion; returns the new value.
    pub fn toggle_requirement(&mut self, index: usize) -> Result<bool, GateError> {
        self.expect_stage(Stage::RequirementReview)?;
        let row = row_mut(&mut self.state.requirements, index)?;
        row.included = !row.included;
        Ok(row.included)
    }

    pub fn edit_requirement(&mut self, index: usize, text: &str) -> Result<(), GateError> {
        self.expect_stage(Stage::RequirementReview)?;
        let row = row_mut(&mut self.state.requirements, index)?;
        row.text = non_blank(text, index)?;
        Ok(())
    }

    /// Append a row, included by default.
    pub fn add_requirement(&mut self, text: &str) -> Result<usize, GateError> {
        self.expect_stage(Stage::RequirementReview)?;
        let text = non_blank(text, self.state.requirements.len())?;
        self.state.requirements.push(Requirement::new(text));
        Ok(self.state.requirements.len() - 1)
    }

    pub fn remove_requirement(&mut self, index: usize) -> Result<Requirement, GateError> {
        self.expect_stage(Stage::RequirementReview)?;
        check_index(&self.state.requirements, index)?;
        Ok(self.state.requirements.remove(index))
    }

    // -- section curation ---------------------------------------------------

    pub fn toggle_section(&mut self, index: usize) -> Result<bool, GateError> {
        self.expect_stage(Stage::StructureReview)?;
        let row = row_mut(&mut self.state.structure, index)?;
        row.included = !row.included;
        Ok(row.included)
    }

    pub fn edit_section_title(&mut self, index: usize, title: &str) -> Result<(), GateError> {
        self.expect_stage(Stage::StructureReview)?;
        let row = row_mut(&mut self.state.structure, index)?;
        row.title = non_blank(title, index)?;
        Ok(())
    }

    pub fn edit_section_description(
        &mut self,
        index: usize,
        description: &str,
    ) -> Result<(), GateError> {
        self.expect_stage(Stage::StructureReview)?;
        row_mut(&mut self.state.structure, index)?.description = description.trim().to_string();
        Ok(())
    }

    pub fn add_section(&mut self, title: &str, description: &str) -> Result<usize, GateError> {
        self.expect_stage(Stage::StructureReview)?;
        let title = non_blank(title, self.state.structure.len())?;
        self.state
            .structure
            .push(SectionSpec::new(title, description.trim()));
        Ok(self.state.structure.len() - 1)
    }

    pub fn remove_section(&mut self, index: usize) -> Result<SectionSpec, GateError> {
        self.expect_stage(Stage::StructureReview)?;
        check_index(&self.state.structure, index)?;
        Ok(self.state.structure.remove(index))
    }

    /// Move a section so it ends up at position `to`. Section order is
    /// document order.
    pub fn move_section(&mut self, from: usize, to: usize) -> Result<(), GateError> {
        self.expect_stage(Stage::StructureReview)?;
        check_index(&self.state.structure, from)?;
        check_index(&self.state.structure, to)?;
        let row = self.state.structure.remove(from);
        self.state.structure.insert(to, row);
        Ok(())
    }
}

/// Trimmed `text`, or `BlankRow` if nothing is left.
fn non_blank(text: &str, index: usize) -> Result<String, GateError> {
    let text = text.trim();
    if text.is_empty() {
        Err(GateError::BlankRow { index })
    } else {
        Ok(text.to_string())
    }
}

fn check_index<T>(rows: &[T], index: usize) -> Result<(), GateError> {
    if index < rows.len() {
        Ok(())
    } else {
        Err(GateError::NoSuchRow { index })
    }
}

fn row_mut<T>(rows: &mut [T], index: usize) -> Result<&mut T, GateError> {
    rows.get_mut(index).ok_or(GateError::NoSuchRow { index })
}

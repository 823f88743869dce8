//! Section Drafter: one completion call per curated section.
//!
//! Drafting section by section yields longer, more specific prose than a
//! single whole-document request, at the cost of N calls. Calls run strictly
//! in curated order; a failed section gets inline error text and the run
//! carries on with the rest.

use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use normdraft_completion::CompletionService;
use normdraft_shared::{
    Corpus, DraftSettings, DraftedSection, GeneratedDocument, Requirement, SectionSpec,
};

use crate::corpus::budgeted;
use crate::prompts::section_request;
use crate::sanitize::strip_title_echo;

/// Progress callback for the drafting loop. Indices are 1-based.
pub trait DraftProgress: Send + Sync {
    /// Called before a section's completion call is issued.
    fn section_started(&self, index: usize, total: usize, title: &str);
    /// Called once a section's body (or its error text) is known.
    fn section_finished(&self, index: usize, total: usize, section: &DraftedSection);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl DraftProgress for SilentProgress {
    fn section_started(&self, _index: usize, _total: usize, _title: &str) {}
    fn section_finished(&self, _index: usize, _total: usize, _section: &DraftedSection) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionOutcome {
    Drafted(String),
    Failed { reason: String },
}

impl SectionOutcome {
    /// Pair the outcome with its heading. Failures become inline error text.
    pub fn into_section(self, title: &str) -> DraftedSection {
        match self {
            Self::Drafted(body) => DraftedSection {
                title: title.to_string(),
                body,
                failed: false,
            },
            Self::Failed { reason } => DraftedSection {
                title: title.to_string(),
                body: format!("Error generating section: {reason}"),
                failed: true,
            },
        }
    }
}

/// Draft one section against the full context.
pub async fn draft_section(
    service: &dyn CompletionService,
    section: &SectionSpec,
    requirements: &[Requirement],
    norms: &Corpus,
    models: &Corpus,
    settings: &DraftSettings,
) -> SectionOutcome {
    let norms_text = budgeted(norms, settings.limits.section_norms_chars);
    let models_text = budgeted(models, settings.limits.section_models_chars);
    draft_with_context(service, section, requirements, &norms_text, &models_text, settings).await
}

async fn draft_with_context(
    service: &dyn CompletionService,
    section: &SectionSpec,
    requirements: &[Requirement],
    norms: &str,
    models: &str,
    settings: &DraftSettings,
) -> SectionOutcome {
    let request = section_request(section, requirements, norms, models, settings);
    let completion = match service.complete(&request).await {
        Ok(c) => c,
        Err(e) => {
            warn!(title = %section.title, error = %e, "section drafting failed");
            return SectionOutcome::Failed {
                reason: e.to_string(),
            };
        }
    };

    let body = strip_title_echo(&completion.text, &section.title);
    if body.is_empty() {
        warn!(title = %section.title, "section came back empty");
        return SectionOutcome::Failed {
            reason: "the model returned an empty section".into(),
        };
    }
    SectionOutcome::Drafted(body)
}

/// Draft every section in order and assemble the document.
///
/// Each section is requested exactly once. Corpus budgets are applied once
/// per run and shared by every section request.
#[instrument(skip_all, fields(sections = sections.len()))]
pub async fn draft_document(
    service: &dyn CompletionService,
    sections: &[SectionSpec],
    requirements: &[Requirement],
    norms: &Corpus,
    models: &Corpus,
    settings: &DraftSettings,
    progress: &dyn DraftProgress,
) -> GeneratedDocument {
    let start = Instant::now();
    let norms_text = budgeted(norms, settings.limits.section_norms_chars);
    let models_text = budgeted(models, settings.limits.section_models_chars);
    debug!(
        norms_chars = norms_text.chars().count(),
        models_chars = models_text.chars().count(),
        "section context prepared"
    );

    let total = sections.len();
    let mut drafted = Vec::with_capacity(total);
    for (i, section) in sections.iter().enumerate() {
        let index = i + 1;
        progress.section_started(index, total, &section.title);

        let outcome = draft_with_context(
            service,
            section,
            requirements,
            &norms_text,
            &models_text,
            settings,
        )
        .await;
        let result = outcome.into_section(&section.title);

        info!(index, total, title = %result.title, failed = result.failed, "section drafted");
        progress.section_finished(index, total, &result);
        drafted.push(result);
    }

    let document = GeneratedDocument {
        sections: drafted,
        model: service.model().to_string(),
        generated_at: Utc::now(),
    };
    info!(
        sections = total,
        failed = document.failed_sections(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "document drafted"
    );
    document
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::testing::ScriptedService;
    use normdraft_shared::{CorpusKind, DraftError, SourceText};

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }

    impl DraftProgress for RecordingProgress {
        fn section_started(&self, index: usize, total: usize, title: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("start {index}/{total} {title}"));
        }
        fn section_finished(&self, index: usize, total: usize, section: &DraftedSection) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {index}/{total} {}", section.title));
        }
    }

    fn corpora() -> (Corpus, Corpus) {
        (
            Corpus::new(CorpusKind::Norms, vec![SourceText::new("law.txt", "Art. 1")]),
            Corpus::new(CorpusKind::Models, vec![SourceText::new("model.txt", "Style")]),
        )
    }

    /// Echo the section title back so order is observable.
    fn echo_title() -> ScriptedService {
        ScriptedService::new(|req| {
            let title = req
                .user
                .lines()
                .find_map(|l| l.strip_prefix("SECTION TITLE: "))
                .unwrap_or_default();
            Ok(format!("Body of {title}"))
        })
    }

    #[tokio::test]
    async fn one_call_per_section_in_curated_order() {
        let service = echo_title();
        let (norms, models) = corpora();
        let sections = vec![
            SectionSpec::new("3. Sanctions", ""),
            SectionSpec::new("1. Purpose", ""),
            SectionSpec::new("2. Scope", ""),
        ];
        let progress = RecordingProgress::default();

        let doc = draft_document(
            &service,
            &sections,
            &[Requirement::new("r")],
            &norms,
            &models,
            &DraftSettings::default(),
            &progress,
        )
        .await;

        assert_eq!(service.call_count(), 3);
        let titles: Vec<_> = doc.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["3. Sanctions", "1. Purpose", "2. Scope"]);
        assert_eq!(doc.sections[1].body, "Body of 1. Purpose");
        assert_eq!(doc.model, "scripted");
        assert_eq!(
            progress.events.lock().unwrap().as_slice(),
            [
                "start 1/3 3. Sanctions",
                "done 1/3 3. Sanctions",
                "start 2/3 1. Purpose",
                "done 2/3 1. Purpose",
                "start 3/3 2. Scope",
                "done 3/3 2. Scope",
            ]
        );
    }

    #[tokio::test]
    async fn a_failed_section_does_not_abort_the_run() {
        let service = ScriptedService::new(|req| {
            if req.user.contains("SECTION TITLE: 2.") {
                Err(DraftError::Service("HTTP 500: upstream".into()))
            } else {
                Ok("Prose.".into())
            }
        });
        let (norms, models) = corpora();
        let sections = vec![
            SectionSpec::new("1. A", ""),
            SectionSpec::new("2. B", ""),
            SectionSpec::new("3. C", ""),
        ];

        let doc = draft_document(
            &service,
            &sections,
            &[],
            &norms,
            &models,
            &DraftSettings::default(),
            &SilentProgress,
        )
        .await;

        assert_eq!(doc.sections.len(), 3);
        assert_eq!(doc.failed_sections(), 1);
        assert!(doc.sections[1].body.starts_with("Error generating section:"));
        assert!(doc.sections[1].body.contains("upstream"));
        assert_eq!(doc.sections[2].body, "Prose.");
    }

    #[tokio::test]
    async fn echoed_title_is_not_repeated_in_body() {
        let service = ScriptedService::replying(
            "2. Retention Period\n\nRecords are kept for the retention period set by law.",
        );
        let (norms, models) = corpora();
        let section = SectionSpec::new("2. Retention Period", "Defines the retention period");

        let outcome = draft_section(
            &service,
            &section,
            &[Requirement::new("Must state a retention period.")],
            &norms,
            &models,
            &DraftSettings::default(),
        )
        .await;

        let SectionOutcome::Drafted(body) = outcome else {
            panic!("expected a drafted body");
        };
        assert_ne!(body.lines().next(), Some("2. Retention Period"));
        assert!(body.starts_with("Records are kept"));
        assert_eq!(service.calls()[0].temperature, 0.4);
    }

    #[tokio::test]
    async fn section_context_is_budgeted() {
        let service = ScriptedService::replying("Prose.");
        let norms = Corpus::new(
            CorpusKind::Norms,
            vec![SourceText::new("law.txt", "n".repeat(60_000))],
        );
        let models = Corpus::new(
            CorpusKind::Models,
            vec![SourceText::new("model.txt", "m".repeat(40_000))],
        );

        draft_section(
            &service,
            &SectionSpec::new("1. A", ""),
            &[],
            &norms,
            &models,
            &DraftSettings::default(),
        )
        .await;

        let user = &service.calls()[0].user;
        let norms_cut: String = norms.marked().chars().take(50_000).collect();
        assert!(user.contains(&format!("MANDATORY):\n{norms_cut}\n\nMODEL/EXAMPLE")));
        assert!(!user.contains("--- END NORM"));
        assert!(!user.contains("--- END MODEL"));
        let models_cut: String = models.marked().chars().take(30_000).collect();
        assert!(user.contains(&format!("{models_cut}\n\nGENERAL MANDATORY")));
    }

    #[tokio::test]
    async fn blank_body_is_a_failure() {
        let service = ScriptedService::replying("# 1. A\n");
        let (norms, models) = corpora();
        let outcome = draft_section(
            &service,
            &SectionSpec::new("1. A", ""),
            &[],
            &norms,
            &models,
            &DraftSettings::default(),
        )
        .await;
        assert!(matches!(outcome, SectionOutcome::Failed { .. }));
    }
}

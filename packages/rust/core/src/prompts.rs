//! Role and task instructions for each generation step.
//!
//! Builders take already-budgeted corpus text; truncation happens in the
//! component that owns the budget.

use normdraft_completion::CompletionRequest;
use normdraft_shared::{DraftSettings, Requirement, SectionSpec};

/// Requirement extraction is deterministic.
pub const EXTRACTION_TEMPERATURE: f64 = 0.0;
pub const STRUCTURE_TEMPERATURE: f64 = 0.3;
pub const SECTION_TEMPERATURE: f64 = 0.4;
pub const ONESHOT_TEMPERATURE: f64 = 0.3;

/// Placeholder sent to the structure proposer when no models were uploaded.
pub const NO_MODELS_PLACEHOLDER: &str = "No model documents were provided.";

fn institution_clause(settings: &DraftSettings) -> String {
    match settings.institution.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => format!(" for {name}"),
        _ => String::new(),
    }
}

/// Render curated requirements as a bulleted block, in order.
pub fn requirement_block(requirements: &[Requirement]) -> String {
    requirements
        .iter()
        .map(|r| format!("- {}", r.text))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Requirement extraction
// ---------------------------------------------------------------------------

pub fn extraction_request(norms: &str, settings: &DraftSettings) -> CompletionRequest {
    let system = "You are an expert legal analyst.".to_string();
    let user = format!(
        "Analyze the following reference text (laws, guidelines, regulations) and extract a \
concise list of the MANDATORY REQUIREMENTS, PROHIBITIONS and KEY PRINCIPLES that any derived \
document must comply with.\n\n\
Write every item in {language}.\n\
Return ONLY the list as bullet points, with no introduction and no closing remarks.\n\n\
REFERENCE:\n{norms}",
        language = settings.language,
    );
    CompletionRequest::new(system, user, EXTRACTION_TEMPERATURE)
}

// ---------------------------------------------------------------------------
// Structure proposal
// ---------------------------------------------------------------------------

pub fn structure_request(
    requirements: &[Requirement],
    intent: &str,
    models: &str,
    settings: &DraftSettings,
) -> CompletionRequest {
    let system = format!(
        "You are an information architect experienced in administrative drafting{}.",
        institution_clause(settings)
    );
    let models = if models.is_empty() {
        NO_MODELS_PLACEHOLDER
    } else {
        models
    };
    let user = format!(
        "Design the detailed structure (table of contents) of an official document, based on \
the mandatory requirements.\n\n\
If a MODEL TEXT is provided, use it as a guide for heading style and organization, but adapt \
it to what is requested.\n\n\
MODEL TEXT (structure reference):\n{models}\n\n\
MANDATORY REQUIREMENTS TO COVER:\n{requirements}\n\n\
USER REQUEST (DOCUMENT TYPE AND PURPOSE):\n{intent}\n\n\
KEY INSTRUCTIONS:\n\
- Propose a complete structure with section and subsection titles.\n\
- If the model has a good structure, imitate it but adapt it to the new requirements.\n\
- Make sure every mandatory requirement is covered by some section.\n\
- Write titles and descriptions in {language}.\n\n\
Return ONLY a JSON list of sections in exactly this format, with no prose and no markdown fences:\n\
[\n  {{\"title\": \"1. Section title\", \"description\": \"What the section contains\"}},\n  \
{{\"title\": \"2. Section title\", \"description\": \"...\"}},\n  \
{{\"title\": \"2.1. Subsection\", \"description\": \"...\"}}\n]",
        requirements = requirement_block(requirements),
        language = settings.language,
    );
    CompletionRequest::new(system, user, STRUCTURE_TEMPERATURE)
}

// ---------------------------------------------------------------------------
// Section drafting
// ---------------------------------------------------------------------------

pub fn section_request(
    section: &SectionSpec,
    requirements: &[Requirement],
    norms: &str,
    models: &str,
    settings: &DraftSettings,
) -> CompletionRequest {
    let system = format!(
        "You are an expert drafter of public policy and regulatory documents{}.",
        institution_clause(settings)
    );
    let requirements = requirements
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let user = format!(
        "Write the COMPLETE CONTENT of the following section of an official document.\n\n\
SECTION TITLE: {title}\n\
EXPECTED DESCRIPTION/CONTENT: {description}\n\n\
REGULATIONS IN FORCE (SOURCE OF TRUTH, MANDATORY):\n{norms}\n\n\
MODEL/EXAMPLE (STYLE AND TONE GUIDE ONLY):\n{models}\n\n\
GENERAL MANDATORY REQUIREMENTS:\n{requirements}\n\n\
DRAFTING INSTRUCTIONS:\n\
- Go into detail. Do not summarize.\n\
- Use a formal, legal and administrative tone, in {language}.\n\
- Write full paragraphs, numbered articles or lists as the title calls for.\n\
- If this is a \"Principles\" or \"Guidelines\" section, set out each one in full.\n\
- Do NOT write the section title again (it is added automatically); write only the content.",
        title = section.title,
        description = section.description,
        language = settings.language,
    );
    CompletionRequest::new(system, user, SECTION_TEMPERATURE)
}

// ---------------------------------------------------------------------------
// One-shot drafting
// ---------------------------------------------------------------------------

pub fn oneshot_request(reference: &str, intent: &str, settings: &DraftSettings) -> CompletionRequest {
    let system = format!(
        "You are an expert drafter of legal and administrative documents for government \
bodies{}. Your task is to write formal, precise and well-structured documents based on the \
material provided.",
        institution_clause(settings)
    );
    let user = format!(
        "Write a document (for example a Policy, Guide or Regulation) to these specifications.\n\n\
PURPOSE OF THE DOCUMENT:\n{intent}\n\n\
REFERENCE AND GUIDANCE MATERIAL (base for tone, structure and regulations):\n{reference}\n\n\
The document must use a formal tone and terminology suited to public administration, be \
written in {language}, include clear sections, and be ready for final review.",
        language = settings.language,
    );
    CompletionRequest::new(system, user, ONESHOT_TEMPERATURE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> DraftSettings {
        DraftSettings {
            institution: Some("the Ministry of Health".into()),
            ..DraftSettings::default()
        }
    }

    #[test]
    fn extraction_ends_with_the_reference_text() {
        let req = extraction_request("NORMS-BODY", &settings());
        assert_eq!(req.temperature, 0.0);
        assert!(req.system.contains("legal analyst"));
        assert!(req.user.ends_with("REFERENCE:\nNORMS-BODY"));
        assert!(req.user.contains("no introduction"));
    }

    #[test]
    fn structure_block_lists_requirements_in_order() {
        let reqs = vec![Requirement::new("first"), Requirement::new("second")];
        let req = structure_request(&reqs, "A retention policy", "", &settings());
        assert_eq!(req.temperature, 0.3);
        assert!(req.system.contains("information architect"));
        assert!(req.system.contains("the Ministry of Health"));
        assert!(req.user.contains("- first\n- second"));
        assert!(req.user.contains(NO_MODELS_PLACEHOLDER));
        assert!(req.user.contains("A retention policy"));
    }

    #[test]
    fn structure_uses_models_when_present() {
        let req = structure_request(&[], "intent", "MODEL-TEXT", &DraftSettings::default());
        assert!(req.user.contains("MODEL-TEXT"));
        assert!(!req.user.contains(NO_MODELS_PLACEHOLDER));
        assert!(!req.system.contains(" for "));
    }

    #[test]
    fn section_request_carries_every_input() {
        let section = SectionSpec::new("2. Retention", "How long records are kept");
        let reqs = vec![Requirement::new("Must state a retention period.")];
        let req = section_request(&section, &reqs, "NORMS", "MODELS", &settings());
        assert_eq!(req.temperature, 0.4);
        assert!(req.user.contains("SECTION TITLE: 2. Retention"));
        assert!(req.user.contains("How long records are kept"));
        assert!(req.user.contains("NORMS"));
        assert!(req.user.contains("MODELS"));
        assert!(req.user.contains("Must state a retention period."));
        assert!(req.user.contains("Do NOT write the section title again"));
    }

    #[test]
    fn oneshot_request_is_warm() {
        let req = oneshot_request("REF", "A guide", &DraftSettings::default());
        assert_eq!(req.temperature, 0.3);
        assert!(req.user.contains("REF"));
        assert!(req.user.contains("A guide"));
    }
}

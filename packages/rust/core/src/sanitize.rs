//! Response sanitizers for model output.
//!
//! Each generation step runs the raw completion text through one of these
//! before anything reaches the session. They are pure functions over
//! strings so malformed-output cases can be tested without a network.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use normdraft_shared::{DraftError, Result, SectionSpec};

// ---------------------------------------------------------------------------
// Bullet lists
// ---------------------------------------------------------------------------

/// Split a bullet list into items.
///
/// Blank lines are dropped; leading `-`, `*` or `•` markers and surrounding
/// whitespace are stripped from every line. Lines that were only a marker
/// are dropped too.
pub fn parse_bullet_list(text: &str) -> Vec<String> {
    text.lines()
        .map(strip_bullet)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_bullet(line: &str) -> &str {
    line.trim()
        .trim_start_matches(|c: char| c == '-' || c == '*' || c == '•' || c.is_whitespace())
        .trim()
}

// ---------------------------------------------------------------------------
// Code fences
// ---------------------------------------------------------------------------

/// Remove a surrounding Markdown code fence (```` ```json ```` ... ```` ``` ````), if any.
pub fn strip_code_fence(text: &str) -> String {
    static OPEN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^```[\w-]*[ \t]*\r?\n?").expect("valid regex"));
    static CLOSE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\r?\n?[ \t]*```$").expect("valid regex"));

    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let without_open = OPEN_RE.replace(trimmed, "");
    CLOSE_RE.replace(&without_open, "").trim().to_string()
}

// ---------------------------------------------------------------------------
// Section outlines
// ---------------------------------------------------------------------------

/// Shape we accept from the structure proposer.
#[derive(Debug, Deserialize)]
struct RawSection {
    title: String,
    #[serde(default)]
    description: Option<String>,
}

/// Decode a JSON list of `{title, description}` objects into section rows.
///
/// Fails with [`DraftError::MalformedOutput`] on an empty response, anything
/// that is not a list of such objects, an empty list, or a blank title.
pub fn parse_section_list(text: &str) -> Result<Vec<SectionSpec>> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(DraftError::MalformedOutput("empty response".into()));
    }

    let raw: Vec<RawSection> = serde_json::from_str(&body).map_err(|e| {
        DraftError::MalformedOutput(format!(
            "expected a JSON list of {{\"title\", \"description\"}} objects: {e}"
        ))
    })?;

    if raw.is_empty() {
        return Err(DraftError::MalformedOutput("section list is empty".into()));
    }

    raw.into_iter()
        .enumerate()
        .map(|(i, section)| {
            let title = section.title.trim();
            if title.is_empty() {
                return Err(DraftError::MalformedOutput(format!(
                    "section {} has an empty title",
                    i + 1
                )));
            }
            let description = section.description.unwrap_or_default();
            Ok(SectionSpec::new(title, description.trim()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Section bodies
// ---------------------------------------------------------------------------

/// Drop a first line that only repeats the section title.
///
/// The caller adds the heading itself, so an echoed title (bare, as a
/// Markdown heading, or in bold) would appear twice in the document.
pub fn strip_title_echo(body: &str, title: &str) -> String {
    let body = body.trim();
    let wanted = normalize_heading(title);
    if wanted.is_empty() {
        return body.to_string();
    }

    let (first, rest) = body.split_once('\n').unwrap_or((body, ""));
    if normalize_heading(first) == wanted {
        rest.trim().to_string()
    } else {
        body.to_string()
    }
}

fn normalize_heading(line: &str) -> String {
    line.trim()
        .trim_start_matches('#')
        .trim()
        .trim_matches('*')
        .trim()
        .trim_end_matches(':')
        .trim()
        .to_lowercase()
}

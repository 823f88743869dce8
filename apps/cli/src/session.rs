//! Interactive line-based session over the drafting wizard.
//!
//! One command per line. Row numbers are 1-based, as printed.

use std::path::{Path, PathBuf};

use color_eyre::eyre::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use normdraft_completion::CompletionService;
use normdraft_core::assembler::export_document;
use normdraft_core::{Advance, GateError, IntakeRequest, Stage, Wizard};
use normdraft_shared::{GeneratedDocument, Requirement, SectionSpec};

use crate::commands::CliProgress;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    Intent(String),
    Toggle(usize),
    Edit(usize, String),
    Title(usize, String),
    Desc(usize, String),
    Add(String),
    Remove(usize),
    Move(usize, usize),
    Show,
    Next,
    Back,
    Reset,
    Export(Option<PathBuf>),
    Help,
    Quit,
}

const HELP: &str = "\
commands:
  intent <text>      set the document purpose (stage 1)
  toggle N           include/exclude row N
  edit N <text>      replace requirement N (stage 2) or section title N (stage 3)
  title N <text>     replace section title N
  desc N <text>      replace section description N
  add <text>         append a requirement, or a section as `title | description`
  rm N               remove row N
  mv N M             move section N to position M
  show               print the current stage
  next               approve and run the next step
  back               return to the previous stage
  reset              discard everything and start over
  export [path]      write the draft (stage 4)
  quit";

/// Parse one input line. Row numbers are converted to 0-based indices.
pub(crate) fn parse_command(line: &str) -> Result<Action, String> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map(|(w, r)| (w, r.trim()))
        .unwrap_or((line, ""));

    match word.to_lowercase().as_str() {
        "intent" => Ok(Action::Intent(non_empty(rest, "intent")?)),
        "toggle" => Ok(Action::Toggle(row(rest)?)),
        "edit" => row_and_text(rest).map(|(n, t)| Action::Edit(n, t)),
        "title" => row_and_text(rest).map(|(n, t)| Action::Title(n, t)),
        "desc" => row_and_text(rest).map(|(n, t)| Action::Desc(n, t)),
        "add" => Ok(Action::Add(non_empty(rest, "add")?)),
        "rm" | "remove" => Ok(Action::Remove(row(rest)?)),
        "mv" | "move" => {
            let (from, to) = rest
                .split_once(char::is_whitespace)
                .ok_or("usage: mv N M")?;
            Ok(Action::Move(row(from)?, row(to)?))
        }
        "show" | "ls" => Ok(Action::Show),
        "next" | "approve" => Ok(Action::Next),
        "back" => Ok(Action::Back),
        "reset" => Ok(Action::Reset),
        "export" => Ok(Action::Export(
            (!rest.is_empty()).then(|| PathBuf::from(rest)),
        )),
        "help" | "?" => Ok(Action::Help),
        "quit" | "exit" | "q" => Ok(Action::Quit),
        "" => Err("type `help` for commands".into()),
        other => Err(format!("unknown command '{other}'; type `help`")),
    }
}

fn row(text: &str) -> Result<usize, String> {
    match text.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("'{}' is not a row number", text.trim())),
    }
}

fn row_and_text(rest: &str) -> Result<(usize, String), String> {
    let (n, text) = rest
        .split_once(char::is_whitespace)
        .ok_or("usage: <command> N <text>")?;
    Ok((row(n)?, non_empty(text, "text")?))
}

fn non_empty(text: &str, what: &str) -> Result<String, String> {
    let text = text.trim();
    if text.is_empty() {
        Err(format!("{what} needs some text"))
    } else {
        Ok(text.to_string())
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn mark(included: bool) -> &'static str {
    if included { "[x]" } else { "[ ]" }
}

pub(crate) fn render_requirements(rows: &[Requirement]) -> String {
    let mut out = String::from("Requirements:\n");
    for (i, r) in rows.iter().enumerate() {
        out.push_str(&format!("  {:>3}. {} {}\n", i + 1, mark(r.included), r.text));
    }
    out
}

pub(crate) fn render_structure(rows: &[SectionSpec]) -> String {
    let mut out = String::from("Structure:\n");
    for (i, s) in rows.iter().enumerate() {
        out.push_str(&format!("  {:>3}. {} {}\n", i + 1, mark(s.included), s.title));
        if !s.description.is_empty() {
            out.push_str(&format!("           {}\n", s.description));
        }
    }
    out
}

fn render_document(document: &GeneratedDocument) -> String {
    let mut out = document.render();
    if document.failed_sections() > 0 {
        out.push_str(&format!(
            "\n\n({} section(s) failed; see the error text above)\n",
            document.failed_sections()
        ));
    }
    out
}

fn render_stage<S: CompletionService>(wizard: &Wizard<S>, intake: &IntakeRequest) -> String {
    let state = wizard.state();
    let header = format!("== Stage {} ==\n", wizard.stage());
    let body = match wizard.stage() {
        Stage::Intake => format!(
            "Norms:  {}\nModels: {}\nIntent: {}\nCredential: {}\n",
            labels(&intake.norms),
            labels(&intake.models),
            if intake.intent.is_empty() {
                "(none; use `intent <text>`)"
            } else {
                intake.intent.as_str()
            },
            if wizard.has_credential() { "configured" } else { "missing" },
        ),
        Stage::RequirementReview => render_requirements(&state.requirements),
        Stage::StructureReview => render_structure(&state.structure),
        Stage::Drafted => state
            .document
            .as_ref()
            .map(render_document)
            .unwrap_or_default(),
    };
    format!("{header}{body}")
}

fn labels(sources: &[normdraft_shared::SourceText]) -> String {
    if sources.is_empty() {
        return "(none)".into();
    }
    sources
        .iter()
        .map(|s| s.label.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Flow {
    Continue,
    Quit,
}

/// Drive the wizard from stdin until `quit` or end of input.
pub(crate) async fn run_interactive<S: CompletionService>(
    wizard: &mut Wizard<S>,
    mut intake: IntakeRequest,
    out: PathBuf,
) -> Result<()> {
    println!("{}", render_stage(wizard, &intake));
    println!("Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("[{}] > ", wizard.stage().number());
        std::io::Write::flush(&mut std::io::stdout())?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let action = match parse_command(&line) {
            Ok(action) => action,
            Err(message) => {
                println!("  {message}");
                continue;
            }
        };

        match apply(wizard, &mut intake, &out, action).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => println!("  ! {e}"),
        }
    }
    Ok(())
}

async fn apply<S: CompletionService>(
    wizard: &mut Wizard<S>,
    intake: &mut IntakeRequest,
    out: &Path,
    action: Action,
) -> Result<Flow> {
    let stage = wizard.stage();
    match action {
        Action::Help => println!("{HELP}"),
        Action::Quit => return Ok(Flow::Quit),
        Action::Show => println!("{}", render_stage(wizard, intake)),
        Action::Intent(text) => {
            if stage != Stage::Intake {
                return Err(wrong_stage(Stage::Intake, stage));
            }
            intake.intent = text;
        }

        Action::Toggle(i) => {
            let included = match stage {
                Stage::StructureReview => wizard.toggle_section(i)?,
                _ => wizard.toggle_requirement(i)?,
            };
            println!("  row {} {}", i + 1, if included { "included" } else { "excluded" });
        }
        Action::Edit(i, text) => match stage {
            Stage::StructureReview => wizard.edit_section_title(i, &text)?,
            _ => wizard.edit_requirement(i, &text)?,
        },
        Action::Title(i, text) => wizard.edit_section_title(i, &text)?,
        Action::Desc(i, text) => wizard.edit_section_description(i, &text)?,
        Action::Add(text) => {
            let index = match stage {
                Stage::StructureReview => {
                    let (title, description) = text.split_once('|').unwrap_or((text.as_str(), ""));
                    wizard.add_section(title, description)?
                }
                _ => wizard.add_requirement(&text)?,
            };
            println!("  added row {}", index + 1);
        }
        Action::Remove(i) => match stage {
            Stage::StructureReview => {
                let removed = wizard.remove_section(i)?;
                println!("  removed '{}'", removed.title);
            }
            _ => {
                let removed = wizard.remove_requirement(i)?;
                println!("  removed '{}'", removed.text);
            }
        },
        Action::Move(from, to) => wizard.move_section(from, to)?,

        Action::Next => {
            let advance = match stage {
                Stage::Intake => wizard.submit_intake(intake.clone()).await?,
                Stage::RequirementReview => wizard.approve_requirements().await?,
                Stage::StructureReview => {
                    let progress = CliProgress::new();
                    let advance = wizard.generate(&progress).await;
                    progress.finish();
                    advance?
                }
                Stage::Drafted => {
                    println!("  the draft is done; `export` it, go `back`, or `reset`");
                    return Ok(Flow::Continue);
                }
            };
            if let Advance::Degraded { reason } = advance {
                println!("  ! {reason}");
            }
            println!("{}", render_stage(wizard, intake));
        }
        Action::Back => {
            wizard.back()?;
            println!("{}", render_stage(wizard, intake));
        }
        Action::Reset => {
            wizard.reset();
            println!("  session reset; uploads are kept for the next run");
            println!("{}", render_stage(wizard, intake));
        }
        Action::Export(path) => {
            let document = wizard
                .document()
                .ok_or_else(|| wrong_stage(Stage::Drafted, stage))?;
            let path = path.unwrap_or_else(|| out.to_path_buf());
            let written = export_document(document, &path)?;
            println!("  exported to {}", written.display());
        }
    }
    Ok(Flow::Continue)
}

fn wrong_stage(expected: Stage, actual: Stage) -> color_eyre::eyre::Report {
    GateError::WrongStage { expected, actual }.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_numbers_become_indices() {
        assert_eq!(parse_command("toggle 3"), Ok(Action::Toggle(2)));
        assert_eq!(parse_command("  RM 1 "), Ok(Action::Remove(0)));
        assert_eq!(parse_command("mv 4 1"), Ok(Action::Move(3, 0)));
    }

    #[test]
    fn row_zero_and_garbage_are_rejected() {
        assert!(parse_command("toggle 0").is_err());
        assert!(parse_command("toggle x").is_err());
        assert!(parse_command("mv 2").is_err());
    }

    #[test]
    fn text_commands_keep_the_rest_of_the_line() {
        assert_eq!(
            parse_command("edit 2 Records must be kept for 5 years."),
            Ok(Action::Edit(1, "Records must be kept for 5 years.".into()))
        );
        assert_eq!(
            parse_command("add 4. Review | Yearly review"),
            Ok(Action::Add("4. Review | Yearly review".into()))
        );
        assert!(parse_command("edit 2").is_err());
        assert!(parse_command("add").is_err());
    }

    #[test]
    fn export_path_is_optional() {
        assert_eq!(parse_command("export"), Ok(Action::Export(None)));
        assert_eq!(
            parse_command("export out/draft.txt"),
            Ok(Action::Export(Some(PathBuf::from("out/draft.txt"))))
        );
    }

    #[test]
    fn unknown_and_blank_lines_explain_themselves() {
        assert!(parse_command("frobnicate").unwrap_err().contains("frobnicate"));
        assert!(parse_command("").unwrap_err().contains("help"));
        assert_eq!(parse_command("q"), Ok(Action::Quit));
    }

    #[test]
    fn tables_show_inclusion_and_1_based_rows() {
        let mut off = Requirement::new("Data must not be shared.");
        off.included = false;
        let table = render_requirements(&[Requirement::new("State a retention period."), off]);
        assert!(table.contains("  1. [x] State a retention period."));
        assert!(table.contains("  2. [ ] Data must not be shared."));

        let table = render_structure(&[SectionSpec::new("1. Purpose", "Scope")]);
        assert!(table.contains("  1. [x] 1. Purpose\n           Scope\n"));
    }

    // -- routing through `apply` ---------------------------------------------

    use async_trait::async_trait;
    use normdraft_completion::{Completion, CompletionRequest};
    use normdraft_core::prompts::{EXTRACTION_TEMPERATURE, STRUCTURE_TEMPERATURE};
    use normdraft_shared::{DraftSettings, SourceText};

    /// Canned replies keyed on the temperature each step uses.
    struct Canned;

    #[async_trait]
    impl CompletionService for Canned {
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> normdraft_shared::Result<Completion> {
            let text = if request.temperature == EXTRACTION_TEMPERATURE {
                "- State a retention period.\n- Do not share personal data."
            } else if request.temperature == STRUCTURE_TEMPERATURE {
                r#"[{"title": "1. Purpose", "description": "Scope"},
                    {"title": "2. Retention", "description": "Periods"}]"#
            } else {
                "Section text."
            };
            Ok(Completion {
                text: text.into(),
                model: "canned".into(),
                ..Completion::default()
            })
        }

        fn model(&self) -> &str {
            "canned"
        }
    }

    fn session() -> (Wizard<Canned>, IntakeRequest) {
        let intake = IntakeRequest {
            norms: vec![SourceText::new("law.txt", "Art. 1: keep records.")],
            models: vec![],
            intent: "Draft a retention policy".into(),
        };
        (Wizard::new(Some(Canned), DraftSettings::default()), intake)
    }

    async fn run(wizard: &mut Wizard<Canned>, intake: &mut IntakeRequest, line: &str) -> Result<Flow> {
        let action = parse_command(line).map_err(color_eyre::eyre::Report::msg)?;
        apply(wizard, intake, Path::new("unused.txt"), action).await
    }

    #[tokio::test]
    async fn edit_and_add_target_requirements_at_stage_two() {
        let (mut w, mut intake) = session();
        run(&mut w, &mut intake, "next").await.unwrap();
        assert_eq!(w.stage(), Stage::RequirementReview);

        run(&mut w, &mut intake, "edit 2 Never share personal data.").await.unwrap();
        run(&mut w, &mut intake, "add Keep an audit log | yearly").await.unwrap();

        let texts: Vec<_> = w.state().requirements.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(
            texts,
            [
                "State a retention period.",
                "Never share personal data.",
                "Keep an audit log | yearly",
            ]
        );
        assert!(w.state().structure.is_empty());
    }

    #[tokio::test]
    async fn edit_and_add_target_sections_at_stage_three() {
        let (mut w, mut intake) = session();
        run(&mut w, &mut intake, "next").await.unwrap();
        run(&mut w, &mut intake, "next").await.unwrap();
        assert_eq!(w.stage(), Stage::StructureReview);

        run(&mut w, &mut intake, "edit 1 1. Objective").await.unwrap();
        run(&mut w, &mut intake, "add 3. Review | Yearly review").await.unwrap();
        run(&mut w, &mut intake, "add 4. Annex").await.unwrap();

        let structure = &w.state().structure;
        assert_eq!(structure.len(), 4);
        assert_eq!(structure[0].title, "1. Objective");
        assert_eq!(structure[0].description, "Scope");
        assert_eq!(structure[2].title, "3. Review");
        assert_eq!(structure[2].description, "Yearly review");
        assert_eq!(structure[3].title, "4. Annex");
        assert_eq!(structure[3].description, "");
        assert_eq!(w.state().requirements.len(), 2);
    }

    #[tokio::test]
    async fn blank_section_title_is_refused_with_a_gate_message() {
        let (mut w, mut intake) = session();
        run(&mut w, &mut intake, "next").await.unwrap();
        run(&mut w, &mut intake, "next").await.unwrap();

        let err = run(&mut w, &mut intake, "add   | Annex with retention tables")
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<GateError>(),
            Some(&GateError::BlankRow { index: 2 })
        );
        assert_eq!(w.state().structure.len(), 2);

        run(&mut w, &mut intake, "next").await.unwrap();
        assert_eq!(w.document().unwrap().sections.len(), 2);
    }

    #[tokio::test]
    async fn toggle_and_remove_follow_the_stage() {
        let (mut w, mut intake) = session();
        run(&mut w, &mut intake, "next").await.unwrap();
        run(&mut w, &mut intake, "toggle 1").await.unwrap();
        assert!(!w.state().requirements[0].included);

        run(&mut w, &mut intake, "next").await.unwrap();
        assert_eq!(w.state().requirements.len(), 1);
        run(&mut w, &mut intake, "rm 2").await.unwrap();
        assert_eq!(w.state().structure.len(), 1);
        assert_eq!(w.state().requirements.len(), 1);
    }
}

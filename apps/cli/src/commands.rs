//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, bail, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use normdraft_completion::{ChatClient, CompletionService};
use normdraft_core::assembler::{export_document, export_text};
use normdraft_core::oneshot::{OneShotOutcome, draft_whole_document};
use normdraft_core::{Advance, DraftProgress, IntakeRequest, Wizard};
use normdraft_loader::DocumentLoader;
use normdraft_shared::{
    AppConfig, Corpus, CorpusKind, DraftError, DraftSettings, DraftedSection, SourceText,
    init_config, load_config, load_config_from, resolve_api_key,
};

use crate::session;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// normdraft: draft official documents from regulations, one reviewed step at a time.
#[derive(Parser)]
#[command(
    name = "normdraft",
    version,
    about = "Draft official documents from regulatory sources with human review between steps.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.normdraft/normdraft.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Interactive session: review requirements and structure before drafting.
    Wizard(DraftArgs),

    /// Run every stage without edits and export the draft.
    Run(DraftArgs),

    /// Draft a whole document in a single request, without review steps.
    Oneshot {
        /// Reference document (repeatable).
        #[arg(long = "reference", required = true)]
        references: Vec<PathBuf>,

        /// What document to draft and for what purpose.
        #[arg(long)]
        intent: String,

        /// Write the draft here instead of printing it.
        #[arg(short, long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        service: ServiceArgs,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Inputs shared by `wizard` and `run`.
#[derive(Args, Clone, Debug)]
pub(crate) struct DraftArgs {
    /// Regulatory source document (repeatable).
    #[arg(long = "norm")]
    pub norms: Vec<PathBuf>,

    /// Style model document (repeatable, optional).
    #[arg(long = "model")]
    pub models: Vec<PathBuf>,

    /// What document to draft and for what purpose.
    #[arg(long, default_value = "")]
    pub intent: String,

    /// Export path (defaults to `drafting.export_file` from config).
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    #[command(flatten)]
    pub service: ServiceArgs,
}

/// Completion-service and drafting overrides.
#[derive(Args, Clone, Debug)]
pub(crate) struct ServiceArgs {
    /// API key (falls back to the env var named in `completion.api_key_env`).
    #[arg(long, env = "NORMDRAFT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model identifier, overriding `completion.model`.
    #[arg(long = "llm")]
    pub llm: Option<String>,

    /// Output language, overriding `drafting.language`.
    #[arg(long)]
    pub language: Option<String>,

    /// Issuing institution, overriding `drafting.institution`.
    #[arg(long)]
    pub institution: Option<String>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "normdraft_cli=info,normdraft_core=info,normdraft_loader=warn,normdraft_completion=warn",
        1 => "normdraft_cli=debug,normdraft_core=debug,normdraft_loader=debug,normdraft_completion=debug",
        _ => "normdraft_cli=trace,normdraft_core=trace,normdraft_loader=trace,normdraft_completion=trace,normdraft_shared=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Wizard(args) => {
            let config = resolve_config(cli.config.as_deref())?;
            cmd_wizard(&config, &args).await
        }
        Command::Run(args) => {
            let config = resolve_config(cli.config.as_deref())?;
            cmd_run(&config, &args).await
        }
        Command::Oneshot {
            references,
            intent,
            out,
            service,
        } => {
            let config = resolve_config(cli.config.as_deref())?;
            cmd_oneshot(&config, &references, &intent, out.as_deref(), &service).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    })
}

// ---------------------------------------------------------------------------
// Session setup
// ---------------------------------------------------------------------------

fn apply_overrides(config: &AppConfig, args: &ServiceArgs) -> (AppConfig, DraftSettings) {
    let mut config = config.clone();
    if let Some(model) = &args.llm {
        config.completion.model = model.clone();
    }
    if let Some(language) = &args.language {
        config.drafting.language = language.clone();
    }
    if let Some(institution) = &args.institution {
        config.drafting.institution = Some(institution.clone());
    }
    let settings = DraftSettings::from(&config);
    (config, settings)
}

/// Build the HTTP client, or `None` when no credential is available so the
/// wizard can refuse the first transition with a visible message.
fn build_service(config: &AppConfig, args: &ServiceArgs) -> Result<Option<ChatClient>> {
    match resolve_api_key(config, args.api_key.as_deref()) {
        Ok(key) => Ok(Some(ChatClient::new(&config.completion, key)?)),
        Err(DraftError::MissingCredential { message }) => {
            warn!(%message, "no completion-service credential");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Load files as plain text, printing any that could not be read.
pub(crate) fn load_sources(loader: &DocumentLoader, paths: &[PathBuf], what: &str) -> Vec<SourceText> {
    if paths.is_empty() {
        return Vec::new();
    }
    let report = loader.load_paths(paths);
    for failure in &report.failures {
        eprintln!(
            "  ! {what} '{}' could not be read ({}); continuing with empty text",
            failure.label, failure.message
        );
    }
    report.sources
}

fn prepare_session(
    config: &AppConfig,
    args: &DraftArgs,
) -> Result<(Wizard<ChatClient>, IntakeRequest, PathBuf)> {
    let (config, settings) = apply_overrides(config, &args.service);
    let service = build_service(&config, &args.service)?;

    let loader = DocumentLoader::default();
    let intake = IntakeRequest {
        norms: load_sources(&loader, &args.norms, "norm"),
        models: load_sources(&loader, &args.models, "model"),
        intent: args.intent.clone(),
    };
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.drafting.export_file));

    Ok((Wizard::new(service, settings), intake, out))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_wizard(config: &AppConfig, args: &DraftArgs) -> Result<()> {
    let (mut wizard, intake, out) = prepare_session(config, args)?;
    info!(session = %wizard.session_id(), "starting interactive session");
    session::run_interactive(&mut wizard, intake, out).await
}

async fn cmd_run(config: &AppConfig, args: &DraftArgs) -> Result<()> {
    let (mut wizard, intake, out) = prepare_session(config, args)?;
    info!(
        session = %wizard.session_id(),
        norms = intake.norms.len(),
        models = intake.models.len(),
        "running all stages without review"
    );

    if let Advance::Degraded { reason } = wizard.submit_intake(intake).await? {
        bail!("requirement extraction failed: {reason}");
    }
    println!("{}", session::render_requirements(&wizard.state().requirements));

    if let Advance::Degraded { reason } = wizard.approve_requirements().await? {
        bail!("structure proposal failed: {reason}");
    }
    println!("{}", session::render_structure(&wizard.state().structure));

    let progress = CliProgress::new();
    let advance = wizard.generate(&progress).await?;
    progress.finish();
    if let Advance::Degraded { reason } = &advance {
        eprintln!("  ! {reason}; their text is an error message in the export");
    }

    let document = wizard
        .document()
        .ok_or_else(|| eyre!("no document after generation"))?;
    let path = export_document(document, &out)?;

    println!();
    println!("  Draft exported!");
    println!("  Sections: {}", document.sections.len());
    println!("  Failed:   {}", document.failed_sections());
    println!("  Model:    {}", document.model);
    println!("  Path:     {}", path.display());
    println!();

    Ok(())
}

async fn cmd_oneshot(
    config: &AppConfig,
    references: &[PathBuf],
    intent: &str,
    out: Option<&Path>,
    args: &ServiceArgs,
) -> Result<()> {
    let (config, settings) = apply_overrides(config, args);
    let key = resolve_api_key(&config, args.api_key.as_deref())?;
    let client = ChatClient::new(&config.completion, key)?;

    let loader = DocumentLoader::default();
    let reference = Corpus::new(
        CorpusKind::Norms,
        load_sources(&loader, references, "reference"),
    );

    info!(sources = reference.sources().len(), model = client.model(), "drafting in one shot");
    let spinner = spinner("Drafting document...");
    let outcome = draft_whole_document(&client, &reference, intent, &settings).await;
    spinner.finish_and_clear();

    let text = match outcome {
        OneShotOutcome::Drafted(text) => text,
        OneShotOutcome::Failed { reason } => bail!("one-shot drafting failed: {reason}"),
    };

    match out {
        Some(path) => {
            let path = export_text(&text, path)?;
            println!("Draft written to: {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(
            style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

/// Section-drafting progress bar using indicatif.
pub(crate) struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    pub(crate) fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl DraftProgress for CliProgress {
    fn section_started(&self, index: usize, total: usize, title: &str) {
        self.bar.set_length(total as u64);
        self.bar.set_position((index - 1) as u64);
        self.bar.set_message(format!("Drafting {title}"));
    }

    fn section_finished(&self, index: usize, _total: usize, section: &DraftedSection) {
        self.bar.set_position(index as u64);
        if section.failed {
            self.bar
                .println(format!("  ! section '{}' failed", section.title));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn run_args_collect_repeated_sources() {
        let cli = Cli::try_parse_from([
            "normdraft",
            "run",
            "--norm",
            "law1.txt",
            "--norm",
            "law2.txt",
            "--model",
            "model.txt",
            "--intent",
            "Draft a data retention policy",
            "-o",
            "out/draft.txt",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.norms.len(), 2);
        assert_eq!(args.models, [PathBuf::from("model.txt")]);
        assert_eq!(args.out, Some(PathBuf::from("out/draft.txt")));
    }

    #[test]
    fn overrides_replace_config_values() {
        let args = ServiceArgs {
            api_key: None,
            llm: Some("gpt-4o-mini".into()),
            language: Some("Spanish".into()),
            institution: Some("Ministry of Foreign Affairs".into()),
        };
        let (config, settings) = apply_overrides(&AppConfig::default(), &args);
        assert_eq!(config.completion.model, "gpt-4o-mini");
        assert_eq!(settings.language, "Spanish");
        assert_eq!(
            settings.institution.as_deref(),
            Some("Ministry of Foreign Affairs")
        );
    }

    #[test]
    fn missing_sources_are_reported_not_fatal() {
        let loader = DocumentLoader::default();
        let sources = load_sources(
            &loader,
            &[PathBuf::from("/nonexistent/normdraft-test/law.txt")],
            "norm",
        );
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].label, "law.txt");
        assert!(sources[0].text.is_empty());
    }
}

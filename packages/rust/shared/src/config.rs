//! Application configuration for normdraft.
//!
//! User config lives at `~/.normdraft/normdraft.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DraftError, Result};
use crate::types::ApiKey;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "normdraft.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".normdraft";

// ---------------------------------------------------------------------------
// Config structs (matching normdraft.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion service settings.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Context-window budgets.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Drafting preferences.
    #[serde(default)]
    pub drafting: DraftingConfig,
}

/// `[completion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request wall-clock timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Optional cap on generated tokens per request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            max_tokens: None,
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_base_url() -> Url {
    Url::parse("https://api.openai.com/v1").expect("valid default URL")
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_timeout_secs() -> u64 {
    120
}

/// `[limits]` section. All budgets are in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Norms corpus sent to the requirement extractor.
    #[serde(default = "default_extraction_norms")]
    pub extraction_norms_chars: usize,

    /// Models corpus sent to the structure proposer.
    #[serde(default = "default_structure_models")]
    pub structure_models_chars: usize,

    /// Norms corpus sent with each section request.
    #[serde(default = "default_section_norms")]
    pub section_norms_chars: usize,

    /// Models corpus sent with each section request.
    #[serde(default = "default_section_models")]
    pub section_models_chars: usize,

    /// Reference text sent with a one-shot document request.
    #[serde(default = "default_oneshot_reference")]
    pub oneshot_reference_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            extraction_norms_chars: default_extraction_norms(),
            structure_models_chars: default_structure_models(),
            section_norms_chars: default_section_norms(),
            section_models_chars: default_section_models(),
            oneshot_reference_chars: default_oneshot_reference(),
        }
    }
}

fn default_extraction_norms() -> usize {
    80_000
}
fn default_structure_models() -> usize {
    50_000
}
fn default_section_norms() -> usize {
    50_000
}
fn default_section_models() -> usize {
    30_000
}
fn default_oneshot_reference() -> usize {
    100_000
}

/// `[drafting]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftingConfig {
    /// Language the generated document is written in.
    #[serde(default = "default_language")]
    pub language: String,

    /// Issuing institution, woven into the drafter's role instruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,

    /// Default file name for the exported draft.
    #[serde(default = "default_export_file")]
    pub export_file: String,
}

impl Default for DraftingConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            institution: None,
            export_file: default_export_file(),
        }
    }
}

fn default_language() -> String {
    "English".into()
}
fn default_export_file() -> String {
    "official_draft.txt".into()
}

// ---------------------------------------------------------------------------
// Draft settings (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime drafting settings handed to every generation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftSettings {
    /// Output language for requirements, outline and prose.
    pub language: String,
    /// Issuing institution, if any.
    pub institution: Option<String>,
    /// Context-window budgets.
    pub limits: LimitsConfig,
}

impl Default for DraftSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for DraftSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            language: config.drafting.language.clone(),
            institution: config.drafting.institution.clone(),
            limits: config.limits.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.normdraft/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| DraftError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.normdraft/normdraft.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DraftError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| DraftError::config(format!("failed to parse {}: {e}", path.display())))?;
    validate_config(&config)?;
    Ok(config)
}

/// Reject values that would make every request fail.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.completion.model.trim().is_empty() {
        return Err(DraftError::config("completion.model must not be empty"));
    }
    if config.completion.timeout_secs == 0 {
        return Err(DraftError::config("completion.timeout_secs must be positive"));
    }
    if !matches!(config.completion.base_url.scheme(), "http" | "https") {
        return Err(DraftError::config(format!(
            "completion.base_url must be http(s), got {}",
            config.completion.base_url
        )));
    }
    Ok(())
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DraftError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DraftError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DraftError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the completion-service credential.
///
/// An explicit key (from a CLI flag) wins; otherwise the env var named in
/// `[completion] api_key_env` is read.
pub fn resolve_api_key(config: &AppConfig, explicit: Option<&str>) -> Result<ApiKey> {
    if let Some(key) = explicit.filter(|k| !k.trim().is_empty()) {
        return Ok(ApiKey::new(key.trim()));
    }

    let var_name = &config.completion.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(ApiKey::new(val.trim())),
        _ => Err(DraftError::missing_credential(format!(
            "API key not found. Set the {var_name} environment variable or pass --api-key."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("extraction_norms_chars"));
    }

    #[test]
    fn default_limits_match_documented_budgets() {
        let limits = LimitsConfig::default();
        assert_eq!(limits.extraction_norms_chars, 80_000);
        assert_eq!(limits.structure_models_chars, 50_000);
        assert_eq!(limits.section_norms_chars, 50_000);
        assert_eq!(limits.section_models_chars, 30_000);
        assert_eq!(limits.oneshot_reference_chars, 100_000);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[completion]
model = "gpt-4o-mini"

[drafting]
language = "Spanish"
institution = "Ministry of Foreign Affairs"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.completion.model, "gpt-4o-mini");
        assert_eq!(config.completion.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.completion.timeout_secs, 120);
        assert_eq!(config.drafting.language, "Spanish");
        assert_eq!(
            config.drafting.institution.as_deref(),
            Some("Ministry of Foreign Affairs")
        );
        assert_eq!(config.limits, LimitsConfig::default());
    }

    #[test]
    fn draft_settings_from_app_config() {
        let mut app = AppConfig::default();
        app.drafting.institution = Some("Ministry of Health".into());
        app.limits.section_models_chars = 10;
        let settings = DraftSettings::from(&app);
        assert_eq!(settings.language, "English");
        assert_eq!(settings.institution.as_deref(), Some("Ministry of Health"));
        assert_eq!(settings.limits.section_models_chars, 10);
        assert_eq!(settings.limits.extraction_norms_chars, 80_000);
    }

    #[test]
    fn validation_rejects_zero_timeout() {
        let mut config = AppConfig::default();
        config.completion.timeout_secs = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn validation_rejects_non_http_base_url() {
        let mut config = AppConfig::default();
        config.completion.base_url = Url::parse("ftp://example.com/v1").unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn explicit_api_key_wins() {
        let mut config = AppConfig::default();
        config.completion.api_key_env = "ND_TEST_NONEXISTENT_KEY_98765".into();
        let key = resolve_api_key(&config, Some("  sk-test  ")).expect("explicit key");
        assert_eq!(key.expose(), "sk-test");
    }

    #[test]
    fn missing_api_key_is_reported() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.completion.api_key_env = "ND_TEST_NONEXISTENT_KEY_12345".into();
        let err = resolve_api_key(&config, None).unwrap_err();
        assert!(matches!(err, DraftError::MissingCredential { .. }));
        assert!(err.to_string().contains("ND_TEST_NONEXISTENT_KEY_12345"));

        let err = resolve_api_key(&config, Some("   ")).unwrap_err();
        assert!(matches!(err, DraftError::MissingCredential { .. }));
    }
}

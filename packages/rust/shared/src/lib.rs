//! Shared types, error model, and configuration for normdraft.
//!
//! This crate is the foundation depended on by all other normdraft crates.
//! It provides:
//! - [`DraftError`], the unified error type
//! - Domain types ([`Requirement`], [`SectionSpec`], [`Corpus`], [`GeneratedDocument`])
//! - Configuration ([`AppConfig`], [`LimitsConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CompletionConfig, DraftSettings, DraftingConfig, LimitsConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_api_key,
    validate_config,
};
pub use error::{DraftError, Result};
pub use types::{
    ApiKey, Corpus, CorpusKind, DraftedSection, GeneratedDocument, Requirement, SectionSpec,
    SessionId, SourceText,
};

//! Text-completion service contract and its HTTP implementation.
//!
//! Every generation step in normdraft talks to a [`CompletionService`]:
//! one system instruction, one user instruction, one sampling temperature,
//! one attempt. [`ChatClient`] implements it against any OpenAI-compatible
//! `chat/completions` endpoint.

mod client;

use async_trait::async_trait;
use normdraft_shared::Result;
use serde::{Deserialize, Serialize};

pub use client::ChatClient;

/// A single completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// Role framing for the model.
    pub system: String,
    /// The task and its context.
    pub user: String,
    /// Sampling temperature; each call site picks its own.
    pub temperature: f64,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>, temperature: f64) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature,
        }
    }
}

/// Generated text plus usage accounting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub latency_ms: u64,
}

/// A generative text collaborator.
///
/// Implementations enforce their own wall-clock timeout and never retry:
/// a call either returns text or a `DraftError::Service`.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

    /// Model identifier, recorded on generated documents.
    fn model(&self) -> &str;
}

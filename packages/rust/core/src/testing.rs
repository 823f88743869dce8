//! In-memory completion service for pipeline tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use normdraft_completion::{Completion, CompletionRequest, CompletionService};
use normdraft_shared::{DraftError, Result};

type Responder = dyn Fn(&CompletionRequest) -> Result<String> + Send + Sync;

/// Answers every request through a closure and records what it was asked.
///
/// Clones share the same log, so a test can hand one clone to a wizard and
/// inspect calls through another.
#[derive(Clone)]
pub struct ScriptedService {
    responder: Arc<Responder>,
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedService {
    pub fn new(
        responder: impl Fn(&CompletionRequest) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Arc::new(responder),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always returns `text`.
    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Always fails with a service fault.
    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::new(move |_| Err(DraftError::Service(message.clone())))
    }

    /// Routes by temperature, which is unique per pipeline step.
    pub fn pipeline(requirements: &str, structure: &str, section: &str) -> Self {
        let (requirements, structure, section) =
            (requirements.to_string(), structure.to_string(), section.to_string());
        Self::new(move |req| {
            if req.temperature == crate::prompts::EXTRACTION_TEMPERATURE {
                Ok(requirements.clone())
            } else if req.temperature == crate::prompts::SECTION_TEMPERATURE {
                Ok(section.clone())
            } else {
                Ok(structure.clone())
            }
        })
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }
}

#[async_trait]
impl CompletionService for ScriptedService {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        self.calls.lock().expect("calls lock").push(request.clone());
        let text = (self.responder)(request)?;
        Ok(Completion {
            text,
            model: "scripted".into(),
            ..Completion::default()
        })
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

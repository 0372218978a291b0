//! Language model trait and implementations
//!
//! The model is an opaque text-completion / tool-calling service. Callers get
//! back either free text or a single tool invocation.

use crate::error::AssistantError;
use crate::models::{GenerationRequest, ModelOutput};
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Trait for content generation (Gemini in production)
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<ModelOutput>;
}

/// Scripted model for development & testing
/// Replays queued outputs in order and records every request it sees
pub struct ScriptedModel {
    outputs: Mutex<VecDeque<Result<ModelOutput>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedModel {
    pub fn new(outputs: Vec<Result<ModelOutput>>) -> Self {
        Self {
            outputs: Mutex::new(outputs.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn text(text: &str) -> Self {
        Self::new(vec![Ok(ModelOutput::Text(text.to_string()))])
    }

    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, request: &GenerationRequest) -> Result<ModelOutput> {
        self.requests.lock().await.push(request.clone());

        self.outputs
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(AssistantError::LlmError("script exhausted".to_string())))
    }
}

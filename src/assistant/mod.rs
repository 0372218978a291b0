//! Assistant trait and implementations
//!
//! The assistant answers one user turn given the prior conversation. It may
//! return a proposal draft when the user asks for a transfer or a top-up.

use crate::error::AssistantError;
use crate::models::{AssistantReply, ConversationEntry};
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;

pub mod support;
pub use support::SupportAssistant;

/// Trait for resolving an assistant reply (LLM controlled)
#[async_trait]
pub trait Assistant: Send + Sync {
    /// `history` is the log as it stood before `message` was submitted
    async fn respond(&self, history: &[ConversationEntry], message: &str) -> Result<AssistantReply>;
}

/// A call observed by the scripted assistant
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub history_len: usize,
    pub message: String,
}

/// Scripted assistant for development & testing
/// Keeps the flow functional without an LLM dependency
pub struct ScriptedAssistant {
    replies: Mutex<VecDeque<Result<AssistantReply>>>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Duration,
}

impl ScriptedAssistant {
    pub fn new(replies: Vec<Result<AssistantReply>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Sleep before every reply, e.g. to exercise timeouts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Assistant for ScriptedAssistant {
    async fn respond(
        &self,
        history: &[ConversationEntry],
        message: &str,
    ) -> Result<AssistantReply> {
        self.calls.lock().await.push(RecordedCall {
            history_len: history.len(),
            message: message.to_string(),
        });

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(AssistantError::LlmError("script exhausted".to_string())))
    }
}

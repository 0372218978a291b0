//! Error types for the NairaSense assistant

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::models::ProposalStatus;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {

    // =============================
    // Conversation Flow Errors
    // =============================

    #[error("Message text must not be empty")]
    EmptyMessage,

    #[error("No conversation entry at index {0}")]
    EntryNotFound(usize),

    #[error("Conversation entry {0} no longer exists")]
    UnknownEntry(Uuid),

    #[error("Conversation entry {0} carries no proposal")]
    NoProposal(usize),

    #[error("Proposal at entry {index} is already {status}")]
    ProposalResolved {
        index: usize,
        status: ProposalStatus,
    },

    // =============================
    // Language Model Errors
    // =============================

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Assistant did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Settlement task failed: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

impl AssistantError {
    /// Rejections of an invalid proposal action. These never alter the log.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AssistantError::EntryNotFound(_)
                | AssistantError::NoProposal(_)
                | AssistantError::ProposalResolved { .. }
        )
    }
}

//! NairaSense Assistant
//!
//! A chat-driven money assistant where the language model never moves money
//! on its own:
//! - The assistant answers in text or attaches a transaction preview
//! - Previews (transfers, airtime top-ups) stay pending until the user acts
//! - Each preview is confirmed or cancelled exactly once
//! - Every settlement appends a delayed follow-up message and a receipt
//!
//! FLOW:
//! USER MESSAGE → ASSISTANT → PREVIEW → CONFIRM/CANCEL → FOLLOW-UP

pub mod advisor;
pub mod api;
pub mod assistant;
pub mod config;
pub mod conversation;
pub mod error;
pub mod flow;
pub mod gemini;
pub mod llm;
pub mod models;
pub mod receipts;
pub mod tools;

pub use error::{AssistantError, Result};

// Re-export common types
pub use models::*;
pub use flow::{Settlement, TransactionPreviewFlow};

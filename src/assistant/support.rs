//! Model-backed support assistant
//!
//! Sends the conversation plus the transaction tool declarations to the
//! language model and turns a tool invocation into a proposal draft.

use crate::assistant::Assistant;
use crate::llm::LanguageModel;
use crate::models::{
    AssistantReply, ConversationEntry, GenerationRequest, ModelOutput, Speaker, Turn,
};
use crate::tools::{create_default_registry, ToolRegistry};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

const SYSTEM_INSTRUCTION: &str = r#"You are the AI fintech assistant for NairaSense, a Nigerian banking app.
You can prepare transactions like transfers and airtime purchases; the user always confirms them before anything moves.

Instructions:
- If the user wants to send money, transfer funds, or buy airtime, CALL the appropriate function.
- Interpret shorthand amounts such as "5k" as 5000 Naira.
- Otherwise, respond helpfully in text.
- Keep responses concise and friendly. Use the Naira symbol (₦) for amounts."#;

pub struct SupportAssistant {
    model: Arc<dyn LanguageModel>,
    registry: ToolRegistry,
}

impl SupportAssistant {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self::with_registry(model, create_default_registry())
    }

    pub fn with_registry(model: Arc<dyn LanguageModel>, registry: ToolRegistry) -> Self {
        Self { model, registry }
    }

    fn build_request(&self, history: &[ConversationEntry], message: &str) -> GenerationRequest {
        let mut turns: Vec<Turn> = history.iter().map(Turn::from).collect();
        turns.push(Turn {
            speaker: Speaker::User,
            text: message.to_string(),
        });

        GenerationRequest {
            system: Some(SYSTEM_INSTRUCTION.to_string()),
            turns,
            tools: self.registry.declarations(),
            response_mime_type: None,
        }
    }
}

#[async_trait]
impl Assistant for SupportAssistant {
    async fn respond(
        &self,
        history: &[ConversationEntry],
        message: &str,
    ) -> Result<AssistantReply> {
        let request = self.build_request(history, message);

        match self.model.generate(&request).await? {
            ModelOutput::Text(text) => {
                debug!("Assistant answered in text");
                Ok(AssistantReply::text(text))
            }
            ModelOutput::ToolInvocation { name, args } => {
                info!(tool = %name, "Assistant invoked transaction tool");
                let (draft, text) = self.registry.draft_from_invocation(&name, &args)?;
                Ok(AssistantReply {
                    text,
                    draft: Some(draft),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;
    use crate::llm::ScriptedModel;
    use crate::models::ProposalKind;
    use serde_json::json;

    fn invocation(name: &str, args: serde_json::Value) -> Result<ModelOutput> {
        Ok(ModelOutput::ToolInvocation {
            name: name.to_string(),
            args,
        })
    }

    #[tokio::test]
    async fn test_text_reply_has_no_draft() {
        let model = Arc::new(ScriptedModel::text("Your balance looks healthy."));
        let assistant = SupportAssistant::new(model.clone());

        let reply = assistant.respond(&[], "How am I doing?").await.unwrap();
        assert_eq!(reply, AssistantReply::text("Your balance looks healthy."));
    }

    #[tokio::test]
    async fn test_request_carries_history_and_tools() {
        let model = Arc::new(ScriptedModel::text("ok"));
        let assistant = SupportAssistant::new(model.clone());
        let history = vec![
            ConversationEntry::assistant("Hello!", None),
            ConversationEntry::user("hi"),
            ConversationEntry::assistant("How can I help?", None),
        ];

        assistant.respond(&history, "Send 5k to Mom").await.unwrap();

        let requests = model.requests().await;
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.turns.len(), 4);
        assert_eq!(request.turns[3].speaker, Speaker::User);
        assert_eq!(request.turns[3].text, "Send 5k to Mom");
        assert_eq!(request.tools.len(), 2);
        assert!(request.system.is_some());
    }

    #[tokio::test]
    async fn test_transfer_invocation_yields_draft() {
        let model = Arc::new(ScriptedModel::new(vec![invocation(
            "initiate_transfer",
            json!({ "amount": 5000, "recipient": "Mom", "reason": "Upkeep" }),
        )]));
        let assistant = SupportAssistant::new(model);

        let reply = assistant.respond(&[], "Send 5k to Mom").await.unwrap();
        let draft = reply.draft.expect("draft");
        assert_eq!(draft.kind, ProposalKind::Transfer);
        assert_eq!(draft.amount, 5000.0);
        assert_eq!(draft.counterparty, "Mom");
        assert_eq!(draft.note.as_deref(), Some("Upkeep"));
        assert!(reply.text.contains("₦5000"));
    }

    #[tokio::test]
    async fn test_malformed_invocation_is_an_error() {
        let model = Arc::new(ScriptedModel::new(vec![invocation(
            "buy_airtime",
            json!({ "amount": 500 }),
        )]));
        let assistant = SupportAssistant::new(model);

        let result = assistant.respond(&[], "Top me up").await;
        assert!(matches!(result, Err(AssistantError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let model = Arc::new(ScriptedModel::new(vec![Err(AssistantError::LlmError(
            "503".to_string(),
        ))]));
        let assistant = SupportAssistant::new(model);

        assert!(assistant.respond(&[], "hello").await.is_err());
    }
}

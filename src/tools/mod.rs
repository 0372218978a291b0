//! Transaction tools and registry
//!
//! Tools are declared to the model and never executed directly. A tool
//! invocation only turns into a proposal draft that the user must confirm.

use crate::error::AssistantError;
use crate::models::{format_naira, FunctionDeclaration, ProposalDraft, ProposalKind};
use crate::Result;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Trait for a tool that prepares a transaction proposal
pub trait ProposalTool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the arguments
    fn parameters(&self) -> Value;
    /// Build a draft from the model's arguments, rejecting missing or invalid ones
    fn draft(&self, args: &Value) -> Result<ProposalDraft>;
    /// Assistant text shown above the preview card
    fn preview_text(&self, draft: &ProposalDraft) -> String;

    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Tool registry for looking up tools by invocation name
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ProposalTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn ProposalTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ProposalTool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        self.tools.values().map(|t| t.declaration()).collect()
    }

    /// Resolve a tool invocation into a draft plus its preview text
    pub fn draft_from_invocation(
        &self,
        name: &str,
        args: &Value,
    ) -> Result<(ProposalDraft, String)> {
        let tool = self.get(name).ok_or_else(|| {
            AssistantError::MalformedResponse(format!("Unknown tool invoked: {}", name))
        })?;

        let draft = tool.draft(args)?;
        let text = tool.preview_text(&draft);
        Ok((draft, text))
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn require_object(args: &Value) -> Result<()> {
    if args.is_object() {
        Ok(())
    } else {
        Err(AssistantError::MalformedResponse(
            "tool arguments must be a JSON object".to_string(),
        ))
    }
}

fn require_amount(args: &Value) -> Result<f64> {
    args.get("amount").and_then(Value::as_f64).ok_or_else(|| {
        AssistantError::MalformedResponse("Missing numeric 'amount' argument".to_string())
    })
}

fn checked(draft: ProposalDraft) -> Result<ProposalDraft> {
    draft.validate().map_err(AssistantError::MalformedResponse)?;
    Ok(draft)
}

fn require_str(args: &Value, key: &str) -> Result<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AssistantError::MalformedResponse(format!("Missing '{}' argument", key)))
}

fn optional_str(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub struct TransferTool;

impl ProposalTool for TransferTool {
    fn name(&self) -> &'static str {
        "initiate_transfer"
    }

    fn description(&self) -> &'static str {
        "Prepare a money transfer for the user to confirm. Use this when the user says \"send money\", \"transfer\" or \"pay X\"."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "amount": { "type": "NUMBER", "description": "Amount in Naira" },
                "recipient": { "type": "STRING", "description": "Name or account details of the recipient" },
                "reason": { "type": "STRING", "description": "Transaction description or note" }
            },
            "required": ["amount", "recipient"]
        })
    }

    fn draft(&self, args: &Value) -> Result<ProposalDraft> {
        require_object(args)?;
        checked(ProposalDraft {
            kind: ProposalKind::Transfer,
            amount: require_amount(args)?,
            counterparty: require_str(args, "recipient")?,
            note: optional_str(args, "reason"),
        })
    }

    fn preview_text(&self, draft: &ProposalDraft) -> String {
        format!(
            "I've set up a transfer of {} to {}. Please review and confirm below.",
            format_naira(draft.amount),
            draft.counterparty
        )
    }
}

pub struct AirtimeTool;

impl ProposalTool for AirtimeTool {
    fn name(&self) -> &'static str {
        "buy_airtime"
    }

    fn description(&self) -> &'static str {
        "Prepare an airtime purchase. Use when the user says \"buy airtime\", \"recharge\" or \"top up\"."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "amount": { "type": "NUMBER", "description": "Amount in Naira" },
                "phoneNumber": { "type": "STRING", "description": "Phone number to recharge" },
                "network": { "type": "STRING", "description": "Network provider (MTN, Glo, Airtel, 9mobile)" }
            },
            "required": ["amount", "phoneNumber"]
        })
    }

    fn draft(&self, args: &Value) -> Result<ProposalDraft> {
        require_object(args)?;
        checked(ProposalDraft {
            kind: ProposalKind::AirtimeTopup,
            amount: require_amount(args)?,
            counterparty: require_str(args, "phoneNumber")?,
            note: optional_str(args, "network"),
        })
    }

    fn preview_text(&self, draft: &ProposalDraft) -> String {
        format!(
            "I'm ready to top up {} with {}. Is this correct?",
            draft.counterparty,
            format_naira(draft.amount)
        )
    }
}

/// Registry with the transfer and airtime tools
pub fn create_default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(TransferTool));
    registry.register(Arc::new(AirtimeTool));
    registry
}

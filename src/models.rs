//! Core data models for the NairaSense assistant

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier of a conversation entry
pub type EntryId = Uuid;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProposalKind {
    Transfer,
    AirtimeTopup,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Confirmed,
    Cancelled,
}

/// User action that settles a pending proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Confirm,
    Cancel,
}

impl Resolution {
    pub fn target(self) -> ProposalStatus {
        match self {
            Resolution::Confirm => ProposalStatus::Confirmed,
            Resolution::Cancel => ProposalStatus::Cancelled,
        }
    }
}

//
// ================= Proposal =================
//

/// Proposal contents as extracted from a tool invocation, before it is minted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposalDraft {
    pub kind: ProposalKind,
    /// Amount in Naira (major units)
    pub amount: f64,
    pub counterparty: String,
    pub note: Option<String>,
}

impl ProposalDraft {
    /// Amount must be a positive finite number and the counterparty non-blank
    pub fn validate(&self) -> Result<(), String> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(format!("Amount must be positive, got {}", self.amount));
        }
        if self.counterparty.trim().is_empty() {
            return Err("Counterparty must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Proposal {
    pub kind: ProposalKind,
    /// Amount in Naira (major units)
    pub amount: f64,
    pub counterparty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    status: ProposalStatus,
}

impl Proposal {
    /// Mint a proposal. Proposals always start out pending.
    pub fn from_draft(draft: ProposalDraft) -> Self {
        Self {
            kind: draft.kind,
            amount: draft.amount,
            counterparty: draft.counterparty,
            note: draft.note,
            status: ProposalStatus::Pending,
        }
    }

    pub fn status(&self) -> ProposalStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == ProposalStatus::Pending
    }

    /// Note shown on the preview card, with a per-kind default
    pub fn description(&self) -> &str {
        match (&self.note, self.kind) {
            (Some(note), _) => note,
            (None, ProposalKind::Transfer) => "Fund Transfer",
            (None, ProposalKind::AirtimeTopup) => "Airtime Topup",
        }
    }

    /// Move a pending proposal to its terminal status.
    ///
    /// Returns the current status, untouched, when the proposal was already settled.
    pub(crate) fn resolve(&mut self, resolution: Resolution) -> Result<(), ProposalStatus> {
        if !self.is_pending() {
            return Err(self.status);
        }
        self.status = resolution.target();
        Ok(())
    }
}

//
// ================= Conversation =================
//

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConversationEntry {
    pub id: EntryId,
    pub speaker: Speaker,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal: Option<Proposal>,
    pub created_at: DateTime<Utc>,
}

impl ConversationEntry {
    /// User turns never carry a proposal
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker: Speaker::User,
            text: text.into(),
            proposal: None,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>, proposal: Option<Proposal>) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker: Speaker::Assistant,
            text: text.into(),
            proposal,
            created_at: Utc::now(),
        }
    }
}

/// What the assistant service hands back for a single user turn
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantReply {
    pub text: String,
    pub draft: Option<ProposalDraft>,
}

impl AssistantReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            draft: None,
        }
    }
}

//
// ================= Language Model I/O =================
//

/// One prior turn sent to the model
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl From<&ConversationEntry> for Turn {
    fn from(entry: &ConversationEntry) -> Self {
        Self {
            speaker: entry.speaker,
            text: entry.text.clone(),
        }
    }
}

/// A callable function the model may invoke instead of answering in text
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub system: Option<String>,
    pub turns: Vec<Turn>,
    pub tools: Vec<FunctionDeclaration>,
    /// e.g. `application/json` when the caller expects a JSON document back
    pub response_mime_type: Option<String>,
}

impl GenerationRequest {
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn {
                speaker: Speaker::User,
                text: prompt.into(),
            }],
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    Text(String),
    ToolInvocation {
        name: String,
        args: serde_json::Value,
    },
}

//
// ================= Advisor Inputs =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Debit,
    Credit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    pub merchant: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub balance: f64,
    pub savings: f64,
    /// 0-100
    pub risk_score: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsightScope {
    Individual,
    Community,
    Market,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsuranceType {
    Health,
    Agriculture,
    Device,
    Life,
    Education,
    Business,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsuranceRecommendation {
    pub recommended_type: InsuranceType,
    pub rationale: String,
}

/// Render a Naira amount verbatim with no grouping or rounding, e.g. `₦250.5`
pub fn format_naira(amount: f64) -> String {
    format!("₦{}", amount)
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Confirmed => "confirmed",
            ProposalStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for ProposalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProposalKind::Transfer => "transfer",
            ProposalKind::AirtimeTopup => "airtime",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for InsuranceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InsuranceType::Health => "health",
            InsuranceType::Agriculture => "agriculture",
            InsuranceType::Device => "device",
            InsuranceType::Life => "life",
            InsuranceType::Education => "education",
            InsuranceType::Business => "business",
        };
        write!(f, "{}", s)
    }
}

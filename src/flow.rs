//! Transaction preview flow
//!
//! Owns the conversation log of one chat session. The assistant may attach a
//! pending proposal to its reply; the user confirms or cancels it exactly once
//! and a settlement task appends the outcome after a short delay.
//!
//! SUBMIT → ASSISTANT → PROPOSAL(pending) → CONFIRM | CANCEL → SETTLE

use crate::assistant::Assistant;
use crate::config::FlowConfig;
use crate::conversation::ConversationLog;
use crate::error::AssistantError;
use crate::models::{
    format_naira, AssistantReply, ConversationEntry, EntryId, Proposal, ProposalKind,
    ProposalStatus, Resolution,
};
use crate::receipts::ReceiptBook;
use crate::Result;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const FALLBACK_REPLY: &str =
    "I apologize, I am currently undergoing maintenance. Please try again later.";
pub const CANCELLED_REPLY: &str = "Transaction cancelled.";

/// Deferred outcome of a confirm or cancel action
#[derive(Debug)]
pub struct Settlement {
    pub entry_id: EntryId,
    pub status: ProposalStatus,
    handle: JoinHandle<Result<ConversationEntry>>,
}

impl Settlement {
    /// Wait for the follow-up entry to land in the log
    pub async fn settled(self) -> Result<ConversationEntry> {
        self.handle.await?
    }
}

pub struct TransactionPreviewFlow {
    assistant: Arc<dyn Assistant>,
    log: Arc<RwLock<ConversationLog>>,
    receipts: Arc<ReceiptBook>,
    /// Serializes submissions so replies stay next to their request
    turn: Mutex<()>,
    config: FlowConfig,
}

impl TransactionPreviewFlow {
    pub fn new(assistant: Arc<dyn Assistant>, config: FlowConfig) -> Self {
        let mut log = ConversationLog::new();
        if let Some(greeting) = &config.greeting {
            log.append(ConversationEntry::assistant(greeting.clone(), None));
        }

        Self {
            assistant,
            log: Arc::new(RwLock::new(log)),
            receipts: Arc::new(ReceiptBook::new()),
            turn: Mutex::new(()),
            config,
        }
    }

    /// Append the user's turn and the assistant's reply.
    ///
    /// Returns the assistant entry. Assistant failures and timeouts produce a
    /// fallback entry rather than an error.
    pub async fn submit_user_message(&self, text: &str) -> Result<ConversationEntry> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AssistantError::EmptyMessage);
        }

        let _turn = self.turn.lock().await;

        let history = {
            let mut log = self.log.write().await;
            let history = log.entries().to_vec();
            log.append(ConversationEntry::user(text));
            history
        };

        debug!(history_len = history.len(), "Resolving assistant reply");

        let outcome = match tokio::time::timeout(
            self.config.request_timeout,
            self.assistant.respond(&history, text),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AssistantError::Timeout(self.config.request_timeout)),
        };

        let reply = match outcome {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Assistant call failed, using fallback reply: {}", e);
                AssistantReply::text(FALLBACK_REPLY)
            }
        };

        let entry = Self::entry_from_reply(reply);
        if let Some(proposal) = &entry.proposal {
            info!(
                entry_id = %entry.id,
                kind = %proposal.kind,
                amount = proposal.amount,
                "Proposal attached, awaiting confirmation"
            );
        }

        self.log.write().await.append(entry.clone());
        Ok(entry)
    }

    fn entry_from_reply(reply: AssistantReply) -> ConversationEntry {
        match reply.draft {
            Some(draft) => match draft.validate() {
                Ok(()) => {
                    ConversationEntry::assistant(reply.text, Some(Proposal::from_draft(draft)))
                }
                Err(reason) => {
                    warn!("Discarding invalid proposal draft: {}", reason);
                    ConversationEntry::assistant(FALLBACK_REPLY, None)
                }
            },
            None => ConversationEntry::assistant(reply.text, None),
        }
    }

    /// Confirm the pending proposal at `index`. The success message with a
    /// reference token follows after `confirm_delay`.
    pub async fn confirm_proposal(&self, index: usize) -> Result<Settlement> {
        self.resolve(index, Resolution::Confirm).await
    }

    /// Cancel the pending proposal at `index`. The cancellation notice follows
    /// after `cancel_delay`.
    pub async fn cancel_proposal(&self, index: usize) -> Result<Settlement> {
        self.resolve(index, Resolution::Cancel).await
    }

    async fn resolve(&self, index: usize, resolution: Resolution) -> Result<Settlement> {
        // Check and transition under one write lock so a repeated call can't double-settle
        let entry_id = {
            let mut log = self.log.write().await;
            let entry_id = log
                .get(index)
                .map(|e| e.id)
                .ok_or(AssistantError::EntryNotFound(index))?;
            let proposal = log
                .proposal_mut(index)
                .ok_or(AssistantError::NoProposal(index))?;
            proposal
                .resolve(resolution)
                .map_err(|status| AssistantError::ProposalResolved { index, status })?;
            entry_id
        };

        let status = resolution.target();
        info!(%entry_id, index, %status, "Proposal resolved");

        let delay = match resolution {
            Resolution::Confirm => self.config.confirm_delay,
            Resolution::Cancel => self.config.cancel_delay,
        };
        let log = Arc::clone(&self.log);
        let receipts = Arc::clone(&self.receipts);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = settle(log, receipts, entry_id, resolution).await;
            if let Err(e) = &result {
                warn!(%entry_id, "Settlement failed: {}", e);
            }
            result
        });

        Ok(Settlement {
            entry_id,
            status,
            handle,
        })
    }

    pub async fn entries(&self) -> Vec<ConversationEntry> {
        self.log.read().await.entries().to_vec()
    }

    pub async fn entry(&self, index: usize) -> Option<ConversationEntry> {
        self.log.read().await.get(index).cloned()
    }

    pub async fn len(&self) -> usize {
        self.log.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.log.read().await.is_empty()
    }

    pub async fn transcript(&self) -> String {
        self.log.read().await.transcript()
    }

    pub fn receipts(&self) -> &ReceiptBook {
        &self.receipts
    }
}

/// Append the follow-up for a resolved proposal.
/// The proposal is re-read by id when the delay elapses, never from a snapshot.
async fn settle(
    log: Arc<RwLock<ConversationLog>>,
    receipts: Arc<ReceiptBook>,
    entry_id: EntryId,
    resolution: Resolution,
) -> Result<ConversationEntry> {
    let proposal = log
        .read()
        .await
        .find(entry_id)
        .and_then(|e| e.proposal.clone())
        .ok_or(AssistantError::UnknownEntry(entry_id))?;

    let text = match resolution {
        Resolution::Confirm => {
            let receipt = receipts.issue(entry_id, &proposal).await?;
            info!(%entry_id, reference = %receipt.reference, "Settlement confirmed");
            confirmation_text(&proposal, &receipt.reference)
        }
        Resolution::Cancel => {
            info!(%entry_id, "Settlement cancelled");
            CANCELLED_REPLY.to_string()
        }
    };

    let entry = ConversationEntry::assistant(text, None);
    log.write().await.append(entry.clone());
    Ok(entry)
}

fn confirmation_text(proposal: &Proposal, reference: &str) -> String {
    let headline = match proposal.kind {
        ProposalKind::Transfer => "Transaction Successful!",
        ProposalKind::AirtimeTopup => "Airtime Top-up Successful!",
    };

    format!(
        "✅ {} {} has been sent to {}. Reference: {}",
        headline,
        format_naira(proposal.amount),
        proposal.counterparty,
        reference
    )
}

//! Conversation log storage
//!
//! Append-only, chronologically ordered turns of a single chat session.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{ConversationEntry, EntryId, Proposal, Speaker};

/// Ordered log of user and assistant turns
#[derive(Debug, Clone, Serialize)]
pub struct ConversationLog {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    entries: Vec<ConversationEntry>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self {
            created_at: Utc::now(),
            updated_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    /// Append an entry and return its index
    pub fn append(&mut self, entry: ConversationEntry) -> usize {
        self.entries.push(entry);
        self.updated_at = Utc::now();
        self.entries.len() - 1
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&ConversationEntry> {
        self.entries.get(index)
    }

    /// Look up an entry by its stable id
    pub fn find(&self, id: EntryId) -> Option<&ConversationEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Mutable access is restricted to a proposal; text and speaker never change.
    pub(crate) fn proposal_mut(&mut self, index: usize) -> Option<&mut Proposal> {
        let proposal = self.entries.get_mut(index)?.proposal.as_mut();
        if proposal.is_some() {
            self.updated_at = Utc::now();
        }
        proposal
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plain-text transcript, mostly for terminal rendering
    pub fn transcript(&self) -> String {
        let mut out = String::new();

        for (index, entry) in self.entries.iter().enumerate() {
            let who = match entry.speaker {
                Speaker::User => "You",
                Speaker::Assistant => "NairaSense",
            };
            out.push_str(&format!("[{}] {}: {}\n", index, who, entry.text));

            if let Some(proposal) = &entry.proposal {
                out.push_str(&format!(
                    "    {} {} -> {} ({}) [{}]\n",
                    proposal.kind,
                    crate::models::format_naira(proposal.amount),
                    proposal.counterparty,
                    proposal.description(),
                    proposal.status()
                ));
            }
        }

        out
    }
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProposalDraft, ProposalKind};

    #[test]
    fn test_append_preserves_order() {
        let mut log = ConversationLog::new();

        assert_eq!(log.append(ConversationEntry::user("hi")), 0);
        assert_eq!(log.append(ConversationEntry::assistant("hello", None)), 1);
        assert_eq!(log.append(ConversationEntry::user("bye")), 2);

        let texts: Vec<_> = log.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["hi", "hello", "bye"]);
    }

    #[test]
    fn test_find_by_id() {
        let mut log = ConversationLog::new();
        let entry = ConversationEntry::assistant("hello", None);
        let id = entry.id;
        log.append(ConversationEntry::user("hi"));
        log.append(entry);

        assert_eq!(log.find(id).map(|e| e.text.as_str()), Some("hello"));
        assert!(log.find(uuid::Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_proposal_mut_only_for_entries_with_proposal() {
        let mut log = ConversationLog::new();
        log.append(ConversationEntry::user("Top up 0803"));
        log.append(ConversationEntry::assistant(
            "Ready",
            Some(Proposal::from_draft(ProposalDraft {
                kind: ProposalKind::AirtimeTopup,
                amount: 500.0,
                counterparty: "08031234567".to_string(),
                note: Some("MTN".to_string()),
            })),
        ));

        assert!(log.proposal_mut(0).is_none());
        assert!(log.proposal_mut(1).is_some());
        assert!(log.proposal_mut(7).is_none());
    }

    #[test]
    fn test_transcript_lists_proposal() {
        let mut log = ConversationLog::new();
        log.append(ConversationEntry::assistant(
            "Please confirm",
            Some(Proposal::from_draft(ProposalDraft {
                kind: ProposalKind::Transfer,
                amount: 5000.0,
                counterparty: "Mom".to_string(),
                note: None,
            })),
        ));

        let transcript = log.transcript();
        assert!(transcript.contains("[0] NairaSense: Please confirm"));
        assert!(transcript.contains("transfer ₦5000 -> Mom (Fund Transfer) [pending]"));
    }
}

//! Settlement receipts
//!
//! Every confirmed proposal gets an opaque reference token and a receipt.
//! Receipts carry a digest so a stored record can be checked for tampering.

use crate::models::{EntryId, Proposal};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

const REFERENCE_PREFIX: &str = "REF-";
const REFERENCE_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SettlementReceipt {
    pub reference: String,
    pub entry_id: EntryId,
    pub proposal: Proposal,
    pub settled_at: DateTime<Utc>,
    pub digest: String,
}

/// Receipt storage, keyed by reference token
pub struct ReceiptBook {
    records: Arc<RwLock<HashMap<String, SettlementReceipt>>>,
}

impl ReceiptBook {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Issue a receipt under a fresh, unused reference token
    pub async fn issue(&self, entry_id: EntryId, proposal: &Proposal) -> Result<SettlementReceipt> {
        let mut records = self.records.write().await;

        let reference = loop {
            let candidate = generate_reference();
            if !records.contains_key(&candidate) {
                break candidate;
            }
        };

        let digest = compute_receipt_digest(&reference, entry_id, proposal)?;
        let receipt = SettlementReceipt {
            reference: reference.clone(),
            entry_id,
            proposal: proposal.clone(),
            settled_at: Utc::now(),
            digest,
        };

        records.insert(reference, receipt.clone());
        Ok(receipt)
    }

    pub async fn get(&self, reference: &str) -> Option<SettlementReceipt> {
        let records = self.records.read().await;
        records.get(reference).cloned()
    }

    /// All receipts, oldest first
    pub async fn list(&self) -> Vec<SettlementReceipt> {
        let records = self.records.read().await;
        let mut items: Vec<_> = records.values().cloned().collect();
        items.sort_by_key(|r| r.settled_at);
        items
    }

    /// Recompute the digest of a stored receipt
    pub async fn verify_integrity(&self, reference: &str) -> Result<bool> {
        let records = self.records.read().await;

        if let Some(receipt) = records.get(reference) {
            let current =
                compute_receipt_digest(&receipt.reference, receipt.entry_id, &receipt.proposal)?;
            Ok(current == receipt.digest)
        } else {
            Ok(false)
        }
    }
}

impl Default for ReceiptBook {
    fn default() -> Self {
        Self::new()
    }
}

/// `REF-` followed by six uppercase alphanumerics
pub fn generate_reference() -> String {
    let raw = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{}{}", REFERENCE_PREFIX, &raw[..REFERENCE_LEN])
}

pub fn is_reference(token: &str) -> bool {
    token
        .strip_prefix(REFERENCE_PREFIX)
        .map(|rest| {
            rest.len() == REFERENCE_LEN
                && rest
                    .chars()
                    .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        })
        .unwrap_or(false)
}

/// SHA256 over the reference, entry id and proposal
/// Streams JSON directly into the hasher
pub fn compute_receipt_digest(
    reference: &str,
    entry_id: EntryId,
    proposal: &Proposal,
) -> Result<String> {
    let mut hasher = Sha256::new();
    serde_json::to_writer(
        &mut HashWriter(&mut hasher),
        &(reference, entry_id, proposal),
    )?;
    Ok(hex::encode(hasher.finalize()))
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

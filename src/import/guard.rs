//! Idempotency guard for bulk bank-transaction imports
//!
//! A caller-supplied idempotency key identifies a logically-single
//! submission. Retransmitting an identical batch is free of side effects;
//! resubmitting a divergent batch under the same key is an explicit,
//! detectable error rather than a silent overwrite.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::import::hash::payload_hash;
use crate::traits::{ImportOutcome, ImportStorage};
use crate::types::*;
use crate::utils::validation::validate_idempotency_key;

/// One transaction in an import payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportItem {
    /// Natural key from the bank feed; items sharing a ref with an existing
    /// transaction (or an earlier item in the same payload) are ignored
    pub external_ref: Option<String>,
    pub amount: BigDecimal,
    pub currency: String,
    pub posted_at: NaiveDate,
    pub description: Option<String>,
}

/// Whether an import result was produced by this call or replayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Created,
    Replayed,
}

/// Outcome of a bulk import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub created: u32,
    pub ignored: u32,
    pub status: ImportStatus,
}

/// Deduplicates bulk import requests by idempotency key and payload hash
pub struct IdempotencyGuard<S: ImportStorage> {
    storage: S,
}

impl<S: ImportStorage> IdempotencyGuard<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Import a batch of transactions for the tenant under an idempotency key
    ///
    /// First submission persists the transactions and the import record and
    /// returns `created` counts. A retry with the same key and an equal
    /// payload hash replays the stored counts (`replayed`) without writing.
    /// The same key with a different hash fails with
    /// [`ReconcileError::IdempotencyConflict`] and writes nothing. Concurrent
    /// duplicate submissions are resolved by the storage's (tenant, key)
    /// exclusivity: the loser replays the winner's result.
    pub async fn import_batch(
        &mut self,
        tenant_id: Uuid,
        key: &str,
        items: &[ImportItem],
    ) -> ReconcileResult<ImportResult> {
        validate_idempotency_key(key)?;
        let submitted_hash = payload_hash(items)?;

        if let Some(existing) = self.storage.find_import_record(tenant_id, key).await? {
            return replay_or_conflict(&existing, &submitted_hash);
        }

        let refs: Vec<String> = items
            .iter()
            .filter_map(|item| normalized_ref(item.external_ref.as_deref()))
            .collect();
        let existing_refs = self.storage.existing_external_refs(tenant_id, &refs).await?;

        let mut seen_refs: HashSet<String> = HashSet::new();
        let mut transactions = Vec::new();
        let mut ignored = 0u32;

        for item in items {
            let external_ref = normalized_ref(item.external_ref.as_deref());
            if let Some(ref external_ref) = external_ref {
                if existing_refs.contains(external_ref) || !seen_refs.insert(external_ref.clone()) {
                    debug!("ignoring duplicate external ref '{external_ref}' for tenant {tenant_id}");
                    ignored += 1;
                    continue;
                }
            }

            let mut transaction = BankTransaction::new(
                tenant_id,
                item.amount.clone(),
                &item.currency,
                item.posted_at,
            );
            transaction.external_ref = external_ref;
            transaction.description = item.description.clone();
            transactions.push(transaction);
        }

        let record = ImportRecord {
            tenant_id,
            key: key.to_string(),
            payload_hash: submitted_hash.clone(),
            created: transactions.len() as u32,
            ignored,
            created_at: chrono::Utc::now().naive_utc(),
        };

        match self.storage.persist_import(&transactions, &record).await? {
            ImportOutcome::Committed => Ok(ImportResult {
                created: record.created,
                ignored: record.ignored,
                status: ImportStatus::Created,
            }),
            ImportOutcome::Lost(winner) => {
                // A concurrent submission with the same key committed first;
                // nothing of ours was written.
                warn!("import for tenant {tenant_id} key '{key}' lost a concurrent race");
                replay_or_conflict(&winner, &submitted_hash)
            }
        }
    }
}

fn replay_or_conflict(record: &ImportRecord, submitted_hash: &str) -> ReconcileResult<ImportResult> {
    if record.payload_hash == submitted_hash {
        Ok(ImportResult {
            created: record.created,
            ignored: record.ignored,
            status: ImportStatus::Replayed,
        })
    } else {
        Err(ReconcileError::IdempotencyConflict {
            key: record.key.clone(),
            stored_hash: record.payload_hash.clone(),
            submitted_hash: submitted_hash.to_string(),
        })
    }
}

fn normalized_ref(external_ref: Option<&str>) -> Option<String> {
    external_ref
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
}
